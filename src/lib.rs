//! P/T 网的执行与状态空间分析。
//!
//! * [`net`]：网拓扑、发生语义、引擎外观与结构加载；
//! * [`analysis`]：可达图与有界性求解器；
//! * [`batch`]：对多个输入文件批量运行有界性分析。
//!
//! ```rust
//! use pnbound::analysis::boundness::check_boundedness;
//! use pnbound::net::PetriNet;
//!
//! let mut net = PetriNet::default();
//! net.add_place("p").unwrap();
//! net.add_transition("t").unwrap();
//! net.add_arc("a", "t", "p").unwrap();
//!
//! let report = check_boundedness(&mut net).unwrap();
//! assert_eq!(report.bounded, Some(false));
//! assert_eq!(report.witness.unwrap().path, vec!["t".to_string()]);
//! ```

pub mod analysis;
pub mod batch;
pub mod config;
pub mod net;
pub mod options;
