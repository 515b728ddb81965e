//! # Petri 网核心定义
//!
//! 库所持有非负 token 数，迁移在其所有前驱库所都有 token 时可发生，
//! 弧只连接一个库所与一个迁移。标识是按库所 id 字母序排列的 token 数向量。

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod io;
pub mod observer;
pub mod petri_net;
pub mod structure;

pub use self::core::{Net, NetError};
pub use ids::{ArcId, PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use observer::{GraphObserver, NetObserver};
pub use petri_net::{EngineConfig, PetriNet};
pub use structure::{Arc, ArcDirection, Marking, NodeKind, Place, Tokens, Transition};
