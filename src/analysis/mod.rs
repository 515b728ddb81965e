pub mod boundness;
pub mod reachability;

pub use boundness::{BoundednessReport, BoundednessSolver, UnboundedWitness, check_boundedness};
pub use reachability::{CoverabilityWitness, ReachabilityGraph};
