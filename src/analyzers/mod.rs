//! The twelve analyzers (spec §4.2-§4.13), grouped into the four families
//! from §2: structural, graph, network, behavioral.

pub mod boundedness;
pub mod cycles;
pub mod deadlocks;
pub mod fairness;
pub mod hubs;
pub mod liveness;
pub mod p_invariants;
pub mod paths;
pub mod reachability;
pub mod siphons;
pub mod t_invariants;
pub mod traps;

pub use boundedness::BoundednessAnalyzer;
pub use cycles::CycleAnalyzer;
pub use deadlocks::DeadlockAnalyzer;
pub use fairness::FairnessAnalyzer;
pub use hubs::HubAnalyzer;
pub use liveness::LivenessAnalyzer;
pub use p_invariants::PInvariantAnalyzer;
pub use paths::PathAnalyzer;
pub use reachability::ReachabilityAnalyzer;
pub use siphons::SiphonAnalyzer;
pub use t_invariants::TInvariantAnalyzer;
pub use traps::TrapAnalyzer;
