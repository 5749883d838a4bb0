//! # shypn-topology
//!
//! Static and behavioral analyzers over Petri net topologies: conservation
//! laws, siphons and traps, elementary cycles, shortest/all paths, hub
//! detection, bounded marking-graph exploration, boundedness, liveness,
//! deadlock risk, and fairness.
//!
//! ## Usage
//!
//! ```
//! use shypn_topology::{PetriNetBuilder, TransitionClass};
//! use shypn_topology::{make_p_invariant_analyzer, Analyzer, PInvariantOptions};
//!
//! let mut builder = PetriNetBuilder::new();
//! builder.add_place("P1", "P1", 1);
//! builder.add_place("P2", "P2", 0);
//! builder.add_transition("T1", "T1", TransitionClass::Immediate);
//! builder.add_transition("T2", "T2", TransitionClass::Immediate);
//! builder.add_arc("P1", "T1", 1);
//! builder.add_arc("T1", "P2", 1);
//! builder.add_arc("P2", "T2", 1);
//! builder.add_arc("T2", "P1", 1);
//! let net = std::sync::Arc::new(builder.build().unwrap());
//!
//! let mut analyzer = make_p_invariant_analyzer(net);
//! let result = analyzer.analyze(PInvariantOptions::default());
//! assert!(result.success);
//! ```
//!
//! Every analyzer implements the same [`Analyzer`] contract: `analyze`,
//! `invalidate`, `clear_cache`. None of them mutate the model they're built
//! over — a `PetriNet` is an immutable snapshot once constructed by
//! [`PetriNetBuilder`].

pub mod analyzers;
pub mod error;
mod framework;
mod graph;
mod linalg;
mod model;

pub use error::{Result, TopologyError};
pub use framework::{AnalysisMetadata, AnalysisResult, Analyzer, AnalyzerOptions};
pub use model::{
    NodeRef, PetriNet, PetriNetBuilder, Place, PlaceIndex, Transition, TransitionClass, TransitionIndex,
};

pub use analyzers::boundedness::{BoundednessOptions, BoundednessAnalyzer};
pub use analyzers::cycles::{Cycle, CycleOptions, CycleType, CycleAnalyzer};
pub use analyzers::deadlocks::{DeadlockOptions, DeadlockType, Severity, DeadlockAnalyzer};
pub use analyzers::fairness::{ConflictSet, FairnessOptions, NetFairness, StarvationRisk, FairnessAnalyzer};
pub use analyzers::hubs::{Hub, HubOptions, NodeTypeFilter, HubAnalyzer};
pub use analyzers::liveness::{LivenessLevel, LivenessOptions, LivenessAnalyzer};
pub use analyzers::p_invariants::{PInvariant, PInvariantOptions, PInvariantAnalyzer};
pub use analyzers::paths::{PathOptions, PathAnalyzer};
pub use analyzers::reachability::{ReachabilityEdge, ReachabilityOptions, ReachabilityAnalyzer};
pub use analyzers::siphons::{Criticality, Siphon, SiphonOptions, SiphonAnalyzer};
pub use analyzers::t_invariants::{TInvariant, TInvariantOptions, TInvariantAnalyzer};
pub use analyzers::traps::{Trap, TrapCriticality, TrapOptions, TrapAnalyzer};

use std::sync::Arc;

/// Factory functions, one per analyzer (spec §6's `make_X_analyzer(model)`).
/// Each analyzer owns a private cache and, where the analyzer has a
/// dependency on another (boundedness on P-invariants and reachability,
/// deadlock on siphons, liveness on reachability), constructs its own
/// collaborator instance rather than sharing one across analyzers.
pub fn make_p_invariant_analyzer(model: Arc<PetriNet>) -> PInvariantAnalyzer {
    PInvariantAnalyzer::new(model)
}

pub fn make_t_invariant_analyzer(model: Arc<PetriNet>) -> TInvariantAnalyzer {
    TInvariantAnalyzer::new(model)
}

pub fn make_siphon_analyzer(model: Arc<PetriNet>) -> SiphonAnalyzer {
    SiphonAnalyzer::new(model)
}

pub fn make_trap_analyzer(model: Arc<PetriNet>) -> TrapAnalyzer {
    TrapAnalyzer::new(model)
}

pub fn make_cycle_analyzer(model: Arc<PetriNet>) -> CycleAnalyzer {
    CycleAnalyzer::new(model)
}

pub fn make_path_analyzer(model: Arc<PetriNet>) -> PathAnalyzer {
    PathAnalyzer::new(model)
}

pub fn make_hub_analyzer(model: Arc<PetriNet>) -> HubAnalyzer {
    HubAnalyzer::new(model)
}

pub fn make_reachability_analyzer(model: Arc<PetriNet>) -> ReachabilityAnalyzer {
    ReachabilityAnalyzer::new(model)
}

pub fn make_boundedness_analyzer(model: Arc<PetriNet>) -> BoundednessAnalyzer {
    BoundednessAnalyzer::new(model)
}

pub fn make_liveness_analyzer(model: Arc<PetriNet>) -> LivenessAnalyzer {
    LivenessAnalyzer::new(model)
}

pub fn make_deadlock_analyzer(model: Arc<PetriNet>) -> DeadlockAnalyzer {
    DeadlockAnalyzer::new(model)
}

pub fn make_fairness_analyzer(model: Arc<PetriNet>) -> FairnessAnalyzer {
    FairnessAnalyzer::new(model)
}
