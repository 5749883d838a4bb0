//! Unified error type for the topology core.
//!
//! Mirrors the taxonomy in spec §7: every variant maps to one failure mode an
//! analyzer can hit internally. None of these ever escape `analyze()` directly —
//! the analyzer boundary folds them into `AnalysisResult::failure` or a warning
//! string, per the propagation policy in §7.

use thiserror::Error;

/// Errors raised by model construction and the internal algorithmic helpers.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The model violates a §3 structural invariant: non-bipartite arc,
    /// non-positive weight, duplicate identifier, or similar.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// An analyzer option was outside its documented range.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// SVD condition number exceeded the stability threshold, or a P/T-invariant
    /// could not be rationalized within tolerance.
    #[error("numeric instability: {0}")]
    NumericInstability(String),

    /// A caller-supplied bound (`max_states`, `max_cycles`, `max_size`, ...) was
    /// reached before the computation completed.
    #[error("limit reached: {0}")]
    LimitReached(String),

    /// A dependency analyzer (siphons for deadlock, deadlock for liveness, ...)
    /// returned `success=false`.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// An unexpected internal condition: arithmetic overflow, broken invariant,
    /// allocation failure.
    #[error("internal error in {0}")]
    Internal(String),
}

/// Result alias used by internal fallible helpers.
pub type Result<T> = std::result::Result<T, TopologyError>;
