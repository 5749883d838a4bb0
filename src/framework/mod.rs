//! The analysis framework (spec §4.1): the analyzer contract, the uniform
//! result container, per-analyzer caching, and the options validation layer.

mod cache;
mod result;

pub use cache::ResultCache;
pub use result::{AnalysisMetadata, AnalysisResult};

use crate::error::Result;

/// Every analyzer's options type implements this: a `Default` matching the
/// spec's stated defaults, serializable for cache-keying, and a `validate`
/// that turns an out-of-range value into `TopologyError::InvalidOption`
/// (spec §4.1: "invalid option values yield `success=false` with an
/// explanatory error").
pub trait AnalyzerOptions: Default + Clone + serde::Serialize {
    fn validate(&self) -> Result<()>;
}

/// The analyzer contract (spec §4.1): `analyze` is the only user-facing entry
/// point, and never raises for expected input conditions — it only ever
/// returns `success=false` through `AnalysisResult`.
pub trait Analyzer {
    type Options: AnalyzerOptions;

    fn analyze(&mut self, options: Self::Options) -> AnalysisResult;

    /// Drop this analyzer's cache. The next `analyze()` call recomputes.
    fn invalidate(&mut self);

    /// Alias for `invalidate` kept distinct in the public API per spec §4.1's
    /// `{analyze, invalidate, clear_cache}` operation set — both currently do
    /// the same thing (there is no separate "soft" invalidation), but keeping
    /// them as two methods lets a future cache warm-up strategy tell them
    /// apart without changing the trait.
    fn clear_cache(&mut self);
}

/// Measures wall-clock time around a closure and packages it as
/// `AnalysisMetadata`, the way every analyzer's `analyze()` wraps its body.
pub fn timed<F>(parameters: serde_json::Value, f: F) -> (AnalysisResult, AnalysisMetadata)
where
    F: FnOnce() -> AnalysisResult,
{
    let start = std::time::Instant::now();
    let result = f();
    let metadata = AnalysisMetadata::new(start.elapsed(), parameters);
    (result, metadata)
}
