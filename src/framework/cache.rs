//! Per-analyzer result cache (spec §4.1): keyed on `(model structural hash,
//! options)`, invalidated explicitly or implicitly when the model changes.
//!
//! Modeled on `codegraph-ir`'s use of `lru::LruCache` for function summaries —
//! same crate, same bounded-memory rationale, scaled down to one entry per
//! distinct options value an analyzer has actually been called with.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::FxHasher;
use serde::Serialize;

use super::AnalysisResult;

const DEFAULT_CAPACITY: usize = 16;

pub struct ResultCache {
    entries: LruCache<u64, AnalysisResult>,
    current_model_hash: Option<u64>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap()),
            current_model_hash: None,
        }
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached result for `(model_hash, options)`. Any cache entry
    /// recorded under a different model hash is dropped wholesale first —
    /// the model changed, so the whole cache is stale, not just this key.
    pub fn get(&mut self, model_hash: u64, options: &impl Serialize) -> Option<AnalysisResult> {
        self.invalidate_if_model_changed(model_hash);
        let key = cache_key(model_hash, options);
        self.entries.get(&key).cloned()
    }

    pub fn put(&mut self, model_hash: u64, options: &impl Serialize, result: AnalysisResult) {
        self.invalidate_if_model_changed(model_hash);
        let key = cache_key(model_hash, options);
        self.entries.put(key, result);
    }

    /// Drop this analyzer's cache unconditionally.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_model_hash = None;
    }

    fn invalidate_if_model_changed(&mut self, model_hash: u64) {
        if self.current_model_hash != Some(model_hash) {
            self.entries.clear();
            self.current_model_hash = Some(model_hash);
        }
    }
}

fn cache_key(model_hash: u64, options: &impl Serialize) -> u64 {
    let mut hasher = FxHasher::default();
    model_hash.hash(&mut hasher);
    if let Ok(bytes) = serde_json::to_vec(options) {
        bytes.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Opts {
        max: usize,
    }

    #[test]
    fn hit_after_put() {
        let mut cache = ResultCache::new();
        let opts = Opts { max: 10 };
        assert!(cache.get(1, &opts).is_none());
        cache.put(1, &opts, AnalysisResult::success(HashMap::new(), "ok"));
        assert!(cache.get(1, &opts).is_some());
    }

    #[test]
    fn model_change_invalidates_everything() {
        let mut cache = ResultCache::new();
        let opts = Opts { max: 10 };
        cache.put(1, &opts, AnalysisResult::success(HashMap::new(), "ok"));
        assert!(cache.get(2, &opts).is_none());
        // and the old key is gone too, not just shadowed
        assert!(cache.get(1, &opts).is_none());
    }

    #[test]
    fn different_options_are_different_keys() {
        let mut cache = ResultCache::new();
        cache.put(1, &Opts { max: 10 }, AnalysisResult::success(HashMap::new(), "a"));
        assert!(cache.get(1, &Opts { max: 11 }).is_none());
    }
}
