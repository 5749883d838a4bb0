//! Trap analyzer (spec §4.5): minimal place sets S with S• ⊆ •S — once
//! marked, stays marked. Dual of [`super::siphons`]: a minimal trap of a net
//! is exactly a minimal siphon of its [`PetriNet::reversed`] (spec §8),
//! so this analyzer reuses `find_minimal_siphons` rather than re-deriving the
//! enumeration.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::siphons::find_minimal_siphons;
use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::PetriNet;

const DEFAULT_MAX_SIZE: usize = 8;
const DEFAULT_MAX_SIZE_EXHAUSTIVE: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapOptions {
    pub max_size: usize,
    pub max_size_exhaustive: usize,
}

impl Default for TrapOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_size_exhaustive: DEFAULT_MAX_SIZE_EXHAUSTIVE,
        }
    }
}

impl AnalyzerOptions for TrapOptions {
    fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(TopologyError::InvalidOption("max_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapCriticality {
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trap {
    pub places: Vec<String>,
    pub size: usize,
    pub is_marked: bool,
    pub total_tokens: u64,
    pub criticality: TrapCriticality,
}

pub struct TrapAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl TrapAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    fn compute(&self, options: &TrapOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no places, so no traps");
        }

        let reversed = net.reversed();
        let (sets, enumeration_truncated) = find_minimal_siphons(&reversed, options.max_size, options.max_size_exhaustive);

        // Place ids are preserved 1:1 by `reversed()`, so the index sets found
        // over the reversed net address the same places in the original.
        let mut traps: Vec<Trap> = sets
            .into_iter()
            .map(|set| {
                let total_tokens: u64 = set.iter().map(|&p| net.place(p).tokens).sum();
                let is_marked = total_tokens > 0;
                let size = set.len();
                let criticality = if total_tokens > 100 {
                    TrapCriticality::High
                } else {
                    match size {
                        1..=2 => TrapCriticality::High,
                        3..=5 => TrapCriticality::Medium,
                        _ => TrapCriticality::Low,
                    }
                };
                Trap {
                    places: set.iter().map(|&p| net.place(p).id.clone()).collect(),
                    size,
                    is_marked,
                    total_tokens,
                    criticality,
                }
            })
            .collect();
        traps.sort_by(|a, b| a.places.cmp(&b.places));

        let count = traps.len();
        let mut data = HashMap::new();
        data.insert("traps".into(), json!(traps));
        data.insert("count".into(), json!(count));

        let mut result = AnalysisResult::success(data, format!("found {count} minimal trap(s)"));
        if enumeration_truncated {
            result = result.with_warning(format!(
                "enumeration limited to subsets up to size {}; results are a conservative under-approximation",
                options.max_size
            ));
        }
        result
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("traps".into(), json!([]));
    data.insert("count".into(), json!(0));
    data
}

impl Analyzer for TrapAnalyzer {
    type Options = TrapOptions;

    fn analyze(&mut self, options: Self::Options) -> AnalysisResult {
        if let Err(e) = options.validate() {
            return AnalysisResult::failure(e.to_string());
        }
        let model_hash = self.model.structural_hash();
        if let Some(cached) = self.cache.get(model_hash, &options) {
            return cached;
        }
        let (result, metadata) = timed(serde_json::to_value(&options).unwrap_or(Value::Null), || self.compute(&options));
        let result = result.with_metadata(metadata);
        self.cache.put(model_hash, &options, result.clone());
        result
    }

    fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
