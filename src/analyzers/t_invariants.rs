//! T-invariant analyzer (spec §4.3): minimal non-negative integer transition
//! vectors `x` with `Cx = 0` — reproducible firing sequences. Mirrors
//! `p_invariants` with presets/postsets and the matrix transpose swapped.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::linalg::{integerize_invariant, right_null_space};
use crate::model::{PetriNet, TransitionIndex};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TInvariantOptions {
    pub max_invariants: Option<usize>,
}

impl AnalyzerOptions for TInvariantOptions {
    fn validate(&self) -> Result<()> {
        if let Some(0) = self.max_invariants {
            return Err(TopologyError::InvalidOption("max_invariants must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TInvariant {
    pub transitions: Vec<String>,
    pub weights: Vec<i64>,
    pub firing_sequence: String,
    pub total_firings: i64,
}

pub struct TInvariantAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl TInvariantAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    fn compute(&self, options: &TInvariantOptions) -> AnalysisResult {
        let net = &self.model;
        if net.transition_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no transitions, so no reproducible firing sequences");
        }
        if net.place_count() == 0 {
            // No conservation constraints at all: every single-transition
            // firing is trivially reproducible.
            let invariants: Vec<TInvariant> = net
                .transitions()
                .iter()
                .map(|t| TInvariant {
                    transitions: vec![t.id.clone()],
                    weights: vec![1],
                    firing_sequence: t.name.clone(),
                    total_firings: 1,
                })
                .collect();
            return finish(invariants, options);
        }

        let c = net.incidence_matrix().as_dmatrix().clone();
        let null_space = right_null_space(&c);

        let mut warnings = Vec::new();
        let mut invariants: Vec<TInvariant> = Vec::new();
        let mut seen: Vec<Vec<i64>> = Vec::new();
        for v in &null_space.vectors {
            match integerize_invariant(v) {
                Some(ints) => {
                    if seen.iter().any(|s| s == &ints) {
                        continue;
                    }
                    seen.push(ints.clone());
                    invariants.push(build_invariant(net, &ints));
                }
                None => {
                    if null_space.sigma_max > 0.0 {
                        warnings.push("non-rational T-invariant discarded".to_string());
                    }
                }
            }
        }
        if null_space.is_ill_conditioned() {
            warnings.push("ill-conditioned incidence matrix; some T-invariants may be missing".to_string());
        }

        let mut result = finish(invariants, options);
        for w in warnings {
            result = result.with_warning(w);
        }
        result
    }
}

fn build_invariant(net: &PetriNet, weights: &[i64]) -> TInvariant {
    let mut transitions = Vec::new();
    let mut t_weights = Vec::new();
    let mut terms = Vec::new();
    let mut total_firings = 0i64;
    for (i, &w) in weights.iter().enumerate() {
        if w != 0 {
            let t = net.transition(TransitionIndex(i));
            transitions.push(t.id.clone());
            t_weights.push(w);
            total_firings += w;
            terms.push(if w == 1 { t.name.clone() } else { format!("{}×{}", w, t.name) });
        }
    }
    TInvariant {
        transitions,
        weights: t_weights,
        firing_sequence: terms.join(", "),
        total_firings,
    }
}

fn finish(mut invariants: Vec<TInvariant>, options: &TInvariantOptions) -> AnalysisResult {
    let mut truncated_warning = None;
    if let Some(max) = options.max_invariants {
        if invariants.len() > max {
            truncated_warning = Some(format!("truncated at {max}"));
            invariants.truncate(max);
        }
    }
    let count = invariants.len();
    let mut data = HashMap::new();
    data.insert("invariants".into(), json!(invariants));
    data.insert("count".into(), json!(count));
    let mut result = AnalysisResult::success(data, format!("found {count} T-invariant(s)"));
    if let Some(w) = truncated_warning {
        result = result.with_warning(w);
    }
    result
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("invariants".into(), json!([]));
    data.insert("count".into(), json!(0));
    data
}

impl Analyzer for TInvariantAnalyzer {
    type Options = TInvariantOptions;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PetriNetBuilder, TransitionClass};

    #[test]
    fn finds_the_reproducing_sequence() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 1);
        b.add_place("P2", "P2", 0);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_transition("T2", "T2", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        b.add_arc("T1", "P2", 1);
        b.add_arc("P2", "T2", 1);
        b.add_arc("T2", "P1", 1);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = TInvariantAnalyzer::new(net);
        let result = analyzer.analyze(TInvariantOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(0)), json!(1));
    }

    #[test]
    fn empty_model_is_success() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = TInvariantAnalyzer::new(net);
        let result = analyzer.analyze(TInvariantOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(-1)), json!(0));
    }
}
