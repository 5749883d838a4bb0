//! P-invariant analyzer (spec §4.2): minimal non-negative integer place
//! vectors `y` with `Cᵀy = 0` — the conservation laws of the net.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{Analyzer, AnalyzerOptions, AnalysisResult, ResultCache, timed};
use crate::linalg::{integerize_invariant, right_null_space};
use crate::model::PetriNet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PInvariantOptions {
    pub max_invariants: Option<usize>,
}

impl Default for PInvariantOptions {
    fn default() -> Self {
        Self { max_invariants: None }
    }
}

impl AnalyzerOptions for PInvariantOptions {
    fn validate(&self) -> Result<()> {
        if let Some(0) = self.max_invariants {
            return Err(TopologyError::InvalidOption("max_invariants must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PInvariant {
    pub places: Vec<String>,
    pub weights: Vec<i64>,
    pub sum_expression: String,
    pub conserved_value: i64,
    pub support_size: usize,
}

pub struct PInvariantAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl PInvariantAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    pub fn find_invariants_containing_place(&mut self, options: PInvariantOptions, place_id: &str) -> Vec<PInvariant> {
        let result = self.analyze(options);
        if !result.success {
            return Vec::new();
        }
        let invariants: Vec<PInvariant> = result
            .data
            .get("invariants")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        invariants.into_iter().filter(|inv| inv.places.iter().any(|p| p == place_id)).collect()
    }

    fn compute(&self, options: &PInvariantOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 {
            return AnalysisResult::success(
                empty_data(),
                "empty model: no places, so no conservation laws to find",
            );
        }
        if net.transition_count() == 0 {
            // Every place is trivially conserved on its own.
            let invariants: Vec<PInvariant> = net
                .places()
                .iter()
                .map(|p| PInvariant {
                    places: vec![p.id.clone()],
                    weights: vec![1],
                    sum_expression: p.name.clone(),
                    conserved_value: p.tokens as i64,
                    support_size: 1,
                })
                .collect();
            return finish(invariants, net.place_count(), options);
        }

        let c = net.incidence_matrix();
        let c_t = c.as_dmatrix().transpose();
        let null_space = right_null_space(&c_t);

        let mut warnings = Vec::new();
        let mut invariants: Vec<PInvariant> = Vec::new();
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
                    // Could be a genuine sign conflict (not an invariant, no
                    // warning needed) or a non-rational vector. We can't
                    // distinguish cheaply here, so only warn when the
                    // decomposition was numerically shaky to begin with.
                    if null_space.sigma_max > 0.0 {
                        warnings.push("non-rational P-invariant discarded".to_string());
                    }
                }
            }
        }
        if null_space.is_ill_conditioned() {
            warnings.push("ill-conditioned incidence matrix; some P-invariants may be missing".to_string());
        }

        let mut result = finish(invariants, net.place_count(), options);
        for w in warnings {
            result = result.with_warning(w);
        }
        result
    }
}

fn build_invariant(net: &PetriNet, weights: &[i64]) -> PInvariant {
    let mut places = Vec::new();
    let mut place_weights = Vec::new();
    let mut terms = Vec::new();
    let mut conserved_value: i64 = 0;
    for (i, &w) in weights.iter().enumerate() {
        conserved_value += w * net.place(crate::model::PlaceIndex(i)).tokens as i64;
        if w != 0 {
            let place = net.place(crate::model::PlaceIndex(i));
            places.push(place.id.clone());
            place_weights.push(w);
            terms.push(if w == 1 {
                place.name.clone()
            } else {
                format!("{}·{}", w, place.name)
            });
        }
    }
    PInvariant {
        support_size: places.len(),
        places,
        weights: place_weights,
        sum_expression: terms.join(" + "),
        conserved_value,
    }
}

fn finish(mut invariants: Vec<PInvariant>, place_count: usize, options: &PInvariantOptions) -> AnalysisResult {
    let mut result_warning = None;
    if let Some(max) = options.max_invariants {
        if invariants.len() > max {
            result_warning = Some(format!("truncated at {max}"));
            invariants.truncate(max);
        }
    }

    let mut covered = std::collections::HashSet::new();
    for inv in &invariants {
        for p in &inv.places {
            covered.insert(p.clone());
        }
    }
    let coverage_ratio = if place_count == 0 {
        0.0
    } else {
        covered.len() as f64 / place_count as f64
    };

    let mut data = HashMap::new();
    let count = invariants.len();
    data.insert("invariants".into(), json!(invariants));
    data.insert("count".into(), json!(count));
    data.insert("covered_places".into(), json!(covered.into_iter().collect::<Vec<_>>()));
    data.insert("coverage_ratio".into(), json!(coverage_ratio));

    let summary = format!("found {count} P-invariant(s) covering {:.0}% of places", coverage_ratio * 100.0);
    let mut result = AnalysisResult::success(data, summary);
    if let Some(w) = result_warning {
        result = result.with_warning(w);
    }
    result
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("invariants".into(), json!([]));
    data.insert("count".into(), json!(0));
    data.insert("covered_places".into(), json!([] as [String; 0]));
    data.insert("coverage_ratio".into(), json!(0.0));
    data
}

impl Analyzer for PInvariantAnalyzer {
    type Options = PInvariantOptions;

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

    fn balanced_cycle() -> Arc<PetriNet> {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 1);
        b.add_place("P2", "P2", 0);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_transition("T2", "T2", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        b.add_arc("T1", "P2", 1);
        b.add_arc("P2", "T2", 1);
        b.add_arc("T2", "P1", 1);
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn finds_the_conservation_law() {
        let net = balanced_cycle();
        let mut analyzer = PInvariantAnalyzer::new(net);
        let result = analyzer.analyze(PInvariantOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(0)), json!(1));
        let invariants: Vec<PInvariant> = serde_json::from_value(result.data["invariants"].clone()).unwrap();
        assert_eq!(invariants[0].conserved_value, 1);
        assert_eq!(invariants[0].weights, vec![1, 1]);
    }

    #[test]
    fn empty_model_is_success_with_empty_result() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = PInvariantAnalyzer::new(net);
        let result = analyzer.analyze(PInvariantOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(-1)), json!(0));
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let net = balanced_cycle();
        let mut analyzer = PInvariantAnalyzer::new(net);
        let a = analyzer.analyze(PInvariantOptions::default());
        let b = analyzer.analyze(PInvariantOptions::default());
        assert_eq!(a, b);
    }

    #[test]
    fn zero_transitions_give_one_trivial_invariant_per_place() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 3);
        b.add_place("P2", "P2", 5);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = PInvariantAnalyzer::new(net);
        let result = analyzer.analyze(PInvariantOptions::default());
        assert_eq!(result.get("count", json!(0)), json!(2));
    }
}
