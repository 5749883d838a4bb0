//! Boundedness analyzer (spec §4.10): decides whether each place is
//! k-bounded, consulting P-invariants (§4.2) for conservation and
//! reachability (§4.9) for an observed lower bound. Constructor-injected with
//! both collaborators, per the design note rejecting ad-hoc lookups from
//! inside `compute()`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analyzers::p_invariants::{PInvariant, PInvariantAnalyzer, PInvariantOptions};
use crate::analyzers::reachability::{ReachabilityAnalyzer, ReachabilityOptions};
use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, PlaceIndex};

const DEFAULT_MAX_BOUND: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundednessOptions {
    pub max_bound: u64,
    pub check_conservation: bool,
}

impl Default for BoundednessOptions {
    fn default() -> Self {
        Self {
            max_bound: DEFAULT_MAX_BOUND,
            check_conservation: true,
        }
    }
}

impl AnalyzerOptions for BoundednessOptions {
    fn validate(&self) -> Result<()> {
        if self.max_bound == 0 {
            return Err(TopologyError::InvalidOption("max_bound must be positive".into()));
        }
        Ok(())
    }
}

pub struct BoundednessAnalyzer {
    model: Arc<PetriNet>,
    p_invariants: PInvariantAnalyzer,
    reachability: ReachabilityAnalyzer,
    cache: ResultCache,
}

impl BoundednessAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        let p_invariants = PInvariantAnalyzer::new(Arc::clone(&model));
        let reachability = ReachabilityAnalyzer::new(Arc::clone(&model));
        Self {
            model,
            p_invariants,
            reachability,
            cache: ResultCache::new(),
        }
    }

    fn compute(&mut self, options: &BoundednessOptions) -> AnalysisResult {
        let net = Arc::clone(&self.model);
        if net.place_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no places, so no boundedness to assess");
        }

        let mut warnings = Vec::new();
        let invariants = if options.check_conservation {
            let result = self.p_invariants.analyze(PInvariantOptions::default());
            if !result.success {
                warnings.push("dependency unavailable: P-invariants could not be computed".to_string());
                Vec::new()
            } else {
                serde_json::from_value::<Vec<PInvariant>>(result.data["invariants"].clone()).unwrap_or_default()
            }
        } else {
            Vec::new()
        };

        // Each invariant y with conserved value c bounds every place p in its
        // support individually: y_p · M[p] ≤ c, so M[p] ≤ c / y_p. A place
        // takes the tightest bound across every invariant that covers it.
        let mut structural_bound: Vec<Option<u64>> = vec![None; net.place_count()];
        for inv in &invariants {
            if inv.conserved_value < 0 {
                continue;
            }
            for (pid, &w) in inv.places.iter().zip(&inv.weights) {
                if w <= 0 {
                    continue;
                }
                let Some(idx) = net.place_by_id(pid) else { continue };
                let bound = (inv.conserved_value / w as i64).max(0) as u64;
                structural_bound[idx.0] = Some(structural_bound[idx.0].map_or(bound, |b| b.min(bound)));
            }
        }
        let is_conservative = !invariants.is_empty()
            && invariants
                .iter()
                .any(|inv| inv.places.len() == net.place_count() && inv.weights.iter().all(|&w| w > 0));

        let reachability_options = ReachabilityOptions {
            max_states: 100,
            max_depth: 50,
            ..ReachabilityOptions::default()
        };
        let reach_summary = self.reachability.summarize(&reachability_options).ok();
        let mut observed_max = vec![0u64; net.place_count()];
        let mut reachability_truncated = false;
        if let Some(summary) = &reach_summary {
            for (i, &(_, hi)) in summary.token_range_per_place.iter().enumerate() {
                observed_max[i] = hi;
            }
            reachability_truncated = summary.truncated_by_states || summary.truncated_by_depth;
            if summary.grew_unboundedly {
                warnings.push("marking grew unboundedly — results may undercount".to_string());
            }
        } else {
            warnings.push("dependency unavailable: reachability could not be computed".to_string());
        }

        let mut place_bounds: HashMap<String, Value> = HashMap::new();
        let mut unbounded_places = Vec::new();
        let mut overall_bound: Option<u64> = Some(0);
        let mut used_over_approximation = false;

        for i in 0..net.place_count() {
            let place = net.place(PlaceIndex(i));
            let bound = match structural_bound[i] {
                Some(b) => {
                    if observed_max[i] < b {
                        used_over_approximation = true;
                    }
                    Some(b)
                }
                None => {
                    // No covering invariant: fall back to observed reachability
                    // maximum as a lower bound; without exhaustive search this
                    // is not a proof, so treat anything touching max_bound or
                    // any truncation as potentially unbounded.
                    if reachability_truncated || observed_max[i] >= options.max_bound {
                        None
                    } else {
                        Some(observed_max[i])
                    }
                }
            };
            match bound {
                Some(b) if b <= options.max_bound => {
                    place_bounds.insert(place.id.clone(), json!(b));
                    overall_bound = overall_bound.map(|acc| acc.max(b));
                }
                _ => {
                    place_bounds.insert(place.id.clone(), json!("unbounded"));
                    unbounded_places.push(place.id.clone());
                    overall_bound = None;
                }
            }
        }

        let is_bounded = unbounded_places.is_empty();
        let is_safe = is_bounded && overall_bound.map(|b| b <= 1).unwrap_or(false);

        let mut data = HashMap::new();
        data.insert("is_bounded".into(), json!(is_bounded));
        data.insert("k_bound".into(), if is_bounded { json!(overall_bound) } else { Value::Null });
        data.insert("is_safe".into(), json!(is_safe));
        data.insert("unbounded_places".into(), json!(unbounded_places));
        data.insert("place_bounds".into(), json!(place_bounds));
        data.insert("is_conservative".into(), json!(is_conservative));

        let summary = if is_bounded {
            format!("bounded, k = {}", overall_bound.unwrap_or(0))
        } else {
            format!("unbounded at place(s) {}", unbounded_places.join(", "))
        };
        let mut result = AnalysisResult::success(data, summary);
        if used_over_approximation {
            warnings.push("bound is an over-approximation".to_string());
        }
        for w in warnings {
            result = result.with_warning(w);
        }
        result
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("is_bounded".into(), json!(true));
    data.insert("k_bound".into(), json!(0));
    data.insert("is_safe".into(), json!(true));
    data.insert("unbounded_places".into(), json!([] as [String; 0]));
    data.insert("place_bounds".into(), json!({}));
    data.insert("is_conservative".into(), json!(false));
    data
}

impl Analyzer for BoundednessAnalyzer {
    type Options = BoundednessOptions;

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
        self.p_invariants.invalidate();
        self.reachability.invalidate();
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
