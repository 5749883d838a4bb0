//! Fairness analyzer (spec §4.13): structural conflict sets (places with
//! more than one competing output transition) and their starvation risk.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, PlaceIndex};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FairnessOptions {}

impl AnalyzerOptions for FairnessOptions {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarvationRisk {
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetFairness {
    Strong,
    Weak,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSet {
    pub place: String,
    pub transitions: Vec<String>,
    pub starvation_risk: StarvationRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConflict {
    pub place: String,
    pub transitions: Vec<String>,
}

pub struct FairnessAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl FairnessAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    fn compute(&self, _options: &FairnessOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no places, so no conflict sets");
        }

        let mut conflict_sets = Vec::new();
        let mut priority_conflicts = Vec::new();

        for i in 0..net.place_count() {
            let p = PlaceIndex(i);
            let postset = net.place_postset(p);
            if postset.len() < 2 {
                continue;
            }
            let transitions: Vec<String> = postset.iter().map(|&t| net.transition(t).id.clone()).collect();

            let priorities: Vec<Option<i32>> = postset.iter().map(|&t| net.transition(t).priority).collect();
            let has_priority_conflict = priorities.iter().flatten().collect::<std::collections::HashSet<_>>().len() > 1;
            if has_priority_conflict {
                priority_conflicts.push(PriorityConflict {
                    place: net.place(p).id.clone(),
                    transitions: transitions.clone(),
                });
            }

            // The lowest-priority competitor starves iff its demand (arc
            // weight) is never the cheapest draw on `p` among its rivals —
            // a conservative structural stand-in for "every enabling
            // marking also enables a higher-priority rival".
            let demands: Vec<u32> = postset.iter().map(|&t| net.weight_place_to_transition(p, t)).collect();
            let min_demand = demands.iter().copied().min().unwrap_or(1);
            let max_demand = demands.iter().copied().max().unwrap_or(1);
            let scarce = net.place(p).tokens <= max_demand as u64;

            let risk = if has_priority_conflict && min_demand != max_demand {
                StarvationRisk::High
            } else if scarce {
                StarvationRisk::Medium
            } else {
                StarvationRisk::Low
            };

            conflict_sets.push(ConflictSet {
                place: net.place(p).id.clone(),
                transitions,
                starvation_risk: risk,
            });
        }
        conflict_sets.sort_by(|a, b| a.place.cmp(&b.place));
        priority_conflicts.sort_by(|a, b| a.place.cmp(&b.place));

        let net_fairness = if conflict_sets.is_empty() {
            NetFairness::Strong
        } else if conflict_sets.iter().any(|c| c.starvation_risk == StarvationRisk::High) {
            NetFairness::None
        } else if conflict_sets.iter().all(|c| c.starvation_risk == StarvationRisk::Low) {
            NetFairness::Weak
        } else {
            NetFairness::None
        };

        let mut data = HashMap::new();
        data.insert("conflict_sets".into(), json!(conflict_sets));
        data.insert("priority_conflicts".into(), json!(priority_conflicts));
        data.insert("net_fairness".into(), json!(net_fairness));

        AnalysisResult::success(data, format!("{} conflict set(s), net fairness {:?}", conflict_sets.len(), net_fairness))
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("conflict_sets".into(), json!([]));
    data.insert("priority_conflicts".into(), json!([]));
    data.insert("net_fairness".into(), json!(NetFairness::Strong));
    data
}

impl Analyzer for FairnessAnalyzer {
    type Options = FairnessOptions;

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
    fn two_competing_transitions_form_a_conflict_set() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 1);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_transition("T2", "T2", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        b.add_arc("P1", "T2", 1);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = FairnessAnalyzer::new(net);
        let result = analyzer.analyze(FairnessOptions::default());
        assert!(result.success);
        let sets: Vec<ConflictSet> = serde_json::from_value(result.data["conflict_sets"].clone()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].transitions.len(), 2);
    }

    #[test]
    fn no_conflicts_is_strongly_fair() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 1);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = FairnessAnalyzer::new(net);
        let result = analyzer.analyze(FairnessOptions::default());
        let fairness: NetFairness = serde_json::from_value(result.data["net_fairness"].clone()).unwrap();
        assert_eq!(fairness, NetFairness::Strong);
    }

    #[test]
    fn empty_model_is_success() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = FairnessAnalyzer::new(net);
        let result = analyzer.analyze(FairnessOptions::default());
        assert!(result.success);
    }
}
