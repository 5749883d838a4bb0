//! Liveness analyzer (spec §4.11): conservative L0–L4 classification per
//! transition, refined by bounded reachability and the deadlock analyzer's
//! verdict on visited markings.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analyzers::deadlocks::DeadlockAnalyzer;
use crate::analyzers::reachability::{ReachabilityAnalyzer, ReachabilityOptions};
use crate::error::Result;
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::graph::NodeGraph;
use crate::model::{NodeRef, PetriNet, TransitionIndex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessOptions {
    pub check_deadlocks: bool,
    pub check_token_flow: bool,
    pub classify_levels: bool,
}

impl Default for LivenessOptions {
    fn default() -> Self {
        Self {
            check_deadlocks: true,
            check_token_flow: true,
            classify_levels: true,
        }
    }
}

impl AnalyzerOptions for LivenessOptions {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LivenessLevel {
    L0,
    L1,
    L2,
    L3,
    L4,
}

pub struct LivenessAnalyzer {
    model: Arc<PetriNet>,
    reachability: ReachabilityAnalyzer,
    cache: ResultCache,
}

impl LivenessAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        let reachability = ReachabilityAnalyzer::new(Arc::clone(&model));
        Self {
            model,
            reachability,
            cache: ResultCache::new(),
        }
    }

    fn compute(&mut self, options: &LivenessOptions) -> AnalysisResult {
        let net = Arc::clone(&self.model);
        let mut warnings = Vec::new();

        let reach_summary = self
            .reachability
            .summarize(&ReachabilityOptions {
                max_states: 10_000,
                max_depth: 100,
                ..ReachabilityOptions::default()
            })
            .ok();
        if reach_summary.is_none() {
            warnings.push("dependency unavailable: reachability could not be computed".to_string());
        }
        let exhaustive = reach_summary
            .as_ref()
            .map(|s| !s.truncated_by_states && !s.truncated_by_depth)
            .unwrap_or(false);
        if !exhaustive {
            warnings.push("liveness classification is a conservative under-approximation for L0-L2".to_string());
        }

        let graph = NodeGraph::build(&net);

        let mut levels: HashMap<String, LivenessLevel> = HashMap::new();
        for i in 0..net.transition_count() {
            let t = TransitionIndex(i);
            let transition = net.transition(t);
            let postset = net.transition_postset(t);

            let reachable = reach_summary.as_ref().map(|s| s.reachable_transitions.contains(&t)).unwrap_or(false);

            let level = if is_source_like(&net, t) && !postset.is_empty() {
                LivenessLevel::L4
            } else if !reachable {
                LivenessLevel::L0
            } else if options.check_token_flow && is_in_cycle_with_producer(&net, &graph, t) {
                LivenessLevel::L3
            } else {
                LivenessLevel::L1
            };
            levels.insert(transition.id.clone(), level);
        }

        if options.check_deadlocks {
            if let Some(summary) = &reach_summary {
                for deadlock_marking in &summary.deadlock_states {
                    for i in 0..net.transition_count() {
                        let t = TransitionIndex(i);
                        let id = &net.transition(t).id;
                        // A transition only reachable through states that are
                        // themselves deadlocks offers no live continuation;
                        // downgrade one level rather than claiming L3/L4.
                        if DeadlockAnalyzer::marking_is_deadlock(&net, deadlock_marking) && !net.is_enabled(t, deadlock_marking) {
                            if let Some(level) = levels.get_mut(id) {
                                *level = downgrade(*level);
                            }
                        }
                    }
                }
            }
        }

        let dead_transitions: Vec<String> = levels.iter().filter(|(_, &lvl)| lvl == LivenessLevel::L0).map(|(id, _)| id.clone()).collect();
        let live_transitions: Vec<String> = levels
            .iter()
            .filter(|(_, &lvl)| lvl == LivenessLevel::L3 || lvl == LivenessLevel::L4)
            .map(|(id, _)| id.clone())
            .collect();
        let is_live = net.transition_count() > 0 && levels.values().all(|&lvl| lvl == LivenessLevel::L3 || lvl == LivenessLevel::L4);

        let mut sorted_dead = dead_transitions;
        sorted_dead.sort();
        let mut sorted_live = live_transitions;
        sorted_live.sort();

        let mut data = HashMap::new();
        data.insert("liveness_levels".into(), json!(levels));
        data.insert("dead_transitions".into(), json!(sorted_dead));
        data.insert("live_transitions".into(), json!(sorted_live));
        data.insert("is_live".into(), json!(is_live));

        let summary_text = if is_live {
            "every transition is live".to_string()
        } else {
            format!("{} dead transition(s)", sorted_dead.len())
        };
        let mut result = AnalysisResult::success(data, summary_text);
        for w in warnings {
            result = result.with_warning(w);
        }
        result
    }
}

fn downgrade(level: LivenessLevel) -> LivenessLevel {
    match level {
        LivenessLevel::L4 => LivenessLevel::L3,
        LivenessLevel::L3 => LivenessLevel::L2,
        LivenessLevel::L2 => LivenessLevel::L1,
        LivenessLevel::L1 => LivenessLevel::L0,
        LivenessLevel::L0 => LivenessLevel::L0,
    }
}

/// Conservative structural proxy for "t lies on a cycle fed by a token
/// producer": `t` itself must lie on a directed cycle of the bipartite graph
/// (not merely have a preset place with *some* feeding transition elsewhere
/// in the net — that transition may never fire again once its own tokens
/// are exhausted, as in a producer-consumer chain with no loop back).
fn is_in_cycle_with_producer(net: &PetriNet, graph: &NodeGraph, t: TransitionIndex) -> bool {
    let preset = net.transition_preset(t);
    if preset.is_empty() {
        return false;
    }
    graph.node_lies_on_cycle(graph.index_of(NodeRef::Transition(t)))
}

/// A transition is "source-like" when every place in its preset is itself a
/// pure source (no transition ever refills it) — vacuously true for a
/// transition with an empty preset altogether. Such a transition fires as
/// long as its initial allotment lasts, which this conservative classifier
/// treats as L4 rather than tracking the eventual exhaustion.
fn is_source_like(net: &PetriNet, t: TransitionIndex) -> bool {
    net.transition_preset(t).iter().all(|&p| net.place_preset(p).is_empty())
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("liveness_levels".into(), json!({}));
    data.insert("dead_transitions".into(), json!([] as [String; 0]));
    data.insert("live_transitions".into(), json!([] as [String; 0]));
    data.insert("is_live".into(), json!(true));
    data
}

impl Analyzer for LivenessAnalyzer {
    type Options = LivenessOptions;

    fn analyze(&mut self, options: Self::Options) -> AnalysisResult {
        if let Err(e) = options.validate() {
            return AnalysisResult::failure(e.to_string());
        }
        let model_hash = self.model.structural_hash();
        if let Some(cached) = self.cache.get(model_hash, &options) {
            return cached;
        }
        if self.model.transition_count() == 0 {
            let result = AnalysisResult::success(empty_data(), "empty model: no transitions, so nothing to classify");
            self.cache.put(model_hash, &options, result.clone());
            return result;
        }
        let (result, metadata) = timed(serde_json::to_value(&options).unwrap_or(Value::Null), || self.compute(&options));
        let result = result.with_metadata(metadata);
        self.cache.put(model_hash, &options, result.clone());
        result
    }

    fn invalidate(&mut self) {
        self.cache.clear();
        self.reachability.invalidate();
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
    fn balanced_cycle_is_live() {
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
        let mut analyzer = LivenessAnalyzer::new(net);
        let result = analyzer.analyze(LivenessOptions::default());
        assert!(result.success);
        assert_eq!(result.get("is_live", json!(false)), json!(true));
    }

    #[test]
    fn producer_consumer_classifies_produce_as_source() {
        let mut b = PetriNetBuilder::new();
        b.add_place("Producer", "Producer", 1);
        b.add_place("Buffer", "Buffer", 0);
        b.add_place("Consumer", "Consumer", 0);
        b.add_transition("Produce", "Produce", TransitionClass::Immediate);
        b.add_transition("Consume", "Consume", TransitionClass::Immediate);
        b.add_arc("Producer", "Produce", 1);
        b.add_arc("Produce", "Buffer", 1);
        b.add_arc("Buffer", "Consume", 1);
        b.add_arc("Consume", "Consumer", 1);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = LivenessAnalyzer::new(net);
        let result = analyzer.analyze(LivenessOptions::default());
        let levels: HashMap<String, LivenessLevel> = serde_json::from_value(result.data["liveness_levels"].clone()).unwrap();
        assert_eq!(levels["Produce"], LivenessLevel::L4);
        // Consume has a fed preset place (Buffer, fed by Produce) but does not
        // lie on a cycle back to Produce — once Producer is exhausted nothing
        // ever refills Buffer again, so Consume must not be labeled L3/L4.
        assert_eq!(levels["Consume"], LivenessLevel::L1);
    }

    #[test]
    fn empty_model_is_success() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = LivenessAnalyzer::new(net);
        let result = analyzer.analyze(LivenessOptions::default());
        assert!(result.success);
        assert_eq!(result.get("is_live", json!(false)), json!(true));
    }
}
