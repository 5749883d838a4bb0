//! Cycle analyzer (spec §4.6): elementary cycles in the bipartite place/
//! transition graph, via Johnson's algorithm ([`crate::graph::NodeGraph`]).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::graph::NodeGraph;
use crate::model::{NodeRef, PetriNet};

const DEFAULT_MAX_CYCLES: usize = 100;
const DEFAULT_MIN_LENGTH: usize = 2;
const STEP_BUDGET: usize = 200_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOptions {
    pub max_cycles: usize,
    pub min_length: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl AnalyzerOptions for CycleOptions {
    fn validate(&self) -> Result<()> {
        if self.max_cycles == 0 {
            return Err(TopologyError::InvalidOption("max_cycles must be positive".into()));
        }
        if self.min_length == 0 {
            return Err(TopologyError::InvalidOption("min_length must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleType {
    SelfLoop,
    Balanced,
    PlaceHeavy,
    TransitionHeavy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub length: usize,
    pub names: Vec<String>,
    pub place_count: usize,
    pub transition_count: usize,
    #[serde(rename = "type")]
    pub kind: CycleType,
}

pub struct CycleAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl CycleAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    pub fn find_cycles_containing_node(&mut self, options: CycleOptions, node_id: &str) -> Vec<Cycle> {
        let result = self.analyze(options);
        if !result.success {
            return Vec::new();
        }
        let cycles: Vec<Cycle> = result
            .data
            .get("cycles")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        cycles.into_iter().filter(|c| c.nodes.iter().any(|n| n == node_id)).collect()
    }

    fn compute(&self, options: &CycleOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 && net.transition_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no cycles possible");
        }

        let graph = NodeGraph::build(net);
        let (raw_cycles, truncated) = graph.johnson_cycles(options.max_cycles, options.min_length, STEP_BUDGET);

        let mut longest_length = 0usize;
        let cycles: Vec<Cycle> = raw_cycles
            .into_iter()
            .map(|path| {
                let mut node_ids = Vec::with_capacity(path.len());
                let mut names = Vec::with_capacity(path.len());
                let mut place_count = 0usize;
                let mut transition_count = 0usize;
                for idx in &path {
                    match graph.node_at(*idx) {
                        NodeRef::Place(p) => {
                            node_ids.push(net.place(p).id.clone());
                            names.push(net.place(p).name.clone());
                            place_count += 1;
                        }
                        NodeRef::Transition(t) => {
                            node_ids.push(net.transition(t).id.clone());
                            names.push(net.transition(t).name.clone());
                            transition_count += 1;
                        }
                    }
                }
                let length = node_ids.len();
                longest_length = longest_length.max(length);
                let kind = if length <= 2 {
                    CycleType::SelfLoop
                } else if place_count == transition_count {
                    CycleType::Balanced
                } else if place_count > transition_count {
                    CycleType::PlaceHeavy
                } else {
                    CycleType::TransitionHeavy
                };
                Cycle {
                    nodes: node_ids,
                    length,
                    names,
                    place_count,
                    transition_count,
                    kind,
                }
            })
            .collect();

        let count = cycles.len();
        let mut data = HashMap::new();
        data.insert("cycles".into(), json!(cycles));
        data.insert("count".into(), json!(count));
        data.insert("longest_length".into(), json!(longest_length));
        data.insert("truncated".into(), json!(truncated));

        let mut result = AnalysisResult::success(data, format!("found {count} elementary cycle(s)"));
        if truncated {
            result = result.with_warning(format!("cycle enumeration truncated at {} cycles", options.max_cycles));
        }
        result
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("cycles".into(), json!([]));
    data.insert("count".into(), json!(0));
    data.insert("longest_length".into(), json!(0));
    data.insert("truncated".into(), json!(false));
    data
}

impl Analyzer for CycleAnalyzer {
    type Options = CycleOptions;

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
    fn finds_the_balanced_cycle() {
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
        let mut analyzer = CycleAnalyzer::new(net);
        let result = analyzer.analyze(CycleOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(0)), json!(1));
        let cycles: Vec<Cycle> = serde_json::from_value(result.data["cycles"].clone()).unwrap();
        assert_eq!(cycles[0].length, 4);
        assert_eq!(cycles[0].kind, CycleType::Balanced);
        assert_eq!(cycles[0].nodes, vec!["P1", "T1", "P2", "T2"]);
    }

    #[test]
    fn empty_model_is_success() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = CycleAnalyzer::new(net);
        let result = analyzer.analyze(CycleOptions::default());
        assert!(result.success);
        assert_eq!(result.get("count", json!(-1)), json!(0));
    }
}
