//! Hub analyzer (spec §4.8): high-degree places and transitions in the
//! bipartite graph.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, PlaceIndex, TransitionIndex};

const DEFAULT_MIN_DEGREE: usize = 3;
const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeTypeFilter {
    Place,
    Transition,
    Both,
}

impl Default for NodeTypeFilter {
    fn default() -> Self {
        NodeTypeFilter::Both
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubOptions {
    pub min_degree: usize,
    pub top_n: usize,
    pub node_type: NodeTypeFilter,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            min_degree: DEFAULT_MIN_DEGREE,
            top_n: DEFAULT_TOP_N,
            node_type: NodeTypeFilter::Both,
        }
    }
}

impl AnalyzerOptions for HubOptions {
    fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(TopologyError::InvalidOption("top_n must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub degree: usize,
    pub in_degree: usize,
    pub out_degree: usize,
    pub weighted_degree: u64,
}

pub struct HubAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
    all_degrees: Vec<Hub>,
}

impl HubAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        let all_degrees = compute_all_degrees(&model);
        Self {
            model,
            cache: ResultCache::new(),
            all_degrees,
        }
    }

    pub fn is_hub(&mut self, options: HubOptions, node_id: &str) -> bool {
        let result = self.analyze(options);
        if !result.success {
            return false;
        }
        result
            .data
            .get("hubs")
            .and_then(|v| serde_json::from_value::<Vec<Hub>>(v.clone()).ok())
            .map(|hubs| hubs.iter().any(|h| h.node_id == node_id))
            .unwrap_or(false)
    }

    pub fn get_node_degree_info(&self, node_id: &str) -> Option<Hub> {
        self.all_degrees.iter().find(|h| h.node_id == node_id).cloned()
    }

    fn compute(&self, options: &HubOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 && net.transition_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no nodes, so no hubs");
        }

        let filtered: Vec<&Hub> = self
            .all_degrees
            .iter()
            .filter(|h| match options.node_type {
                NodeTypeFilter::Place => h.node_type == "place",
                NodeTypeFilter::Transition => h.node_type == "transition",
                NodeTypeFilter::Both => true,
            })
            .collect();

        let max_degree = filtered.iter().map(|h| h.degree).max().unwrap_or(0);
        let average_degree = if filtered.is_empty() {
            0.0
        } else {
            filtered.iter().map(|h| h.degree).sum::<usize>() as f64 / filtered.len() as f64
        };

        let mut hubs: Vec<Hub> = filtered.into_iter().filter(|h| h.degree >= options.min_degree).cloned().collect();
        hubs.sort_by(|a, b| b.degree.cmp(&a.degree).then(b.weighted_degree.cmp(&a.weighted_degree)).then(a.node_id.cmp(&b.node_id)));
        hubs.truncate(options.top_n);

        let hub_count = hubs.len();
        let mut data = HashMap::new();
        data.insert("hubs".into(), json!(hubs));
        data.insert("hub_count".into(), json!(hub_count));
        data.insert("max_degree".into(), json!(max_degree));
        data.insert("average_degree".into(), json!(average_degree));

        AnalysisResult::success(data, format!("found {hub_count} hub(s), max degree {max_degree}"))
    }
}

fn compute_all_degrees(net: &PetriNet) -> Vec<Hub> {
    let mut hubs = Vec::with_capacity(net.place_count() + net.transition_count());
    for i in 0..net.place_count() {
        let p = PlaceIndex(i);
        let place = net.place(p);
        let in_degree = net.place_preset(p).len();
        let out_degree = net.place_postset(p).len();
        let weighted_degree: u64 = net.place_preset(p).iter().map(|&t| net.weight_transition_to_place(t, p) as u64).sum::<u64>()
            + net.place_postset(p).iter().map(|&t| net.weight_place_to_transition(p, t) as u64).sum::<u64>();
        hubs.push(Hub {
            node_id: place.id.clone(),
            node_name: place.name.clone(),
            node_type: "place".into(),
            degree: in_degree + out_degree,
            in_degree,
            out_degree,
            weighted_degree,
        });
    }
    for i in 0..net.transition_count() {
        let t = TransitionIndex(i);
        let transition = net.transition(t);
        let in_degree = net.transition_preset(t).len();
        let out_degree = net.transition_postset(t).len();
        let weighted_degree: u64 = net.transition_preset(t).iter().map(|&p| net.weight_place_to_transition(p, t) as u64).sum::<u64>()
            + net.transition_postset(t).iter().map(|&p| net.weight_transition_to_place(t, p) as u64).sum::<u64>();
        hubs.push(Hub {
            node_id: transition.id.clone(),
            node_name: transition.name.clone(),
            node_type: "transition".into(),
            degree: in_degree + out_degree,
            in_degree,
            out_degree,
            weighted_degree,
        });
    }
    hubs
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("hubs".into(), json!([]));
    data.insert("hub_count".into(), json!(0));
    data.insert("max_degree".into(), json!(0));
    data.insert("average_degree".into(), json!(0.0));
    data
}

impl Analyzer for HubAnalyzer {
    type Options = HubOptions;

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

    fn hub_net() -> Arc<PetriNet> {
        let mut b = PetriNetBuilder::new();
        b.add_place("ATP", "ATP", 10);
        for i in 0..10 {
            let id = format!("T{i}");
            b.add_transition(&id, &id, TransitionClass::Immediate);
            if i % 2 == 0 {
                b.add_arc("ATP", &id, 1);
            } else {
                b.add_arc(&id, "ATP", 1);
            }
        }
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn finds_the_hub_place() {
        let net = hub_net();
        let mut analyzer = HubAnalyzer::new(net);
        let result = analyzer.analyze(HubOptions {
            min_degree: 5,
            ..HubOptions::default()
        });
        assert!(result.success);
        let hubs: Vec<Hub> = serde_json::from_value(result.data["hubs"].clone()).unwrap();
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].node_id, "ATP");
        assert_eq!(hubs[0].degree, 10);
    }

    #[test]
    fn empty_model_is_success() {
        let net = Arc::new(PetriNetBuilder::new().build().unwrap());
        let mut analyzer = HubAnalyzer::new(net);
        let result = analyzer.analyze(HubOptions::default());
        assert!(result.success);
        assert_eq!(result.get("hub_count", json!(-1)), json!(0));
    }
}
