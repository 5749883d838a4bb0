//! Path analyzer (spec §4.7): shortest paths, all simple paths, and network
//! metrics over the bipartite place/transition graph.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::graph::NodeGraph;
use crate::model::{NodeRef, PetriNet};

const DEFAULT_MAX_PATHS: usize = 100;
const DEFAULT_MAX_LENGTH: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathOptions {
    pub max_paths: usize,
    pub max_length: usize,
    pub weighted_by_arc_weight: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            max_length: DEFAULT_MAX_LENGTH,
            weighted_by_arc_weight: false,
        }
    }
}

impl AnalyzerOptions for PathOptions {
    fn validate(&self) -> Result<()> {
        if self.max_paths == 0 {
            return Err(TopologyError::InvalidOption("max_paths must be positive".into()));
        }
        if self.max_length == 0 {
            return Err(TopologyError::InvalidOption("max_length must be positive".into()));
        }
        Ok(())
    }
}

pub struct PathAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl PathAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    fn node_id_of(&self, id: &str) -> Option<NodeRef> {
        let net = &self.model;
        if let Some(p) = net.place_by_id(id) {
            Some(NodeRef::Place(p))
        } else {
            net.transition_by_id(id).map(NodeRef::Transition)
        }
    }

    /// Stable identifier, used for the `"path"`/`"paths"` fields.
    fn node_id(&self, node: NodeRef) -> String {
        match node {
            NodeRef::Place(p) => self.model.place(p).id.clone(),
            NodeRef::Transition(t) => self.model.transition(t).id.clone(),
        }
    }

    /// Human-readable name, used for the `"path_names"` field — distinct
    /// from `node_id` per spec §4.7's `{path, path_names}` contract.
    fn node_name(&self, node: NodeRef) -> String {
        match node {
            NodeRef::Place(p) => self.model.place(p).name.clone(),
            NodeRef::Transition(t) => self.model.transition(t).name.clone(),
        }
    }

    pub fn find_shortest_path(&self, source: &str, target: &str, options: &PathOptions) -> Value {
        let net = &self.model;
        let graph = NodeGraph::build(net);
        let (Some(s), Some(t)) = (self.node_id_of(source), self.node_id_of(target)) else {
            return json!({ "path": [], "path_names": [], "length": 0, "exists": false });
        };
        match graph.shortest_path(graph.index_of(s), graph.index_of(t), options.weighted_by_arc_weight) {
            Some((path, cost)) => {
                let ids: Vec<String> = path.iter().map(|&idx| self.node_id(graph.node_at(idx))).collect();
                let names: Vec<String> = path.iter().map(|&idx| self.node_name(graph.node_at(idx))).collect();
                json!({ "path": ids, "path_names": names, "length": cost, "exists": true })
            }
            None => json!({ "path": [], "path_names": [], "length": 0, "exists": false }),
        }
    }

    pub fn find_all_paths(&self, source: &str, target: &str, options: &PathOptions) -> Value {
        let net = &self.model;
        let graph = NodeGraph::build(net);
        let (Some(s), Some(t)) = (self.node_id_of(source), self.node_id_of(target)) else {
            return json!({ "paths": [], "path_count": 0, "shortest_path_length": 0, "longest_path_length": 0, "average_path_length": 0.0 });
        };
        let (raw_paths, _truncated) = graph.all_paths(graph.index_of(s), graph.index_of(t), options.max_length, options.max_paths);
        let paths: Vec<Vec<String>> = raw_paths
            .iter()
            .map(|path| path.iter().map(|&idx| self.node_id(graph.node_at(idx))).collect())
            .collect();
        let lengths: Vec<usize> = paths.iter().map(|p| p.len() - 1).collect();
        let shortest = lengths.iter().min().copied().unwrap_or(0);
        let longest = lengths.iter().max().copied().unwrap_or(0);
        let average = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };
        json!({
            "paths": paths,
            "path_count": paths.len(),
            "shortest_path_length": shortest,
            "longest_path_length": longest,
            "average_path_length": average,
        })
    }

    pub fn find_paths_through_node(&self, node_id: &str, options: &PathOptions) -> Value {
        let net = &self.model;
        let graph = NodeGraph::build(net);
        let Some(through) = self.node_id_of(node_id) else {
            return json!({ "paths": [], "path_count": 0 });
        };
        let through_idx = graph.index_of(through);
        let all_nodes: Vec<_> = (0..net.place_count())
            .map(NodeRef::Place)
            .chain((0..net.transition_count()).map(NodeRef::Transition))
            .collect();

        let mut paths: Vec<Vec<String>> = Vec::new();
        for &source in &all_nodes {
            if source == through {
                continue;
            }
            for &target in &all_nodes {
                if target == through || target == source {
                    continue;
                }
                if paths.len() >= options.max_paths {
                    break;
                }
                if let Some((path, _)) = graph.shortest_path(graph.index_of(source), graph.index_of(target), options.weighted_by_arc_weight) {
                    if path.contains(&through_idx) {
                        paths.push(path.iter().map(|&idx| self.node_id(graph.node_at(idx))).collect());
                    }
                }
            }
        }
        let count = paths.len();
        json!({ "paths": paths, "path_count": count })
    }

    fn compute(&self, options: &PathOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 && net.transition_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no paths possible");
        }
        let graph = NodeGraph::build(net);
        let is_strongly_connected = graph.is_strongly_connected();

        let sccs = graph.sccs();
        let largest_scc = sccs.first().cloned().unwrap_or_default();
        let mut diameter = 0u64;
        let mut total_length = 0u64;
        let mut pair_count = 0u64;
        for &s in &largest_scc {
            for &t in &largest_scc {
                if s == t {
                    continue;
                }
                if let Some((_, cost)) = graph.shortest_path(s, t, options.weighted_by_arc_weight) {
                    diameter = diameter.max(cost);
                    total_length += cost;
                    pair_count += 1;
                }
            }
        }
        let average_path_length = if pair_count > 0 { total_length as f64 / pair_count as f64 } else { 0.0 };

        let mut data = HashMap::new();
        data.insert("diameter".into(), json!(diameter));
        data.insert("average_path_length".into(), json!(average_path_length));
        data.insert("is_strongly_connected".into(), json!(is_strongly_connected));
        data.insert("node_count".into(), json!(graph.node_count()));
        data.insert("edge_count".into(), json!(graph.edge_count()));

        AnalysisResult::success(data, format!("network has {} node(s), diameter {}", graph.node_count(), diameter))
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("diameter".into(), json!(0));
    data.insert("average_path_length".into(), json!(0.0));
    data.insert("is_strongly_connected".into(), json!(true));
    data.insert("node_count".into(), json!(0));
    data.insert("edge_count".into(), json!(0));
    data
}

impl Analyzer for PathAnalyzer {
    type Options = PathOptions;

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
