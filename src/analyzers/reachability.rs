//! Reachability analyzer (spec §4.9): bounded BFS over the marking graph
//! from the model's current marking.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, TransitionIndex};

const DEFAULT_MAX_STATES: usize = 10_000;
const DEFAULT_MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityOptions {
    pub max_states: usize,
    pub max_depth: usize,
    pub compute_graph: bool,
    pub find_deadlocks: bool,
}

impl Default for ReachabilityOptions {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_STATES,
            max_depth: DEFAULT_MAX_DEPTH,
            compute_graph: false,
            find_deadlocks: true,
        }
    }
}

impl AnalyzerOptions for ReachabilityOptions {
    fn validate(&self) -> Result<()> {
        if self.max_states == 0 {
            return Err(TopologyError::InvalidOption("invalid bounds: max_states must be positive".into()));
        }
        if self.max_depth == 0 {
            return Err(TopologyError::InvalidOption("invalid bounds: max_depth must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityEdge {
    pub from_marking_id: usize,
    pub transition_id: String,
    pub to_marking_id: usize,
}

/// Result of a bounded marking-graph BFS, kept in a structured form so the
/// boundedness and liveness analyzers can consult it without re-parsing JSON.
#[derive(Debug, Clone)]
pub struct ReachabilitySummary {
    pub visited: Vec<Vec<u64>>,
    pub deadlock_states: Vec<Vec<u64>>,
    pub token_range_per_place: Vec<(u64, u64)>,
    pub max_depth_reached: usize,
    pub truncated_by_states: bool,
    pub truncated_by_depth: bool,
    pub grew_unboundedly: bool,
    pub reachable_transitions: std::collections::HashSet<TransitionIndex>,
}

pub struct ReachabilityAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl ReachabilityAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    /// Runs the same BFS `analyze()` does, without the `AnalysisResult`
    /// envelope. Used by analyzers that depend on reachability data directly
    /// (boundedness, liveness) so they don't have to deserialize JSON back
    /// out of a cached result.
    pub fn summarize(&self, options: &ReachabilityOptions) -> Result<ReachabilitySummary> {
        options.validate()?;
        Ok(run_bfs(&self.model, options).0)
    }

    fn compute(&self, options: &ReachabilityOptions) -> AnalysisResult {
        let net = &self.model;
        let (summary, edges) = run_bfs(net, options);

        let token_range_per_place: Vec<Value> = summary
            .token_range_per_place
            .iter()
            .map(|&(lo, hi)| json!({ "min": lo, "max": hi }))
            .collect();

        let mut data = HashMap::new();
        data.insert("total_states".into(), json!(summary.visited.len()));
        data.insert("max_depth_reached".into(), json!(summary.max_depth_reached));
        data.insert(
            "deadlock_states".into(),
            json!(summary
                .deadlock_states
                .iter()
                .map(|m| marking_to_map(net, m))
                .collect::<Vec<_>>()),
        );
        data.insert("token_range_per_place".into(), json!(token_range_per_place));
        data.insert("truncated_by_states".into(), json!(summary.truncated_by_states));
        data.insert("truncated_by_depth".into(), json!(summary.truncated_by_depth));
        if options.compute_graph {
            data.insert("reachability_graph".into(), json!(edges));
        }

        let summary_text = format!(
            "explored {} state(s), found {} deadlock state(s)",
            summary.visited.len(),
            summary.deadlock_states.len()
        );
        let mut result = AnalysisResult::success(data, summary_text);
        if summary.truncated_by_states {
            result = result.with_warning(format!("truncated at {} states", options.max_states));
        }
        if summary.truncated_by_depth {
            result = result.with_warning(format!("truncated at depth {}", options.max_depth));
        }
        if summary.grew_unboundedly {
            result = result.with_warning("marking grew unboundedly — results may undercount");
        }
        result
    }
}

fn marking_to_map(net: &PetriNet, marking: &[u64]) -> Value {
    let mut map = serde_json::Map::new();
    for (i, &tokens) in marking.iter().enumerate() {
        map.insert(net.place(crate::model::PlaceIndex(i)).id.clone(), json!(tokens));
    }
    Value::Object(map)
}

fn run_bfs(net: &PetriNet, options: &ReachabilityOptions) -> (ReachabilitySummary, Vec<ReachabilityEdge>) {
    let initial = net.current_marking();
    let mut visited: Vec<Vec<u64>> = vec![initial.clone()];
    let mut index_of: HashMap<Vec<u64>, usize> = HashMap::new();
    index_of.insert(initial.clone(), 0);
    let mut queue: VecDeque<(usize, Vec<u64>, usize)> = VecDeque::new(); // (id, marking, depth)
    queue.push_back((0, initial, 0));

    let mut deadlock_states = Vec::new();
    let mut truncated_by_states = false;
    let mut truncated_by_depth = false;
    let mut grew_unboundedly = false;
    let mut reachable_transitions = std::collections::HashSet::new();
    let mut edges = Vec::new();
    let mut max_depth_reached = 0usize;

    let mut token_min = vec![u64::MAX; net.place_count()];
    let mut token_max = vec![0u64; net.place_count()];
    update_token_range(&mut token_min, &mut token_max, &visited[0]);

    while let Some((id, marking, depth)) = queue.pop_front() {
        max_depth_reached = max_depth_reached.max(depth);
        if depth >= options.max_depth {
            truncated_by_depth = true;
            continue;
        }
        let mut any_enabled = false;
        for t_idx in 0..net.transition_count() {
            let t = TransitionIndex(t_idx);
            if !net.is_enabled(t, &marking) {
                continue;
            }
            any_enabled = true;
            reachable_transitions.insert(t);
            let successor = net.fire(t, &marking);
            if dominates_strictly(&successor, &marking) {
                grew_unboundedly = true;
            }
            let successor_id = match index_of.get(&successor) {
                Some(&existing) => existing,
                None => {
                    if visited.len() >= options.max_states {
                        truncated_by_states = true;
                        continue;
                    }
                    let new_id = visited.len();
                    update_token_range(&mut token_min, &mut token_max, &successor);
                    visited.push(successor.clone());
                    index_of.insert(successor.clone(), new_id);
                    queue.push_back((new_id, successor, depth + 1));
                    new_id
                }
            };
            if options.compute_graph {
                edges.push(ReachabilityEdge {
                    from_marking_id: id,
                    transition_id: net.transition(t).id.clone(),
                    to_marking_id: successor_id,
                });
            }
        }
        if !any_enabled && options.find_deadlocks {
            deadlock_states.push(marking);
        }
    }

    let token_range_per_place: Vec<(u64, u64)> = (0..net.place_count())
        .map(|i| if token_min[i] == u64::MAX { (0, 0) } else { (token_min[i], token_max[i]) })
        .collect();

    (
        ReachabilitySummary {
            visited,
            deadlock_states,
            token_range_per_place,
            max_depth_reached,
            truncated_by_states,
            truncated_by_depth,
            grew_unboundedly,
            reachable_transitions,
        },
        edges,
    )
}

fn update_token_range(min: &mut [u64], max: &mut [u64], marking: &[u64]) {
    for (i, &tokens) in marking.iter().enumerate() {
        min[i] = min[i].min(tokens);
        max[i] = max[i].max(tokens);
    }
}

fn dominates_strictly(successor: &[u64], ancestor: &[u64]) -> bool {
    successor.iter().zip(ancestor).all(|(&s, &a)| s >= a) && successor.iter().zip(ancestor).any(|(&s, &a)| s > a)
}

impl Analyzer for ReachabilityAnalyzer {
    type Options = ReachabilityOptions;

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

    fn producer_consumer() -> Arc<PetriNet> {
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
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn explores_three_states() {
        // Producer(1)->Produce->Buffer(0)->Consume->Consumer(0) has exactly
        // three reachable markings: [1,0,0] (initial), [0,1,0] (after
        // Produce fires), and [0,0,1] (after Consume fires) — the last of
        // which is a deadlock, since neither transition is enabled there.
        let net = producer_consumer();
        let mut analyzer = ReachabilityAnalyzer::new(net);
        let result = analyzer.analyze(ReachabilityOptions::default());
        assert!(result.success);
        assert_eq!(result.get("total_states", json!(0)), json!(3));
        let deadlocks = result.data["deadlock_states"].as_array().unwrap();
        assert_eq!(deadlocks.len(), 1);
        assert_eq!(deadlocks[0]["Producer"], json!(0));
        assert_eq!(deadlocks[0]["Buffer"], json!(0));
        assert_eq!(deadlocks[0]["Consumer"], json!(1));
    }

    #[test]
    fn invalid_bounds_fail() {
        let net = producer_consumer();
        let mut analyzer = ReachabilityAnalyzer::new(net);
        let result = analyzer.analyze(ReachabilityOptions {
            max_states: 0,
            ..ReachabilityOptions::default()
        });
        assert!(!result.success);
    }

    #[test]
    fn detects_unbounded_growth() {
        let mut b = PetriNetBuilder::new();
        b.add_place("Src", "Src", 1);
        b.add_place("Acc", "Acc", 0);
        b.add_transition("Fire", "Fire", TransitionClass::Immediate);
        b.add_arc("Src", "Fire", 1);
        b.add_arc("Fire", "Src", 1);
        b.add_arc("Fire", "Acc", 1);
        let net = Arc::new(b.build().unwrap());
        let mut analyzer = ReachabilityAnalyzer::new(net);
        let result = analyzer.analyze(ReachabilityOptions {
            max_states: 50,
            max_depth: 50,
            ..ReachabilityOptions::default()
        });
        assert!(result.success);
        assert!(result.has_warnings());
    }
}
