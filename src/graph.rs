//! The directed bipartite graph derived from a `PetriNet` (spec §9: "the
//! target requires a directed-graph abstraction supporting node/edge
//! insertion, successor/predecessor iteration, Dijkstra shortest-path, Johnson's
//! simple cycles, and SCC decomposition").
//!
//! Built on `petgraph`, the way `codegraph-ir`'s `cross_file::symbol_graph` and
//! `pdg::infrastructure::pdg` wrap `DiGraph` with a domain-specific node type
//! instead of exposing raw indices to callers.

use std::collections::HashMap;

use petgraph::algo::{astar, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::model::{NodeRef, PetriNet, PlaceIndex, TransitionIndex};

/// Bipartite place/transition graph: one node per place and per transition,
/// one edge per arc, edge weight = arc weight.
pub struct NodeGraph {
    graph: DiGraph<NodeRef, u32>,
    place_nodes: Vec<NodeIndex>,
    transition_nodes: Vec<NodeIndex>,
    node_index: HashMap<NodeRef, NodeIndex>,
}

impl NodeGraph {
    pub fn build(net: &PetriNet) -> Self {
        let mut graph = DiGraph::new();
        let mut place_nodes = Vec::with_capacity(net.place_count());
        let mut transition_nodes = Vec::with_capacity(net.transition_count());
        let mut node_index = HashMap::new();

        for i in 0..net.place_count() {
            let idx = graph.add_node(NodeRef::Place(PlaceIndex(i)));
            place_nodes.push(idx);
            node_index.insert(NodeRef::Place(PlaceIndex(i)), idx);
        }
        for i in 0..net.transition_count() {
            let idx = graph.add_node(NodeRef::Transition(TransitionIndex(i)));
            transition_nodes.push(idx);
            node_index.insert(NodeRef::Transition(TransitionIndex(i)), idx);
        }
        for t in 0..net.transition_count() {
            let t_idx = TransitionIndex(t);
            for &p in net.transition_preset(t_idx) {
                let w = net.weight_place_to_transition(p, t_idx);
                graph.add_edge(place_nodes[p.0], transition_nodes[t], w);
            }
            for &p in net.transition_postset(t_idx) {
                let w = net.weight_transition_to_place(t_idx, p);
                graph.add_edge(transition_nodes[t], place_nodes[p.0], w);
            }
        }

        Self {
            graph,
            place_nodes,
            transition_nodes,
            node_index,
        }
    }

    pub fn inner(&self) -> &DiGraph<NodeRef, u32> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, node: NodeRef) -> NodeIndex {
        self.node_index[&node]
    }

    pub fn node_at(&self, idx: NodeIndex) -> NodeRef {
        self.graph[idx]
    }

    pub fn place_index(&self, p: PlaceIndex) -> NodeIndex {
        self.place_nodes[p.0]
    }

    pub fn transition_index(&self, t: TransitionIndex) -> NodeIndex {
        self.transition_nodes[t.0]
    }

    /// Strongly connected components, largest first — used for per-component
    /// cycle enumeration and for the diameter fallback on disconnected nets.
    pub fn sccs(&self) -> Vec<Vec<NodeIndex>> {
        let mut sccs = tarjan_scc(&self.graph);
        sccs.sort_by_key(|c| std::cmp::Reverse(c.len()));
        sccs
    }

    pub fn is_strongly_connected(&self) -> bool {
        if self.graph.node_count() == 0 {
            return true;
        }
        self.sccs().len() == 1 && self.sccs()[0].len() == self.graph.node_count()
    }

    /// Whether `idx` lies on some directed cycle: its SCC has more than one
    /// node, or it has a self-loop. Used by the liveness analyzer to tell
    /// "fed by a cycle" from "fed by a place with an input transition that
    /// itself never fires again" (spec §4.11's L3 criterion).
    pub fn node_lies_on_cycle(&self, idx: NodeIndex) -> bool {
        self.sccs().iter().any(|scc| scc.contains(&idx) && (scc.len() > 1 || self.has_self_loop(idx)))
    }

    /// Dijkstra shortest path from `source` to `target`. Edge cost is 1 per
    /// hop unless `weighted` is set, in which case it's the arc weight.
    pub fn shortest_path(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        weighted: bool,
    ) -> Option<(Vec<NodeIndex>, u64)> {
        let (cost, path) = astar(
            &self.graph,
            source,
            |n| n == target,
            |edge| if weighted { *edge.weight() as u64 } else { 1 },
            |_| 0,
        )?;
        Some((path, cost))
    }

    /// All simple paths `source -> target` up to `max_length` hops, in no
    /// particular order, capped at `max_paths`.
    pub fn all_paths(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        max_length: usize,
        max_paths: usize,
    ) -> (Vec<Vec<NodeIndex>>, bool) {
        let mut results = Vec::new();
        let mut truncated = false;
        let mut stack = vec![source];
        let mut on_stack = vec![false; self.graph.node_count()];
        on_stack[source.index()] = true;
        self.dfs_paths(source, target, max_length, max_paths, &mut stack, &mut on_stack, &mut results, &mut truncated);
        (results, truncated)
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs_paths(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        max_length: usize,
        max_paths: usize,
        stack: &mut Vec<NodeIndex>,
        on_stack: &mut Vec<bool>,
        results: &mut Vec<Vec<NodeIndex>>,
        truncated: &mut bool,
    ) {
        if results.len() >= max_paths {
            *truncated = true;
            return;
        }
        if current == target && stack.len() > 1 {
            results.push(stack.clone());
            return;
        }
        if stack.len() - 1 >= max_length {
            return;
        }
        for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
            if on_stack[next.index()] {
                continue;
            }
            on_stack[next.index()] = true;
            stack.push(next);
            self.dfs_paths(next, target, max_length, max_paths, stack, on_stack, results, truncated);
            stack.pop();
            on_stack[next.index()] = false;
            if results.len() >= max_paths {
                *truncated = true;
                break;
            }
        }
    }

    /// Johnson's elementary-cycle enumeration (Donald B. Johnson, 1975),
    /// restricted to the nodes of each SCC in turn. `budget` bounds the total
    /// number of DFS steps taken across the whole enumeration so a dense
    /// graph can't run unbounded work even before `max_cycles` is hit (spec
    /// §5: bounds must be honored by polling a counter, not only at the end).
    pub fn johnson_cycles(
        &self,
        max_cycles: usize,
        min_length: usize,
        budget: usize,
    ) -> (Vec<Vec<NodeIndex>>, bool) {
        let mut cycles = Vec::new();
        let mut truncated = false;
        let mut steps = 0usize;

        for scc in self.sccs() {
            if scc.len() < 2 && !self.has_self_loop(scc[0]) {
                continue;
            }
            let scc_set: std::collections::HashSet<NodeIndex> = scc.iter().copied().collect();
            let mut sorted_scc = scc.clone();
            sorted_scc.sort_by_key(|n| n.index());

            for &start in &sorted_scc {
                if cycles.len() >= max_cycles || steps >= budget {
                    truncated = true;
                    break;
                }
                let mut blocked: std::collections::HashSet<NodeIndex> = std::collections::HashSet::new();
                let mut b_map: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
                let mut path = vec![start];
                self.johnson_circuit(
                    start,
                    start,
                    &scc_set,
                    &mut blocked,
                    &mut b_map,
                    &mut path,
                    min_length,
                    max_cycles,
                    budget,
                    &mut steps,
                    &mut cycles,
                    &mut truncated,
                );
            }
            if cycles.len() >= max_cycles || steps >= budget {
                break;
            }
        }
        cycles.truncate(max_cycles);
        (cycles, truncated)
    }

    fn has_self_loop(&self, n: NodeIndex) -> bool {
        self.graph.neighbors_directed(n, Direction::Outgoing).any(|m| m == n)
    }

    #[allow(clippy::too_many_arguments)]
    fn johnson_circuit(
        &self,
        start: NodeIndex,
        current: NodeIndex,
        scc: &std::collections::HashSet<NodeIndex>,
        blocked: &mut std::collections::HashSet<NodeIndex>,
        b_map: &mut HashMap<NodeIndex, Vec<NodeIndex>>,
        path: &mut Vec<NodeIndex>,
        min_length: usize,
        max_cycles: usize,
        budget: usize,
        steps: &mut usize,
        cycles: &mut Vec<Vec<NodeIndex>>,
        truncated: &mut bool,
    ) -> bool {
        if cycles.len() >= max_cycles || *steps >= budget {
            *truncated = true;
            return false;
        }
        *steps += 1;
        let mut found = false;
        blocked.insert(current);

        for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
            if !scc.contains(&next) {
                continue;
            }
            // Restrict to the "least vertex" subgraph (next >= start) so each
            // elementary cycle is only ever enumerated from its smallest-index
            // member, avoiding duplicate reports from other start vertices.
            if next.index() < start.index() {
                continue;
            }
            if next == start {
                if path.len() >= min_length {
                    cycles.push(path.clone());
                    found = true;
                    if cycles.len() >= max_cycles {
                        *truncated = true;
                        return true;
                    }
                }
            } else if !blocked.contains(&next) {
                path.push(next);
                if self.johnson_circuit(start, next, scc, blocked, b_map, path, min_length, max_cycles, budget, steps, cycles, truncated) {
                    found = true;
                }
                path.pop();
                if *truncated {
                    return found;
                }
            }
        }

        if found {
            self.unblock(current, blocked, b_map);
        } else {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if scc.contains(&next) {
                    b_map.entry(next).or_default().push(current);
                }
            }
        }
        found
    }

    fn unblock(
        &self,
        node: NodeIndex,
        blocked: &mut std::collections::HashSet<NodeIndex>,
        b_map: &mut HashMap<NodeIndex, Vec<NodeIndex>>,
    ) {
        blocked.remove(&node);
        if let Some(dependents) = b_map.remove(&node) {
            for d in dependents {
                if blocked.contains(&d) {
                    self.unblock(d, blocked, b_map);
                }
            }
        }
    }
}
