//! The Petri net data model (spec §3).
//!
//! `PetriNet` is an immutable snapshot: places, transitions, and weighted arcs
//! between them, with deterministic iteration order and O(1) identifier→index
//! lookup. It is built once (`PetriNetBuilder`) and then shared by reference
//! among every analyzer that queries it — analyzers never mutate it.

mod builder;
mod incidence;

pub use builder::PetriNetBuilder;
pub use incidence::IncidenceMatrix;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use rustc_hash::FxHasher;

/// Index of a place within `PetriNet::places`. Stable for the lifetime of a
/// snapshot; never reused across builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaceIndex(pub usize);

/// Index of a transition within `PetriNet::transitions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionIndex(pub usize);

/// Opaque-to-most-analyzers classification tag carried on a transition.
/// Only the fairness analyzer consults `priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionClass {
    #[default]
    Immediate,
    Timed,
    Stochastic,
    Continuous,
}

#[derive(Debug, Clone)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub tokens: u64,
    pub capacity: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub class: TransitionClass,
    /// Optional priority hint, consulted only by the fairness analyzer
    /// (spec §9 open question: priorities have no home in the distilled
    /// model, so we carry them as an optional tag rather than inventing a
    /// required field).
    pub priority: Option<i32>,
}

/// A reference to either a place or a transition, used by analyzers that walk
/// the bipartite place/transition graph (cycles, paths, hubs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Place(PlaceIndex),
    Transition(TransitionIndex),
}

impl NodeRef {
    pub fn is_place(&self) -> bool {
        matches!(self, NodeRef::Place(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, NodeRef::Transition(_))
    }
}

/// Snapshot of a Petri net: ordered places/transitions/arcs plus the derived
/// adjacency used by every analyzer. Read-only once built (§3 Ownership).
#[derive(Debug, Clone)]
pub struct PetriNet {
    places: Vec<Place>,
    transitions: Vec<Transition>,

    place_index: HashMap<String, PlaceIndex>,
    transition_index: HashMap<String, TransitionIndex>,

    /// •p for each place: transitions with an arc into p.
    place_inputs: Vec<Vec<TransitionIndex>>,
    /// p• for each place: transitions with an arc out of p.
    place_outputs: Vec<Vec<TransitionIndex>>,
    /// •t for each transition: places with an arc into t.
    transition_inputs: Vec<Vec<PlaceIndex>>,
    /// t• for each transition: places with an arc out of t.
    transition_outputs: Vec<Vec<PlaceIndex>>,

    /// weight(p -> t)
    weight_pt: HashMap<(PlaceIndex, TransitionIndex), u32>,
    /// weight(t -> p)
    weight_tp: HashMap<(TransitionIndex, PlaceIndex), u32>,

    incidence: OnceLock<IncidenceMatrix>,
    structural_hash: u64,
}

impl PetriNet {
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn place_by_id(&self, id: &str) -> Option<PlaceIndex> {
        self.place_index.get(id).copied()
    }

    pub fn transition_by_id(&self, id: &str) -> Option<TransitionIndex> {
        self.transition_index.get(id).copied()
    }

    pub fn place(&self, idx: PlaceIndex) -> &Place {
        &self.places[idx.0]
    }

    pub fn transition(&self, idx: TransitionIndex) -> &Transition {
        &self.transitions[idx.0]
    }

    /// •p — transitions that feed place `p`.
    pub fn place_preset(&self, p: PlaceIndex) -> &[TransitionIndex] {
        &self.place_inputs[p.0]
    }

    /// p• — transitions that drain place `p`.
    pub fn place_postset(&self, p: PlaceIndex) -> &[TransitionIndex] {
        &self.place_outputs[p.0]
    }

    /// •t — places that feed transition `t`.
    pub fn transition_preset(&self, t: TransitionIndex) -> &[PlaceIndex] {
        &self.transition_inputs[t.0]
    }

    /// t• — places that transition `t` produces into.
    pub fn transition_postset(&self, t: TransitionIndex) -> &[PlaceIndex] {
        &self.transition_outputs[t.0]
    }

    pub fn weight_place_to_transition(&self, p: PlaceIndex, t: TransitionIndex) -> u32 {
        self.weight_pt.get(&(p, t)).copied().unwrap_or(0)
    }

    pub fn weight_transition_to_place(&self, t: TransitionIndex, p: PlaceIndex) -> u32 {
        self.weight_tp.get(&(t, p)).copied().unwrap_or(0)
    }

    /// The current marking, derived from each place's `tokens` attribute.
    pub fn current_marking(&self) -> Vec<u64> {
        self.places.iter().map(|p| p.tokens).collect()
    }

    /// A transition is enabled at `marking` iff every input place holds at
    /// least the arc weight it must supply.
    pub fn is_enabled(&self, t: TransitionIndex, marking: &[u64]) -> bool {
        self.transition_preset(t)
            .iter()
            .all(|&p| marking[p.0] >= self.weight_place_to_transition(p, t) as u64)
    }

    /// Fire `t` from `marking`, returning the successor marking. Caller must
    /// have already checked `is_enabled`.
    pub fn fire(&self, t: TransitionIndex, marking: &[u64]) -> Vec<u64> {
        let mut next = marking.to_vec();
        for &p in self.transition_preset(t) {
            next[p.0] -= self.weight_place_to_transition(p, t) as u64;
        }
        for &p in self.transition_postset(t) {
            next[p.0] += self.weight_transition_to_place(t, p) as u64;
        }
        next
    }

    /// The incidence matrix C[p,t] = weight(t→p) − weight(p→t), computed
    /// lazily on first request and cached for the lifetime of this snapshot.
    pub fn incidence_matrix(&self) -> &IncidenceMatrix {
        self.incidence.get_or_init(|| incidence::build(self))
    }

    /// Hash of places/transitions/arcs/weights, excluding marking. Used by the
    /// analyzer cache: two models with equal structural hash are treated as
    /// the same analysis subject regardless of current token counts (unless
    /// an analyzer documents otherwise, e.g. deadlock/reachability which key
    /// on the marking separately).
    pub fn structural_hash(&self) -> u64 {
        self.structural_hash
    }

    /// Build the net with every place→transition and transition→place arc
    /// reversed. Used by the siphon/trap duality property (spec §8): the
    /// minimal siphons of a net equal the minimal traps of its reverse.
    pub fn reversed(&self) -> PetriNet {
        let mut b = PetriNetBuilder::new();
        for p in &self.places {
            b.add_place(&p.id, &p.name, p.tokens);
            if let Some(cap) = p.capacity {
                b.set_capacity(&p.id, cap);
            }
        }
        for t in &self.transitions {
            b.add_transition(&t.id, &t.name, t.class);
        }
        for (&(p, t), &w) in &self.weight_pt {
            // p -> t becomes t -> p in the reversed net
            b.add_arc(&self.transition(t).id, &self.place(p).id, w);
        }
        for (&(t, p), &w) in &self.weight_tp {
            // t -> p becomes p -> t in the reversed net
            b.add_arc(&self.place(p).id, &self.transition(t).id, w);
        }
        b.build().expect("reversing a valid net always yields a valid net")
    }
}

pub(crate) fn hash_structural(
    places: &[Place],
    transitions: &[Transition],
    weight_pt: &HashMap<(PlaceIndex, TransitionIndex), u32>,
    weight_tp: &HashMap<(TransitionIndex, PlaceIndex), u32>,
) -> u64 {
    let mut hasher = FxHasher::default();
    for p in places {
        p.id.hash(&mut hasher);
        p.capacity.hash(&mut hasher);
    }
    for t in transitions {
        t.id.hash(&mut hasher);
    }
    let mut pt: Vec<_> = weight_pt.iter().collect();
    pt.sort_by_key(|(&(p, t), _)| (p, t));
    for (&(p, t), &w) in pt {
        (p.0, t.0, w).hash(&mut hasher);
    }
    let mut tp: Vec<_> = weight_tp.iter().collect();
    tp.sort_by_key(|(&(t, p), _)| (t, p));
    for (&(t, p), &w) in tp {
        (t.0, p.0, w).hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_place_cycle() -> PetriNet {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 1);
        b.add_place("P2", "P2", 0);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_transition("T2", "T2", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        b.add_arc("T1", "P2", 1);
        b.add_arc("P2", "T2", 1);
        b.add_arc("T2", "P1", 1);
        b.build().unwrap()
    }

    #[test]
    fn presets_and_postsets_are_consistent() {
        let net = two_place_cycle();
        let p1 = net.place_by_id("P1").unwrap();
        let t1 = net.transition_by_id("T1").unwrap();
        assert_eq!(net.place_postset(p1), &[t1]);
        assert_eq!(net.transition_preset(t1), &[p1]);
    }

    #[test]
    fn structural_hash_ignores_marking() {
        let net_a = two_place_cycle();
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "P1", 99); // different marking
        b.add_place("P2", "P2", 0);
        b.add_transition("T1", "T1", TransitionClass::Immediate);
        b.add_transition("T2", "T2", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 1);
        b.add_arc("T1", "P2", 1);
        b.add_arc("P2", "T2", 1);
        b.add_arc("T2", "P1", 1);
        let net_b = b.build().unwrap();
        assert_eq!(net_a.structural_hash(), net_b.structural_hash());
    }

    #[test]
    fn reversed_swaps_presets_and_postsets() {
        let net = two_place_cycle();
        let rev = net.reversed();
        let p1 = net.place_by_id("P1").unwrap();
        let t1 = net.transition_by_id("T1").unwrap();
        // In the original, P1 -> T1; in the reverse, T1 -> P1.
        assert_eq!(rev.transition_postset(t1), &[p1]);
    }

    #[test]
    fn enabling_and_firing() {
        let net = two_place_cycle();
        let t1 = net.transition_by_id("T1").unwrap();
        let marking = net.current_marking();
        assert!(net.is_enabled(t1, &marking));
        let next = net.fire(t1, &marking);
        let p1 = net.place_by_id("P1").unwrap();
        let p2 = net.place_by_id("P2").unwrap();
        assert_eq!(next[p1.0], 0);
        assert_eq!(next[p2.0], 1);
    }
}
