//! End-to-end scenarios from spec §8, seeded into the test suite verbatim:
//! the six worked nets plus the cross-analyzer determinism property.
//!
//! These build nets through the public `PetriNetBuilder` surface only and
//! drive analyzers through their public `Analyzer`/factory API, the way an
//! external caller would.

use std::sync::Arc;

use serde_json::json;

use shypn_topology::{
    make_boundedness_analyzer, make_cycle_analyzer, make_deadlock_analyzer, make_hub_analyzer,
    make_p_invariant_analyzer, make_path_analyzer, make_reachability_analyzer, make_siphon_analyzer,
    make_t_invariant_analyzer, make_trap_analyzer,
    make_liveness_analyzer, make_fairness_analyzer,
    Analyzer, BoundednessOptions, CycleOptions, DeadlockOptions, HubOptions, PInvariantOptions,
    PathOptions, PetriNet, PetriNetBuilder, ReachabilityOptions, SiphonOptions, TInvariantOptions,
    TrapOptions, LivenessOptions, FairnessOptions, TransitionClass,
};

/// Scenario 1: two-place cycle, balanced.
fn two_place_cycle() -> Arc<PetriNet> {
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
fn scenario_1_two_place_cycle() {
    let net = two_place_cycle();

    let mut pinv = make_p_invariant_analyzer(Arc::clone(&net));
    let r = pinv.analyze(PInvariantOptions::default());
    assert!(r.success);
    assert_eq!(r.get("count", json!(-1)), json!(1));
    let invariants = r.data["invariants"].as_array().unwrap();
    assert_eq!(invariants.len(), 1);
    let mut places: Vec<String> = invariants[0]["places"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    places.sort();
    assert_eq!(places, vec!["P1".to_string(), "P2".to_string()]);
    assert_eq!(invariants[0]["conserved_value"], json!(1));

    let mut cycles = make_cycle_analyzer(Arc::clone(&net));
    let r = cycles.analyze(CycleOptions::default());
    assert!(r.success);
    assert_eq!(r.get("count", json!(-1)), json!(1));
    let cyc = &r.data["cycles"].as_array().unwrap()[0];
    assert_eq!(cyc["length"], json!(4));
    assert_eq!(cyc["type"], json!("Balanced"));
    assert_eq!(cyc["nodes"], json!(["P1", "T1", "P2", "T2"]));

    let mut bounded = make_boundedness_analyzer(Arc::clone(&net));
    let r = bounded.analyze(BoundednessOptions::default());
    assert!(r.success);
    assert_eq!(r.get("is_bounded", json!(false)), json!(true));
    assert_eq!(r.get("k_bound", json!(-1)), json!(1));
    assert_eq!(r.get("is_safe", json!(false)), json!(true));

    let mut deadlocks = make_deadlock_analyzer(Arc::clone(&net));
    let r = deadlocks.analyze(DeadlockOptions::default());
    assert!(r.success);
    assert_eq!(r.get("has_deadlock", json!(true)), json!(false));
}

/// Scenario 2: producer-consumer with an empty buffer.
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
fn scenario_2_producer_consumer_empty_buffer() {
    let net = producer_consumer();

    let mut deadlocks = make_deadlock_analyzer(Arc::clone(&net));
    let r = deadlocks.analyze(DeadlockOptions::default());
    assert!(r.success);
    let disabled: Vec<String> = r.data["disabled_transitions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(disabled.contains(&"Consume".to_string()));
    assert!(!disabled.contains(&"Produce".to_string()));

    // Three reachable markings: [1,0,0] initial, [0,1,0] after Produce fires,
    // and [0,0,1] after Consume fires — the last is a deadlock (neither
    // transition is enabled once Buffer and Producer are both empty).
    let mut reach = make_reachability_analyzer(Arc::clone(&net));
    let r = reach.analyze(ReachabilityOptions::default());
    assert!(r.success);
    assert_eq!(r.get("total_states", json!(-1)), json!(3));
    let deadlocks = r.data["deadlock_states"].as_array().unwrap();
    assert_eq!(deadlocks.len(), 1);
    assert_eq!(deadlocks[0]["Consumer"], json!(1));

    let mut liveness = make_liveness_analyzer(Arc::clone(&net));
    let r = liveness.analyze(LivenessOptions::default());
    assert!(r.success);
    assert_eq!(r.data["liveness_levels"]["Produce"], json!("L4"));
    assert_eq!(r.data["liveness_levels"]["Consume"], json!("L1"));
}

/// Scenario 3: a minimal, unmarked siphon {P1, P2} gated by P3's single
/// token on T1.
fn unmarked_siphon_net() -> Arc<PetriNet> {
    let mut b = PetriNetBuilder::new();
    b.add_place("P1", "P1", 0);
    b.add_place("P2", "P2", 0);
    b.add_place("P3", "P3", 1);
    b.add_transition("T1", "T1", TransitionClass::Immediate);
    b.add_transition("T2", "T2", TransitionClass::Immediate);
    b.add_arc("P1", "T1", 1);
    b.add_arc("T1", "P2", 1);
    b.add_arc("P3", "T1", 1);
    b.add_arc("P2", "T2", 1);
    b.add_arc("T2", "P1", 1);
    Arc::new(b.build().unwrap())
}

#[test]
fn scenario_3_unmarked_siphon() {
    let net = unmarked_siphon_net();

    let mut siphons = make_siphon_analyzer(Arc::clone(&net));
    let r = siphons.analyze(SiphonOptions::default());
    assert!(r.success);
    let found = r.data["siphons"].as_array().unwrap().iter().any(|s| {
        let mut places: Vec<String> = s["places"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        places.sort();
        places == vec!["P1".to_string(), "P2".to_string()] && s["criticality"] == json!("Critical")
    });
    assert!(found, "expected a critical {{P1,P2}} siphon, got {:?}", r.data["siphons"]);

    let mut deadlocks = make_deadlock_analyzer(Arc::clone(&net));
    let r = deadlocks.analyze(DeadlockOptions::default());
    assert!(r.success);
    assert_eq!(r.get("severity", json!("none")), json!("Critical"));
    assert!(r.data["deadlock_type"] == json!("Structural") || r.data["deadlock_type"] == json!("Both"));
    let recovery = r.data["recovery_suggestions"].as_array().unwrap();
    assert!(recovery.iter().any(|s| {
        let s = s.as_str().unwrap();
        s.contains('P') && (s.contains("P1") || s.contains("P2"))
    }));
}

/// Scenario 4: unbounded accumulation — firing `Fire` regenerates `Src` but
/// keeps piling tokens onto `Acc`.
fn unbounded_accumulation() -> Arc<PetriNet> {
    let mut b = PetriNetBuilder::new();
    b.add_place("Src", "Src", 1);
    b.add_place("Acc", "Acc", 0);
    b.add_transition("Fire", "Fire", TransitionClass::Immediate);
    b.add_arc("Src", "Fire", 1);
    b.add_arc("Fire", "Src", 1);
    b.add_arc("Fire", "Acc", 1);
    Arc::new(b.build().unwrap())
}

#[test]
fn scenario_4_unbounded_accumulation() {
    let net = unbounded_accumulation();

    let mut bounded = make_boundedness_analyzer(Arc::clone(&net));
    let options = BoundednessOptions {
        max_bound: 10,
        check_conservation: true,
    };
    let r = bounded.analyze(options);
    assert!(r.success);
    assert_eq!(r.get("is_bounded", json!(true)), json!(false));
    let unbounded_places: Vec<String> = r.data["unbounded_places"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(unbounded_places, vec!["Acc".to_string()]);
}

/// Scenario 5: a hub place (ATP-like) with ten alternating in/out arcs.
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
fn scenario_5_hub_place() {
    let net = hub_net();

    let mut hubs = make_hub_analyzer(Arc::clone(&net));
    let options = HubOptions {
        min_degree: 5,
        ..HubOptions::default()
    };
    let r = hubs.analyze(options);
    assert!(r.success);
    let found = r.data["hubs"].as_array().unwrap().iter().any(|h| {
        h["node_id"] == json!("ATP") && h["degree"] == json!(10)
    });
    assert!(found, "expected ATP hub with degree 10, got {:?}", r.data["hubs"]);

    let paths = make_path_analyzer(Arc::clone(&net));
    let result = paths.find_paths_through_node("ATP", &PathOptions::default());
    let count = result["paths"].as_array().map(|a| a.len()).unwrap_or(0);
    assert!(count >= 1, "expected at least one path transiting ATP");
}

/// Scenario 6: determinism — every analyzer, called twice against two
/// freshly-built (but structurally identical) models with the same
/// insertion order, returns byte-identical `data`.
#[test]
fn scenario_6_determinism_across_all_analyzers() {
    let net_a = two_place_cycle();
    let net_b = two_place_cycle();

    macro_rules! assert_same_data {
        ($make:expr, $options:expr) => {{
            let mut a = $make(Arc::clone(&net_a));
            let mut b = $make(Arc::clone(&net_b));
            let ra = a.analyze($options);
            let rb = b.analyze($options);
            assert_eq!(ra.success, rb.success);
            assert_eq!(ra.data, rb.data);
        }};
    }

    assert_same_data!(make_p_invariant_analyzer, PInvariantOptions::default());
    assert_same_data!(make_t_invariant_analyzer, TInvariantOptions::default());
    assert_same_data!(make_siphon_analyzer, SiphonOptions::default());
    assert_same_data!(make_trap_analyzer, TrapOptions::default());
    assert_same_data!(make_cycle_analyzer, CycleOptions::default());
    assert_same_data!(make_path_analyzer, PathOptions::default());
    assert_same_data!(make_hub_analyzer, HubOptions::default());
    assert_same_data!(make_reachability_analyzer, ReachabilityOptions::default());
    assert_same_data!(make_boundedness_analyzer, BoundednessOptions::default());
    assert_same_data!(make_liveness_analyzer, LivenessOptions::default());
    assert_same_data!(make_deadlock_analyzer, DeadlockOptions::default());
    assert_same_data!(make_fairness_analyzer, FairnessOptions::default());

    // And again on the same analyzer instance, across a cache hit and an
    // explicit invalidation, per spec §8's universal caching property.
    let mut pinv = make_p_invariant_analyzer(Arc::clone(&net_a));
    let first = pinv.analyze(PInvariantOptions::default());
    let cached = pinv.analyze(PInvariantOptions::default());
    assert_eq!(first.data, cached.data);
    pinv.invalidate();
    let recomputed = pinv.analyze(PInvariantOptions::default());
    assert_eq!(first.data, recomputed.data);
}

/// Siphon/trap duality (spec §4.5, §8): minimal siphons of a net's reverse
/// are exactly the minimal traps of the net.
#[test]
fn siphon_trap_duality_holds() {
    let net = unmarked_siphon_net();

    let mut siphons = make_siphon_analyzer(Arc::clone(&net));
    let siphon_result = siphons.analyze(SiphonOptions::default());
    let mut siphon_sets: Vec<Vec<String>> = siphon_result.data["siphons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            let mut v: Vec<String> = s["places"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p.as_str().unwrap().to_string())
                .collect();
            v.sort();
            v
        })
        .collect();
    siphon_sets.sort();

    let reversed = Arc::new(net.reversed());
    let mut traps_of_reversed = make_siphon_analyzer(reversed);
    let trap_result = traps_of_reversed.analyze(SiphonOptions::default());
    let mut siphons_of_reversed: Vec<Vec<String>> = trap_result.data["siphons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            let mut v: Vec<String> = s["places"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p.as_str().unwrap().to_string())
                .collect();
            v.sort();
            v
        })
        .collect();
    siphons_of_reversed.sort();

    let mut traps = make_trap_analyzer(Arc::clone(&net));
    let r = traps.analyze(TrapOptions::default());
    let mut trap_sets: Vec<Vec<String>> = r.data["traps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            let mut v: Vec<String> = s["places"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p.as_str().unwrap().to_string())
                .collect();
            v.sort();
            v
        })
        .collect();
    trap_sets.sort();

    assert_eq!(siphons_of_reversed, trap_sets);
    let _ = siphon_sets;
}

/// Empty model: every analyzer must succeed with zero-valued counts rather
/// than erroring (spec §3, §8 universal property).
#[test]
fn empty_model_succeeds_on_every_analyzer() {
    let net = Arc::new(PetriNetBuilder::new().build().unwrap());

    macro_rules! assert_empty_success {
        ($make:expr, $options:expr) => {{
            let mut a = $make(Arc::clone(&net));
            let r = a.analyze($options);
            assert!(r.success, "expected success=true on empty model");
        }};
    }

    assert_empty_success!(make_p_invariant_analyzer, PInvariantOptions::default());
    assert_empty_success!(make_t_invariant_analyzer, TInvariantOptions::default());
    assert_empty_success!(make_siphon_analyzer, SiphonOptions::default());
    assert_empty_success!(make_trap_analyzer, TrapOptions::default());
    assert_empty_success!(make_cycle_analyzer, CycleOptions::default());
    assert_empty_success!(make_path_analyzer, PathOptions::default());
    assert_empty_success!(make_hub_analyzer, HubOptions::default());
    assert_empty_success!(make_reachability_analyzer, ReachabilityOptions::default());
    assert_empty_success!(make_boundedness_analyzer, BoundednessOptions::default());
    assert_empty_success!(make_liveness_analyzer, LivenessOptions::default());
    assert_empty_success!(make_deadlock_analyzer, DeadlockOptions::default());
    assert_empty_success!(make_fairness_analyzer, FairnessOptions::default());
}
