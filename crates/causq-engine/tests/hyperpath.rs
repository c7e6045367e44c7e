use super::*;
use crate::history::{MethodHistory, SATURATION_CUTOFF};
use crate::state::EngineState;
use crate::test_graph::TestGraph;
use causq_model::{ContainingMethod, MethodId, TypeId, TypeflowId};

#[test]
fn unreached_method_has_no_explanation() {
    let adj = TestGraph::new(0, 2).build();
    let state = EngineState::simulate_purge_detailed(&adj, &[]);
    let hp = reachability_hyperpath(&adj, &state, MethodId(1));
    assert!(hp.edges.is_empty());
    assert!(!hp.saturation_lost);
}

#[test]
fn direct_call_chain() {
    let mut g = TestGraph::new(0, 3);
    let p = MethodId(1);
    let m = MethodId(2);
    g.call_edge(MethodId::ROOT, p);
    g.call_edge(p, m);
    let adj = g.build();

    let state = EngineState::simulate_purge_detailed(&adj, &[]);
    let hp = reachability_hyperpath(&adj, &state, m);
    assert!(!hp.saturation_lost);
    assert_eq!(
        hp.edges,
        vec![
            HyperpathEdge {
                from: MethodId::ROOT,
                to: p,
                via_type: None
            },
            HyperpathEdge {
                from: p,
                to: m,
                via_type: None
            },
        ]
    );
}

#[test]
fn white_hole_seeded_dispatch_blames_the_root() {
    // W -> V (reaching B): the witness type exists from the start, with no
    // containing methods along the way.
    let mut g = TestGraph::new(1, 3);
    let b = MethodId(2);
    let f = g.filter([0]);
    let v = g.flow(f, ContainingMethod::reaching(b));
    g.flow_edge(TypeflowId::WHITE_HOLE, v);
    let adj = g.build();

    let state = EngineState::simulate_purge_detailed(&adj, &[]);
    assert!(state.is_reached(b));
    let hp = reachability_hyperpath(&adj, &state, b);
    assert!(!hp.saturation_lost);
    assert_eq!(
        hp.edges,
        vec![HyperpathEdge {
            from: MethodId::ROOT,
            to: b,
            via_type: Some(TypeId(0))
        }]
    );
}

#[test]
fn dispatch_chain_labels_carriers_and_invoker() {
    // The witness type flows W -> F0 (inside C2) -> F1 (inside C1) -> F2
    // (reaching B). C1 holds the call site (plain edge); C2 carried the
    // type there (via-type edge).
    let mut g = TestGraph::new(1, 4);
    let c1 = MethodId(1);
    let c2 = MethodId(2);
    let b = MethodId(3);
    g.call_edge(MethodId::ROOT, c1);
    g.call_edge(MethodId::ROOT, c2);

    let f = g.filter([0]);
    let f0 = g.flow(f, ContainingMethod::dependent(c2));
    g.flow_edge(TypeflowId::WHITE_HOLE, f0);
    let f1 = g.flow(f, ContainingMethod::dependent(c1));
    g.flow_edge(f0, f1);
    let f2 = g.flow(f, ContainingMethod::reaching(b));
    g.flow_edge(f1, f2);
    let adj = g.build();

    let state = EngineState::simulate_purge_detailed(&adj, &[]);
    assert!(state.is_reached(b));

    let hp = reachability_hyperpath(&adj, &state, b);
    assert!(!hp.saturation_lost);
    assert_eq!(
        hp.edges,
        vec![
            HyperpathEdge {
                from: MethodId::ROOT,
                to: c1,
                via_type: None
            },
            HyperpathEdge {
                from: MethodId::ROOT,
                to: c2,
                via_type: None
            },
            HyperpathEdge {
                from: c1,
                to: b,
                via_type: None
            },
            HyperpathEdge {
                from: c2,
                to: b,
                via_type: Some(TypeId(0))
            },
        ]
    );
}

#[test]
fn distances_gate_direct_predecessors() {
    // M is called by both the root (distance 0) and a same-distance peer;
    // only the strictly closer caller may explain it.
    let mut g = TestGraph::new(0, 3);
    let peer = MethodId(1);
    let m = MethodId(2);
    g.call_edge(MethodId::ROOT, peer);
    g.call_edge(MethodId::ROOT, m);
    g.call_edge(peer, m);
    let adj = g.build();

    let state = EngineState::simulate_purge_detailed(&adj, &[]);
    assert_eq!(state.method_history[peer.index()].distance(), Some(1));
    assert_eq!(state.method_history[m.index()].distance(), Some(1));

    let hp = reachability_hyperpath(&adj, &state, m);
    assert_eq!(
        hp.edges,
        vec![HyperpathEdge {
            from: MethodId::ROOT,
            to: m,
            via_type: None
        }]
    );
}

#[test]
fn saturation_can_lose_the_witness() {
    // Fabricated state: B was reached at distance 5, but its only
    // invocation source saturated later (distance 6) and every recorded
    // type arrived too late. The trace is reported as lost, not invented.
    let mut g = TestGraph::new(30, 2);
    let b = MethodId(1);
    let f = g.filter(0..30);
    let v = g.flow(f, ContainingMethod::reaching(b));
    g.flow_edge(TypeflowId::WHITE_HOLE, v);
    let adj = g.build();

    let mut state = EngineState::new(&adj);
    state.method_history[MethodId::ROOT.index()] = MethodHistory::at(0);
    state.method_history[b.index()] = MethodHistory::at(5);
    for t in 0..=SATURATION_CUTOFF as u16 {
        state.typeflow_history[v.index()].add_type(TypeId(t), 6);
    }
    assert!(state.typeflow_history[v.index()].is_saturated());

    let hp = reachability_hyperpath(&adj, &state, b);
    assert!(hp.saturation_lost);
    assert!(hp.edges.is_empty());
}
