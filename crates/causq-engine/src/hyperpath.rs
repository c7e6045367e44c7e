//! Hyperpath reconstruction: why is this method reachable?
//!
//! Walks backwards from a target method through a *detailed* engine state.
//! A predecessor with a strictly smaller distance explains a plain call; if
//! none exists the method was reached by virtual dispatch, and the search
//! picks the earliest witness type observed by the method's invocation
//! sources, then traces that type backwards through the typeflow graph to
//! the white-hole, emitting the containing methods along the way. Saturated
//! typeflows no longer know which types they carried, so the trace may come
//! back incomplete; [`Hyperpath::saturation_lost`] reports that explicitly.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use causq_model::{Adjacency, MethodId, TypeId, TypeflowId};

use crate::state::EngineState;

/// One edge of a witness forest. `via_type` is present on edges contributed
/// by virtual dispatch; the invoking end of each dispatch chain is reported
/// as a plain call edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HyperpathEdge {
    pub from: MethodId,
    pub to: MethodId,
    pub via_type: Option<TypeId>,
}

#[derive(Debug, Default)]
pub struct Hyperpath {
    pub edges: Vec<HyperpathEdge>,
    /// True when part of the explanation was destroyed by saturation; the
    /// edges that were recovered are still returned.
    pub saturation_lost: bool,
}

/// Reconstruct the witness forest for `target` from a state produced by
/// [`EngineState::simulate_purge_detailed`].
pub fn reachability_hyperpath(
    adj: &Adjacency,
    state: &EngineState,
    target: MethodId,
) -> Hyperpath {
    let mut edges: FxHashMap<(MethodId, MethodId), Option<TypeId>> = FxHashMap::default();
    let mut lost = false;

    if state.method_history[target.index()].is_reached() {
        let mut visited = vec![false; adj.n_methods()];
        collect(adj, state, target, &mut visited, &mut edges, &mut lost);
    }

    let mut edges: Vec<HyperpathEdge> = edges
        .into_iter()
        .map(|((from, to), via_type)| HyperpathEdge { from, to, via_type })
        .collect();
    edges.sort_by_key(|e| (e.from, e.to));

    Hyperpath {
        edges,
        saturation_lost: lost,
    }
}

fn dependent_reached(adj: &Adjacency, state: &EngineState, flow: TypeflowId) -> bool {
    adj[flow]
        .method
        .dependent_method()
        .is_none_or(|m| state.method_history[m.index()].is_reached())
}

fn collect(
    adj: &Adjacency,
    state: &EngineState,
    m: MethodId,
    visited: &mut [bool],
    edges: &mut FxHashMap<(MethodId, MethodId), Option<TypeId>>,
    lost: &mut bool,
) {
    let dist = state.method_history[m.index()].raw();
    if dist == 0 {
        return;
    }
    if visited[m.index()] {
        return;
    }
    visited[m.index()] = true;

    // A direct caller that is strictly closer to the root explains `m` as a
    // plain call.
    if let Some(&prev) = adj[m]
        .backward
        .iter()
        .find(|&&p| state.method_history[p.index()].raw() < dist)
    {
        edges.insert((prev, m), None);
        collect(adj, state, prev, visited, edges, lost);
        return;
    }

    // Otherwise the reason is virtual dispatch: find the invocation source
    // carrying the earliest witness, counting saturation as a witness at its
    // recorded distance.
    let mut start_flow: Option<TypeflowId> = None;
    let mut flow_type = TypeId(0);
    let mut flow_type_dist = u8::MAX;

    for &flow in &adj[m].virtual_invocation_sources {
        if !dependent_reached(adj, state, flow) {
            continue;
        }
        let history = &state.typeflow_history[flow.index()];
        for (ty, d) in history.iter() {
            if d < flow_type_dist {
                flow_type = ty;
                flow_type_dist = d;
                start_flow = Some(flow);
            }
        }
        if let Some(sd) = history.saturated_dist() {
            if sd < flow_type_dist {
                flow_type = adj
                    .flow_filter(flow)
                    .first()
                    .expect("saturated typeflow has an empty filter");
                flow_type_dist = sd;
                start_flow = Some(flow);
            }
        }
    }

    let Some(start_flow) = start_flow else {
        *lost = true;
        return;
    };
    if flow_type_dist > dist {
        *lost = true;
        return;
    }

    // Backward BFS through the typeflow graph, restricted to flows that
    // carried the witness type early enough (or were saturated by then).
    let mut parent: Vec<Option<TypeflowId>> = vec![None; adj.n_typeflows()];
    let mut worklist = VecDeque::new();
    worklist.push_back(start_flow);

    loop {
        let Some(flow) = worklist.pop_front() else {
            *lost = true;
            return;
        };

        if state.typeflow_history[flow.index()]
            .saturated_dist()
            .is_some_and(|sd| sd <= dist)
        {
            // Lateral jump: any other early-saturated flow whose filter
            // admits the witness type may stand in as a parent.
            for v in 1..adj.n_typeflows() {
                let v = TypeflowId(v as u32);
                if v == flow || parent[v.index()].is_some() || !dependent_reached(adj, state, v) {
                    continue;
                }
                let vh = &state.typeflow_history[v.index()];
                if vh.saturated_dist().is_some_and(|sd| sd <= dist)
                    && adj.flow_filter(v).contains(flow_type)
                {
                    if vh.contains(flow_type) {
                        parent[v.index()] = Some(flow);
                        worklist.push_back(v);
                    }
                    for &u in &adj[v].backward {
                        if u == flow
                            || parent[u.index()].is_some()
                            || !dependent_reached(adj, state, u)
                        {
                            continue;
                        }
                        if state.typeflow_history[u.index()].contains(flow_type) {
                            parent[u.index()] = Some(flow);
                            worklist.push_back(u);
                        }
                    }
                }
            }
        }

        for &prev in &adj[flow].backward {
            if prev == TypeflowId::WHITE_HOLE {
                emit_chain(adj, state, m, flow_type, flow, &parent, visited, edges, lost);
                return;
            }
            if parent[prev.index()].is_some() {
                continue;
            }
            if let Some(dm) = adj[prev].method.dependent_method() {
                if state.method_history[dm.index()].raw() >= dist {
                    continue;
                }
            }
            let ph = &state.typeflow_history[prev.index()];
            if ph.saturated_dist().is_some_and(|sd| sd <= dist)
                || ph.iter().any(|(t, d)| t == flow_type && d <= dist)
            {
                parent[prev.index()] = Some(flow);
                worklist.push_back(prev);
            }
        }
    }
}

/// Walk the discovered chain from the invocation side back toward the
/// white-hole and record one `via_type` edge per containing method,
/// recursing into each. The first containing method encountered holds the
/// call site itself and gets a plain call edge instead.
fn emit_chain(
    adj: &Adjacency,
    state: &EngineState,
    m: MethodId,
    flow_type: TypeId,
    chain_end: TypeflowId,
    parent: &[Option<TypeflowId>],
    visited: &mut [bool],
    edges: &mut FxHashMap<(MethodId, MethodId), Option<TypeId>>,
    lost: &mut bool,
) {
    let mut chain: Vec<TypeflowId> = Vec::new();
    let mut cur = chain_end;
    while let Some(p) = parent[cur.index()] {
        chain.push(cur);
        cur = p;
    }
    chain.reverse();

    let mut emitted = false;
    let mut searching_for_invoker = true;
    for &flow in &chain {
        if state.typeflow_history[flow.index()].is_saturated() {
            searching_for_invoker = false;
        }
        if let Some(container) = adj[flow].method.dependent_method() {
            let slot = edges.entry((container, m)).or_insert(Some(flow_type));
            if searching_for_invoker {
                *slot = None;
                searching_for_invoker = false;
            }
            emitted = true;
            collect(adj, state, container, visited, edges, lost);
        }
    }

    // A type seeded straight out of the white-hole has no containing methods
    // to blame; attribute the dispatch to the root so the witness is still
    // visible in the forest.
    if !emitted {
        edges
            .entry((MethodId::ROOT, m))
            .or_insert(Some(flow_type));
    }
}

#[cfg(test)]
#[path = "../tests/hyperpath.rs"]
mod tests;
