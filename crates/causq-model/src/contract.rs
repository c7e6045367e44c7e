//! Redundancy pruning of the typeflow graph.
//!
//! Runs once between model build and the first query, in three steps:
//! 1. Side-effect-free removal: detach every typeflow from which no
//!    `reaching` containment is transitively visible.
//! 2. Bypass contraction: splice out nodes whose filtering and containment
//!    can be absorbed by their neighbours.
//! 3. Compaction: renumber the survivors densely, keeping the white-hole
//!    at id 0.
//!
//! Reachable-method sets and the instantiated-type bitset are preserved;
//! only the histories of bypassed nodes disappear.

use std::collections::VecDeque;
use std::mem;

use fixedbitset::FixedBitSet;
use tracing::debug;

use crate::adjacency::Adjacency;
use crate::ids::{ContainingMethod, TypeflowId};

pub(crate) fn remove_redundant(adj: &mut Adjacency) {
    let mut redundant = typeflows_without_side_effects(adj);

    // Batch detach. Successors of a side-effect-free typeflow are themselves
    // side-effect-free, so backward lists need no sweep.
    for i in 0..adj.n_typeflows() {
        if redundant.contains(i) {
            let flow = &mut adj.flows[i];
            flow.forward.clear();
            flow.backward.clear();
            flow.method = ContainingMethod::NONE;
        }
    }
    for flow in &mut adj.flows {
        flow.forward.retain(|w| !redundant.contains(w.index()));
    }
    for m in &mut adj.methods {
        m.dependent_typeflows
            .retain(|w| !redundant.contains(w.index()));
    }

    let iterations = contract_typeflow_nodes(adj, &mut redundant);
    let n_redundant = redundant.count_ones(..);
    debug!(
        redundant = n_redundant,
        total = adj.n_typeflows().saturating_sub(1),
        iterations,
        "typeflow pruning finished"
    );

    compact(adj, &redundant);
}

/// Mark every typeflow from which no transitive successor reaches a method.
/// Computed as a reverse BFS from all `reaching` typeflows; the white-hole
/// seed is never marked.
fn typeflows_without_side_effects(adj: &Adjacency) -> FixedBitSet {
    let mut marked = FixedBitSet::with_capacity(adj.n_typeflows());
    marked.set_range(.., true);

    let mut worklist = VecDeque::new();
    for i in 1..adj.n_typeflows() {
        if adj.flows[i].method.reached_method().is_some() {
            marked.set(i, false);
            worklist.push_back(TypeflowId(i as u32));
        }
    }

    while let Some(u) = worklist.pop_front() {
        for &v in &adj[u].backward {
            if marked.contains(v.index()) {
                marked.set(v.index(), false);
                worklist.push_back(v);
            }
        }
    }

    marked.set(TypeflowId::WHITE_HOLE.index(), false);
    marked
}

fn can_be_contracted(adj: &Adjacency, flow: TypeflowId) -> bool {
    let f = &adj[flow];

    if f.method.reached_method().is_some() {
        return false;
    }
    if f.forward.len() > 1 && f.backward.len() > 1 {
        return false;
    }

    // A dependent containment may only be dropped if one side of the bypass
    // already carries it.
    let absorbable = match f.method.dependent_method() {
        None => true,
        Some(m) => {
            f.backward
                .iter()
                .all(|&prev| adj[prev].method.dependent_method() == Some(m))
                || f.forward
                    .iter()
                    .all(|&next| adj[next].method.dependent_method() == Some(m))
        }
    };

    // Contracting must not loosen filtering on any spliced edge.
    let filter = adj.flow_filter(flow);
    absorbable
        && f.forward
            .iter()
            .all(|&next| filter.is_superset(adj.flow_filter(next)))
}

/// Cyclic contraction sweep; stops after a full cycle without progress.
/// Returns the number of iterations, for logging.
fn contract_typeflow_nodes(adj: &mut Adjacency, redundant: &mut FixedBitSet) -> usize {
    let n = adj.n_typeflows();
    if n <= 1 {
        return 0;
    }

    let mut iterations = 0usize;
    let mut useless_iterations = 0usize;
    let mut flow = TypeflowId(1);

    while useless_iterations <= n {
        if !redundant.contains(flow.index()) && can_be_contracted(adj, flow) {
            redundant.insert(flow.index());
            contract_one(adj, flow);
            useless_iterations = 0;
        } else {
            useless_iterations += 1;
        }

        iterations += 1;
        flow = if flow.index() == n - 1 {
            TypeflowId(1)
        } else {
            TypeflowId(flow.0 + 1)
        };
    }

    iterations
}

/// Replace `flow` by direct edges between its predecessors and successors.
fn contract_one(adj: &mut Adjacency, flow: TypeflowId) {
    let forward = mem::take(&mut adj.flows[flow.index()].forward);
    let backward = mem::take(&mut adj.flows[flow.index()].backward);

    for &next in &forward {
        remove_one(&mut adj.flows[next.index()].backward, flow);
    }
    for &prev in &backward {
        remove_one(&mut adj.flows[prev.index()].forward, flow);
        for &next in &forward {
            if next != prev && !adj.flows[prev.index()].forward.contains(&next) {
                adj.flows[prev.index()].forward.push(next);
                adj.flows[next.index()].backward.push(prev);
            }
        }
    }

    let method = mem::replace(
        &mut adj.flows[flow.index()].method,
        ContainingMethod::NONE,
    );
    if let Some(m) = method.dependent_method() {
        remove_one(&mut adj.methods[m.index()].dependent_typeflows, flow);
    }
}

fn remove_one(list: &mut Vec<TypeflowId>, item: TypeflowId) {
    let pos = list
        .iter()
        .position(|&x| x == item)
        .expect("contracted typeflow missing from a neighbour list");
    list.remove(pos);
}

/// Renumber the surviving typeflows densely. Id 0 stays the white-hole.
fn compact(adj: &mut Adjacency, redundant: &FixedBitSet) {
    assert!(
        !redundant.contains(TypeflowId::WHITE_HOLE.index()),
        "white-hole marked redundant"
    );

    let mut remap = vec![u32::MAX; adj.n_typeflows()];
    let mut next = 0u32;
    for (i, slot) in remap.iter_mut().enumerate() {
        if !redundant.contains(i) {
            *slot = next;
            next += 1;
        }
    }

    let map = |f: &mut TypeflowId| {
        let new_id = remap[f.index()];
        assert!(new_id != u32::MAX, "edge to a pruned typeflow survived");
        f.0 = new_id;
    };

    for m in &mut adj.methods {
        for f in &mut m.dependent_typeflows {
            map(f);
        }
        for f in &mut m.virtual_invocation_sources {
            map(f);
        }
    }
    for flow in &mut adj.flows {
        for f in &mut flow.forward {
            map(f);
        }
        for f in &mut flow.backward {
            map(f);
        }
    }

    let flows = mem::take(&mut adj.flows);
    adj.flows = flows
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !redundant.contains(*i))
        .map(|(_, f)| f)
        .collect();
}

#[cfg(test)]
#[path = "../tests/contract.rs"]
mod tests;
