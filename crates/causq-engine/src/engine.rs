//! The monotone propagation engine.
//!
//! One run computes, for a given purge set, the reachable methods, every
//! typeflow's observation history, and the globally instantiated types. The
//! traversal interleaves two frontiers: a per-distance method worklist and a
//! typeflow worklist driven to a fixed point at each level. Typeflows whose
//! histories overflow stop tracking individual types and instead subscribe
//! to the *saturation side-channel*, which batch-delivers newly instantiated
//! types per filter.
//!
//! `DIST_MATTERS = false` is roughly twice as fast and leaves every distance
//! at zero; the incremental driver always runs in that mode. `TRACK = true`
//! journals the delta for [`EngineState::revert`].

use std::collections::VecDeque;

use tracing::debug;

use causq_model::{Adjacency, FilterId, MethodId, TypeId, TypeflowId};

use crate::history::{DIST_CAP, MethodHistory};
use crate::journal::Journal;
use crate::state::EngineState;

/// Below this filter popcount, cross-pollination enumerates the filter and
/// probes the fresh-type list instead of the other way around.
const SMALL_FILTER_CUTOFF: usize = 4;

impl EngineState {
    /// From-scratch reachability under `purge`, fast mode: distances are not
    /// computed (all reported as 0).
    pub fn simulate_purge(adj: &Adjacency, purge: &[MethodId]) -> EngineState {
        Self::run_from_scratch::<false>(adj, purge)
    }

    /// From-scratch reachability under `purge` with hop distances, as needed
    /// by hyperpath reconstruction.
    pub fn simulate_purge_detailed(adj: &Adjacency, purge: &[MethodId]) -> EngineState {
        Self::run_from_scratch::<true>(adj, purge)
    }

    fn run_from_scratch<const DIST_MATTERS: bool>(
        adj: &Adjacency,
        purge: &[MethodId],
    ) -> EngineState {
        let mut state = EngineState::new(adj);
        for &m in purge {
            state.method_inhibited[m.index()] = true;
        }
        state.run::<DIST_MATTERS, false>(adj, &[MethodId::ROOT], true);
        for &m in purge {
            state.method_inhibited[m.index()] = false;
        }
        debug!(
            purged = purge.len(),
            reachable = state.reachable_count(),
            dist_matters = DIST_MATTERS,
            "from-scratch run finished"
        );
        state
    }

    /// Drive the propagation to its fixed point from `roots`.
    ///
    /// `init_typeflows` seeds the white-hole successors and is only set for
    /// the first run on a fresh state; incremental re-runs feed previously
    /// purged methods as extra roots instead.
    pub(crate) fn run<const DIST_MATTERS: bool, const TRACK: bool>(
        &mut self,
        adj: &Adjacency,
        roots: &[MethodId],
        init_typeflows: bool,
    ) -> Journal {
        let EngineState {
            typeflow_history,
            method_history,
            method_inhibited,
            all_instantiated,
            saturation_uses_by_filter,
            in_saturation_uses,
        } = self;

        let mut journal = Journal::default();

        for &root in roots {
            method_inhibited[root.index()] = true;
            method_history[root.index()] = MethodHistory::at(0);
        }

        let mut method_worklist: Vec<MethodId> = roots.to_vec();
        let mut next_method_worklist: Vec<MethodId> = Vec::new();
        let mut typeflow_worklist: VecDeque<TypeflowId> = VecDeque::new();
        let mut instantiated_since: Vec<TypeId> = Vec::new();

        let dependent_reached = |method_history: &[MethodHistory], v: TypeflowId| {
            adj[v]
                .method
                .dependent_method()
                .is_none_or(|m| method_history[m.index()].is_reached())
        };

        // Seed the white-hole successors: each receives its entire filter at
        // distance 0. A successor whose filter exceeds the history capacity
        // saturates right here; when it has no containing method, the whole
        // filter counts as instantiated (the white-hole supplies every
        // member), since the overflow slots would otherwise be lost.
        if init_typeflows {
            for &v in &adj[TypeflowId::WHITE_HOLE].forward {
                let filter = adj.flow_filter(v);
                let mut changed = false;
                let before = typeflow_history[v.index()];

                for ty in filter.iter() {
                    changed |= typeflow_history[v.index()].add_type(ty, 0);
                    if typeflow_history[v.index()].is_saturated() {
                        if adj[v].method.dependent_method().is_none() {
                            for t in filter.iter() {
                                if !all_instantiated.contains(t.index()) {
                                    all_instantiated.insert(t.index());
                                    instantiated_since.push(t);
                                }
                            }
                        }
                        break;
                    }
                }

                if TRACK && changed {
                    journal.typeflow_snapshots.push((v, before));
                }
                if changed && adj[v].method.dependent_method().is_none() {
                    typeflow_worklist.push_back(v);
                }
            }
        }

        let mut dist: u8 = 0;

        while !method_worklist.is_empty() {
            // Method phase. In fast mode, absorb every cascading method
            // frontier before touching typeflows; in detailed mode, one
            // frontier per distance level.
            loop {
                if TRACK {
                    journal.visited_methods.extend_from_slice(&method_worklist);
                }
                for &u in &method_worklist {
                    method_history[u.index()] = MethodHistory::at(dist);
                    let m = &adj[u];

                    for &v in &m.dependent_typeflows {
                        if typeflow_history[v.index()].any() {
                            typeflow_worklist.push_back(v);
                        }
                    }
                    for &v in &m.forward {
                        if !method_inhibited[v.index()] {
                            method_inhibited[v.index()] = true;
                            next_method_worklist.push(v);
                        }
                    }
                }
                method_worklist.clear();
                std::mem::swap(&mut method_worklist, &mut next_method_worklist);

                if DIST_MATTERS || method_worklist.is_empty() {
                    break;
                }
            }
            if DIST_MATTERS && dist < DIST_CAP {
                dist += 1;
            }

            // Typeflow phase: drain to a fixed point, cross-pollinating the
            // saturation side-channel between drains.
            loop {
                while let Some(u) = typeflow_worklist.pop_front() {
                    if let Some(reaching) = adj[u].method.reached_method() {
                        if !method_inhibited[reaching.index()] {
                            method_inhibited[reaching.index()] = true;
                            method_worklist.push(reaching);
                        }
                    }

                    let uh = typeflow_history[u.index()];
                    if !uh.is_saturated() {
                        for &v in &adj[u].forward {
                            if !typeflow_history[v.index()].is_saturated() {
                                let filter = adj.flow_filter(v);
                                let mut changed = false;
                                let before = typeflow_history[v.index()];

                                for (ty, _) in uh.iter() {
                                    if !filter.contains(ty) {
                                        continue;
                                    }
                                    changed |= typeflow_history[v.index()].add_type(ty, dist);
                                    if typeflow_history[v.index()].is_saturated() {
                                        break;
                                    }
                                }

                                if TRACK && changed {
                                    journal.typeflow_snapshots.push((v, before));
                                }
                                if changed && dependent_reached(method_history, v) {
                                    typeflow_worklist.push_back(v);
                                }
                            }
                            // Anything an unsaturated node pushes into a
                            // saturated one is globally instantiated.
                            if typeflow_history[v.index()].is_saturated() {
                                let filter = adj.flow_filter(v);
                                for (ty, _) in uh.iter() {
                                    if !all_instantiated.contains(ty.index())
                                        && filter.contains(ty)
                                    {
                                        all_instantiated.insert(ty.index());
                                        instantiated_since.push(ty);
                                    }
                                }
                            }
                        }
                    } else {
                        for (ty, _) in uh.iter() {
                            if !all_instantiated.contains(ty.index()) {
                                all_instantiated.insert(ty.index());
                                instantiated_since.push(ty);
                            }
                        }

                        // Admit successors to the side-channel: catch them up
                        // from the instantiated set, then subscribe them to
                        // their filter's batch list.
                        for &v in &adj[u].forward {
                            if typeflow_history[v.index()].is_saturated() {
                                continue;
                            }
                            if in_saturation_uses[v.index()] {
                                continue;
                            }
                            in_saturation_uses[v.index()] = true;
                            if TRACK {
                                journal.saturation_admissions.push(v);
                            }

                            let filter = adj.flow_filter(v);
                            let mut changed = false;
                            let before = typeflow_history[v.index()];

                            for ty in filter.iter() {
                                if !all_instantiated.contains(ty.index()) {
                                    continue;
                                }
                                changed |= typeflow_history[v.index()].add_type(ty, dist);
                                if typeflow_history[v.index()].is_saturated() {
                                    break;
                                }
                            }

                            if !typeflow_history[v.index()].is_saturated() {
                                saturation_uses_by_filter[adj[v].filter.index()].push(v);
                                if TRACK {
                                    journal.saturation_list_added.push(v);
                                }
                            }
                            if TRACK && changed {
                                journal.typeflow_snapshots.push((v, before));
                            }
                            if changed && dependent_reached(method_history, v) {
                                typeflow_worklist.push_back(v);
                            }
                        }
                    }
                }

                // Spreading the side-channel is comparatively costly; in
                // fast mode, drain fresh method reachability first.
                if !DIST_MATTERS && !method_worklist.is_empty() {
                    break;
                }
                if instantiated_since.is_empty() {
                    break;
                }

                // Cross-pollination: hand this level's fresh types to every
                // subscribed typeflow whose filter admits them.
                let mut fresh_filtered: Vec<TypeId> = Vec::new();
                for filter_id in 0..saturation_uses_by_filter.len() {
                    let mut uses = std::mem::take(&mut saturation_uses_by_filter[filter_id]);
                    if uses.is_empty() {
                        saturation_uses_by_filter[filter_id] = uses;
                        continue;
                    }

                    if TRACK {
                        for &v in &uses {
                            if typeflow_history[v.index()].is_saturated() {
                                journal.saturation_list_removed.push(v);
                            }
                        }
                    }
                    uses.retain(|&v| !typeflow_history[v.index()].is_saturated());
                    if uses.is_empty() {
                        saturation_uses_by_filter[filter_id] = uses;
                        continue;
                    }

                    let filter = adj.filter(FilterId(filter_id as u32));
                    fresh_filtered.clear();
                    if filter.count() <= SMALL_FILTER_CUTOFF {
                        // Tiny filter: enumerate it and probe the fresh list,
                        // keeping the inner loop constant-size.
                        for ty in filter.iter() {
                            if instantiated_since.contains(&ty) {
                                fresh_filtered.push(ty);
                            }
                        }
                    } else {
                        for &ty in &instantiated_since {
                            if filter.contains(ty) {
                                fresh_filtered.push(ty);
                            }
                        }
                    }
                    if fresh_filtered.is_empty() {
                        saturation_uses_by_filter[filter_id] = uses;
                        continue;
                    }

                    let mut i = 0;
                    while i < uses.len() {
                        let v = uses[i];
                        if typeflow_history[v.index()].is_saturated() {
                            if TRACK {
                                journal.saturation_list_removed.push(v);
                            }
                            uses.remove(i);
                            continue;
                        }
                        let mut changed = false;
                        let before = typeflow_history[v.index()];
                        for &ty in &fresh_filtered {
                            changed |= typeflow_history[v.index()].add_type(ty, dist);
                            if typeflow_history[v.index()].is_saturated() {
                                break;
                            }
                        }
                        if TRACK && changed {
                            journal.typeflow_snapshots.push((v, before));
                        }
                        if changed && dependent_reached(method_history, v) {
                            typeflow_worklist.push_back(v);
                        }
                        i += 1;
                    }

                    saturation_uses_by_filter[filter_id] = uses;
                }

                if TRACK {
                    journal.instantiated.extend_from_slice(&instantiated_since);
                }
                instantiated_since.clear();
            }
        }

        debug_assert!(instantiated_since.is_empty());
        journal
    }
}

#[cfg(test)]
#[path = "../tests/engine.rs"]
mod tests;
