//! Diff journal for incremental runs.
//!
//! A tracked engine run records just enough to be undone: the methods it
//! reached, a snapshot of each typeflow history taken immediately before its
//! first mutation (histories are monotone within a run, so the first
//! snapshot is the pre-run value), the types it newly instantiated, and the
//! side-channel admissions and list edits it performed. Capacities are
//! proportional to the delta, not the full state.

use causq_model::{Adjacency, MethodId, TypeId, TypeflowId};

use crate::history::{MethodHistory, TypeflowHistory};
use crate::state::EngineState;

#[derive(Debug, Default)]
pub struct Journal {
    pub(crate) visited_methods: Vec<MethodId>,
    pub(crate) typeflow_snapshots: Vec<(TypeflowId, TypeflowHistory)>,
    pub(crate) instantiated: Vec<TypeId>,
    pub(crate) saturation_admissions: Vec<TypeflowId>,
    pub(crate) saturation_list_added: Vec<TypeflowId>,
    pub(crate) saturation_list_removed: Vec<TypeflowId>,
}

impl Journal {
    pub fn is_empty(&self) -> bool {
        self.visited_methods.is_empty()
            && self.typeflow_snapshots.is_empty()
            && self.instantiated.is_empty()
            && self.saturation_admissions.is_empty()
            && self.saturation_list_added.is_empty()
            && self.saturation_list_removed.is_empty()
    }

    /// Methods newly reached by the journaled run, in visit order.
    pub fn visited_methods(&self) -> &[MethodId] {
        &self.visited_methods
    }
}

impl EngineState {
    /// Undo a journaled run. Snapshots are replayed in reverse so each
    /// typeflow ends at its pre-run record; side-channel list membership is
    /// restored exactly (element order within a list is not significant).
    pub fn revert(&mut self, adj: &Adjacency, journal: &Journal) {
        for &m in &journal.visited_methods {
            self.method_inhibited[m.index()] = false;
            self.method_history[m.index()] = MethodHistory::UNREACHED;
        }
        for &(flow, before) in journal.typeflow_snapshots.iter().rev() {
            self.typeflow_history[flow.index()] = before;
        }
        for &t in &journal.instantiated {
            self.all_instantiated.set(t.index(), false);
        }
        for &flow in &journal.saturation_admissions {
            self.in_saturation_uses[flow.index()] = false;
        }
        for &flow in &journal.saturation_list_removed {
            self.saturation_uses_by_filter[adj[flow].filter.index()].push(flow);
        }
        for &flow in &journal.saturation_list_added {
            let list = &mut self.saturation_uses_by_filter[adj[flow].filter.index()];
            let pos = list
                .iter()
                .position(|&f| f == flow)
                .expect("journaled side-channel entry vanished");
            list.remove(pos);
        }
    }
}

#[cfg(test)]
#[path = "../tests/journal.rs"]
mod tests;
