//! Per-query engine state.
//!
//! All arrays are sized once from the model and reused in place; the
//! incremental driver mutates and reverts this state across a whole purge
//! tree without reallocating.

use fixedbitset::FixedBitSet;

use causq_model::{Adjacency, FilterId, MethodId, TypeflowId};

use crate::history::{MethodHistory, TypeflowHistory};

#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    /// Observation record per typeflow.
    pub typeflow_history: Vec<TypeflowHistory>,
    /// Hop distance per method; `UNREACHED` outside the reachable set.
    pub method_history: Vec<MethodHistory>,
    /// Methods that must not be scheduled: purged, or already visited.
    pub method_inhibited: Vec<bool>,
    /// Every type observed by any saturated typeflow.
    pub all_instantiated: FixedBitSet,
    /// Saturation side-channel: per filter, the unsaturated typeflows that
    /// consume newly instantiated types in batch.
    pub(crate) saturation_uses_by_filter: Vec<Vec<TypeflowId>>,
    /// Membership flag for the side-channel, per typeflow.
    pub(crate) in_saturation_uses: Vec<bool>,
}

impl EngineState {
    pub fn new(adj: &Adjacency) -> Self {
        EngineState {
            typeflow_history: vec![TypeflowHistory::new(); adj.n_typeflows()],
            method_history: vec![MethodHistory::UNREACHED; adj.n_methods()],
            method_inhibited: vec![false; adj.n_methods()],
            all_instantiated: FixedBitSet::with_capacity(adj.n_types()),
            saturation_uses_by_filter: vec![Vec::new(); adj.n_filters()],
            in_saturation_uses: vec![false; adj.n_typeflows()],
        }
    }

    pub fn is_reached(&self, m: MethodId) -> bool {
        self.method_history[m.index()].is_reached()
    }

    pub fn reachable_count(&self) -> usize {
        self.method_history.iter().filter(|h| h.is_reached()).count()
    }

    /// The wire form of the result: one byte per method, 255 = unreached.
    pub fn method_history_bytes(&self) -> Vec<u8> {
        self.method_history.iter().map(|h| h.raw()).collect()
    }

    pub fn is_saturation_use(&self, flow: TypeflowId) -> bool {
        self.in_saturation_uses[flow.index()]
    }

    pub fn saturation_uses(&self, filter: FilterId) -> &[TypeflowId] {
        &self.saturation_uses_by_filter[filter.index()]
    }

    /// Whether two states describe the same reachability result: identical
    /// reached-method sets, instantiated-type bitsets, and per-typeflow
    /// observations up to distances. Distances are deliberately ignored so
    /// fast-mode and detailed-mode runs of the same purge set compare equal.
    pub fn reachability_equals(&self, other: &EngineState) -> bool {
        if self.all_instantiated != other.all_instantiated {
            return false;
        }
        if self.method_history.len() != other.method_history.len()
            || self.typeflow_history.len() != other.typeflow_history.len()
        {
            return false;
        }
        for (a, b) in self
            .typeflow_history
            .iter()
            .zip(other.typeflow_history.iter())
        {
            if a.any() != b.any() || a.is_saturated() != b.is_saturated() {
                return false;
            }
            if a.is_saturated() {
                continue;
            }
            if a.count() != b.count() {
                return false;
            }
            if a.iter().any(|(t, _)| !b.contains(t)) {
                return false;
            }
        }
        self.method_history
            .iter()
            .zip(other.method_history.iter())
            .all(|(a, b)| a.is_reached() == b.is_reached())
    }
}
