//! Reachability-under-purge propagation engine.
//!
//! Consumes the immutable graph from `causq-model` and answers "if these
//! methods were deleted, what would still be live?":
//! - [`EngineState::simulate_purge`] / [`EngineState::simulate_purge_detailed`]
//!   run the monotone BFS from scratch (without / with hop distances)
//! - [`IncrementalEngine`] walks a whole tree of purge sets over one shared
//!   state, journaling and reverting deltas in place
//! - [`reachability_hyperpath`] reconstructs a witness forest explaining a
//!   reached method
//!
//! A single run is single-threaded and deterministic; the model may be
//! shared by reference across concurrent queries, each owning its state.

pub mod engine;
pub mod history;
pub mod hyperpath;
pub mod incremental;
pub mod journal;
pub mod state;

pub use history::{DIST_CAP, MethodHistory, SATURATION_CUTOFF, TypeflowHistory};
pub use hyperpath::{Hyperpath, HyperpathEdge, reachability_hyperpath};
pub use incremental::{IncrementalEngine, PurgeNode};
pub use journal::Journal;
pub use state::EngineState;

#[cfg(test)]
pub(crate) mod test_graph;
