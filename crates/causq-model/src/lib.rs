//! Graph model for reachability-under-purge queries.
//!
//! This crate owns everything that exists *before* a query runs:
//! - Typeset primitives: a fixed [`Bitset`] over the type universe and the
//!   tagged one-or-many [`TypeSet`] view used for typeflow filters
//! - Id newtypes ([`TypeId`], [`MethodId`], [`TypeflowId`], [`FilterId`]) and
//!   the packed [`ContainingMethod`] tag
//! - The [`Adjacency`] graph (method call edges, typeflow edges, filters,
//!   containment) and the [`Model`] wrapper that adds name tables
//! - Redundancy pruning and bypass contraction of the typeflow graph
//! - Parsers for the little-endian binary input tables
//!
//! The model is built once, optionally optimized, and then immutable; query
//! state lives in `causq-engine`.

pub mod adjacency;
pub mod bitset;
mod contract;
pub mod ids;
pub mod input;
pub mod typeset;

pub use adjacency::{Adjacency, MethodNode, Model, TypeflowNode};
pub use bitset::Bitset;
pub use ids::{ContainingMethod, Edge, FilterId, MethodId, TypeId, TypeflowId};
pub use input::{InputError, ModelData};
pub use typeset::TypeSet;
