//! The compressed call-and-type-flow graph.
//!
//! [`Adjacency`] holds the typed adjacency lists the engine traverses:
//! method-to-method call edges, typeflow-to-typeflow edges, per-typeflow
//! filters drawn from a shared pool, and the containment relations that tie
//! the two node kinds together. [`Model`] adds the name tables needed to
//! resolve and label methods.

use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bitset::Bitset;
use crate::contract;
use crate::ids::{ContainingMethod, Edge, FilterId, MethodId, TypeId, TypeflowId};
use crate::input::{InputError, ModelData};
use crate::typeset::TypeSet;

/// Per-typeflow node data.
#[derive(Debug, Default)]
pub struct TypeflowNode {
    pub forward: Vec<TypeflowId>,
    pub backward: Vec<TypeflowId>,
    /// Immutable filter: the set of types that can pass through this node.
    pub filter: FilterId,
    pub method: ContainingMethod,
}

/// Per-method node data.
#[derive(Debug, Default)]
pub struct MethodNode {
    /// Unconditional call successors; they become reachable with this method.
    pub forward: Vec<MethodId>,
    /// Inverse of `forward`, kept for hyperpath reconstruction.
    pub backward: Vec<MethodId>,
    /// Typeflows that only propagate while this method is reachable.
    pub dependent_typeflows: Vec<TypeflowId>,
    /// Typeflows whose observed types may make this method reachable.
    pub virtual_invocation_sources: Vec<TypeflowId>,
}

#[derive(Debug)]
pub struct Adjacency {
    n_types: usize,
    pub flows: Vec<TypeflowNode>,
    pub methods: Vec<MethodNode>,
    filters: Vec<Bitset>,
    /// Single-type compression of each pool entry, computed once.
    filter_single: Vec<Option<TypeId>>,
}

impl Adjacency {
    pub fn new(
        n_types: usize,
        n_methods: usize,
        interflows: &[Edge<TypeflowId>],
        direct_invokes: &[Edge<MethodId>],
        typestates: Vec<Bitset>,
        typeflow_filters: &[FilterId],
        typeflow_methods: &[ContainingMethod],
    ) -> Result<Self, InputError> {
        let n_typeflows = typeflow_methods.len();
        if typeflow_filters.len() != n_typeflows {
            return Err(InputError::LengthMismatch {
                table: "typeflow_filters",
                expected: n_typeflows,
                actual: typeflow_filters.len(),
            });
        }

        let mut flows: Vec<TypeflowNode> = Vec::with_capacity(n_typeflows);
        flows.resize_with(n_typeflows, TypeflowNode::default);
        let mut methods: Vec<MethodNode> = Vec::with_capacity(n_methods);
        methods.resize_with(n_methods, MethodNode::default);

        for e in interflows {
            if e.src.index() >= n_typeflows || e.dst.index() >= n_typeflows {
                return Err(InputError::IdOutOfRange {
                    table: "interflows",
                    id: e.src.0.max(e.dst.0),
                    limit: n_typeflows,
                });
            }
            if e.src == e.dst {
                return Err(InputError::SelfLoop(e.src.0));
            }
            flows[e.src.index()].forward.push(e.dst);
            flows[e.dst.index()].backward.push(e.src);
        }
        for e in direct_invokes {
            if e.src.index() >= n_methods || e.dst.index() >= n_methods {
                return Err(InputError::IdOutOfRange {
                    table: "direct_invokes",
                    id: e.src.0.max(e.dst.0),
                    limit: n_methods,
                });
            }
            methods[e.src.index()].forward.push(e.dst);
            methods[e.dst.index()].backward.push(e.src);
        }
        for (i, &cm) in typeflow_methods.iter().enumerate() {
            if cm.method_payload() as usize >= n_methods && !cm.is_none() {
                return Err(InputError::IdOutOfRange {
                    table: "typeflow_methods",
                    id: cm.method_payload(),
                    limit: n_methods,
                });
            }
            // The white-hole record is unused by convention.
            if i == 0 {
                continue;
            }
            flows[i].method = cm;
            if let Some(m) = cm.dependent_method() {
                methods[m.index()].dependent_typeflows.push(TypeflowId(i as u32));
            }
            if let Some(m) = cm.reached_method() {
                methods[m.index()]
                    .virtual_invocation_sources
                    .push(TypeflowId(i as u32));
            }
        }
        for (i, &filter) in typeflow_filters.iter().enumerate() {
            if filter.index() >= typestates.len() {
                return Err(InputError::FilterOutOfRange {
                    flow: i,
                    filter: filter.0,
                    n_filters: typestates.len(),
                });
            }
            flows[i].filter = filter;
        }

        for flow in &mut flows {
            flow.forward.shrink_to_fit();
            flow.backward.shrink_to_fit();
        }
        for m in &mut methods {
            m.forward.shrink_to_fit();
            m.backward.shrink_to_fit();
            m.dependent_typeflows.shrink_to_fit();
            m.virtual_invocation_sources.shrink_to_fit();
        }

        let filter_single = typestates
            .iter()
            .map(|set| {
                if set.count() == 1 {
                    set.first().map(|i| TypeId(i as u16))
                } else {
                    None
                }
            })
            .collect();

        debug!(
            n_types,
            n_methods,
            n_typeflows,
            n_filters = typestates.len(),
            "adjacency built"
        );

        Ok(Adjacency {
            n_types,
            flows,
            methods,
            filters: typestates,
            filter_single,
        })
    }

    #[inline]
    pub fn n_types(&self) -> usize {
        self.n_types
    }

    #[inline]
    pub fn n_methods(&self) -> usize {
        self.methods.len()
    }

    #[inline]
    pub fn n_typeflows(&self) -> usize {
        self.flows.len()
    }

    #[inline]
    pub fn n_filters(&self) -> usize {
        self.filters.len()
    }

    /// The compressed view of a pool filter.
    #[inline]
    pub fn filter(&self, id: FilterId) -> TypeSet<'_> {
        match self.filter_single[id.index()] {
            Some(single) => TypeSet::Single(single),
            None => TypeSet::Many(&self.filters[id.index()]),
        }
    }

    /// The filter of a typeflow node.
    #[inline]
    pub fn flow_filter(&self, flow: TypeflowId) -> TypeSet<'_> {
        self.filter(self.flows[flow.index()].filter)
    }

    /// Prune typeflows that cannot influence any query result, then contract
    /// bypassable nodes and compact the id space. Must run before queries;
    /// query results are unchanged (see the contraction preservation tests).
    pub fn optimize(&mut self) {
        contract::remove_redundant(self);
    }
}

impl Index<MethodId> for Adjacency {
    type Output = MethodNode;

    #[inline]
    fn index(&self, id: MethodId) -> &MethodNode {
        &self.methods[id.index()]
    }
}

impl IndexMut<MethodId> for Adjacency {
    #[inline]
    fn index_mut(&mut self, id: MethodId) -> &mut MethodNode {
        &mut self.methods[id.index()]
    }
}

impl Index<TypeflowId> for Adjacency {
    type Output = TypeflowNode;

    #[inline]
    fn index(&self, id: TypeflowId) -> &TypeflowNode {
        &self.flows[id.index()]
    }
}

impl IndexMut<TypeflowId> for Adjacency {
    #[inline]
    fn index_mut(&mut self, id: TypeflowId) -> &mut TypeflowNode {
        &mut self.flows[id.index()]
    }
}

/// A loaded model: the adjacency graph plus name tables.
#[derive(Debug)]
pub struct Model {
    pub type_names: Vec<String>,
    pub method_names: Vec<String>,
    pub adj: Adjacency,
    pub method_ids_by_name: FxHashMap<String, MethodId>,
}

impl Model {
    pub fn new(data: ModelData) -> Result<Self, InputError> {
        let adj = Adjacency::new(
            data.type_names.len(),
            data.method_names.len(),
            &data.interflows,
            &data.direct_invokes,
            data.typestates,
            &data.typeflow_filters,
            &data.typeflow_methods,
        )?;

        let method_ids_by_name = data
            .method_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), MethodId(i as u32)))
            .collect();

        Ok(Model {
            type_names: data.type_names,
            method_names: data.method_names,
            adj,
            method_ids_by_name,
        })
    }

    pub fn optimize(&mut self) {
        self.adj.optimize();
    }

    pub fn method_name(&self, id: MethodId) -> &str {
        self.method_names
            .get(id.index())
            .map(String::as_str)
            .unwrap_or("<unnamed>")
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.type_names
            .get(id.index())
            .map(String::as_str)
            .unwrap_or("<unnamed>")
    }
}
