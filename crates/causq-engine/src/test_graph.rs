//! Shared graph builder for the engine test suites.

use causq_model::{
    Adjacency, Bitset, ContainingMethod, Edge, FilterId, MethodId, TypeflowId,
};

/// Incrementally assembled test graph. The white-hole typeflow (empty
/// filter) and the root method exist from the start.
pub(crate) struct TestGraph {
    pub n_types: usize,
    pub n_methods: usize,
    typestates: Vec<Bitset>,
    interflows: Vec<Edge<TypeflowId>>,
    direct_invokes: Vec<Edge<MethodId>>,
    typeflow_methods: Vec<ContainingMethod>,
    typeflow_filters: Vec<FilterId>,
}

impl TestGraph {
    pub fn new(n_types: usize, n_methods: usize) -> Self {
        TestGraph {
            n_types,
            n_methods,
            typestates: vec![Bitset::new(n_types)],
            interflows: Vec::new(),
            direct_invokes: Vec::new(),
            typeflow_methods: vec![ContainingMethod::NONE],
            typeflow_filters: vec![FilterId(0)],
        }
    }

    /// Register a filter containing `types`.
    pub fn filter(&mut self, types: impl IntoIterator<Item = u16>) -> FilterId {
        let mut set = Bitset::new(self.n_types);
        for t in types {
            set.insert(t as usize);
        }
        self.typestates.push(set);
        FilterId((self.typestates.len() - 1) as u32)
    }

    pub fn flow(&mut self, filter: FilterId, method: ContainingMethod) -> TypeflowId {
        self.typeflow_methods.push(method);
        self.typeflow_filters.push(filter);
        TypeflowId((self.typeflow_methods.len() - 1) as u32)
    }

    pub fn flow_edge(&mut self, src: TypeflowId, dst: TypeflowId) {
        self.interflows.push(Edge::new(src, dst));
    }

    pub fn call_edge(&mut self, src: MethodId, dst: MethodId) {
        self.direct_invokes.push(Edge::new(src, dst));
    }

    pub fn build(self) -> Adjacency {
        Adjacency::new(
            self.n_types,
            self.n_methods,
            &self.interflows,
            &self.direct_invokes,
            self.typestates,
            &self.typeflow_filters,
            &self.typeflow_methods,
        )
        .expect("test graph is well-formed")
    }
}
