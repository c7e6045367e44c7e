//! Incremental driver: one engine state reused across a tree of purge sets.
//!
//! The driver owns an [`EngineState`] initialized with *every* method in the
//! purge tree inhibited, then walks the tree depth-first. Instead of
//! re-running from scratch per node, it *de-purges* the methods that are not
//! on the current path, feeds the ones with already-reachable predecessors
//! to the engine as extra roots, and journals the delta so the walk can back
//! out. Sibling lists are split into halves of similar total purge size so
//! the engine work per level stays balanced; the split only affects
//! performance, never results.
//!
//! At the moment [`IncrementalEngine::next`] yields a node, the state equals
//! a fresh run whose purge set is the union of the method sets on that
//! node's path from the root (off-path siblings and the node's own
//! descendants are de-purged).

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

use causq_model::{Adjacency, MethodId};

use crate::journal::Journal;
use crate::state::EngineState;

/// One node of a purge tree: a set of methods to purge, refined by optional
/// children considered within the enclosing purge. Method sets along one
/// path are expected to be nested or disjoint.
#[derive(Clone, Debug, Default)]
pub struct PurgeNode {
    pub methods: Vec<MethodId>,
    pub children: Vec<PurgeNode>,
}

impl PurgeNode {
    pub fn leaf(methods: Vec<MethodId>) -> Self {
        PurgeNode {
            methods,
            children: Vec::new(),
        }
    }

    pub fn with_children(methods: Vec<MethodId>, children: Vec<PurgeNode>) -> Self {
        PurgeNode { methods, children }
    }

    fn for_each_method(&self, f: &mut impl FnMut(MethodId)) {
        for &m in &self.methods {
            f(m);
        }
        for child in &self.children {
            child.for_each_method(f);
        }
    }
}

enum Frame<'a> {
    /// A sibling list being processed by binary partition. `journal` undoes
    /// the de-purge of `depurged` that made this frame's state valid.
    Nodes {
        nodes: &'a [PurgeNode],
        mid_index: usize,
        depurged: &'a [PurgeNode],
        journal: Journal,
    },
    /// Undo marker for the descendant de-purge around a yielded node.
    Reinhibit {
        methods: Vec<MethodId>,
        journal: Journal,
    },
}

pub struct IncrementalEngine<'a> {
    adj: &'a Adjacency,
    state: EngineState,
    stack: Vec<Frame<'a>>,
}

impl<'a> IncrementalEngine<'a> {
    /// Inhibit every method mentioned anywhere in `forest` and run the
    /// engine once in fast mode; subsequent [`next`](Self::next) calls apply
    /// and revert deltas in place.
    pub fn new(adj: &'a Adjacency, forest: &'a [PurgeNode]) -> Self {
        let mut state = EngineState::new(adj);
        for node in forest {
            node.for_each_method(&mut |m| {
                state.method_inhibited[m.index()] = true;
            });
        }
        state.run::<false, false>(adj, &[MethodId::ROOT], true);
        debug!(
            reachable = state.reachable_count(),
            forest = forest.len(),
            "incremental driver initialized"
        );

        IncrementalEngine {
            adj,
            state,
            stack: vec![Frame::Nodes {
                nodes: forest,
                mid_index: 0,
                depurged: &[],
                journal: Journal::default(),
            }],
        }
    }

    /// The state as of the most recent yield.
    pub fn current_state(&self) -> &EngineState {
        &self.state
    }

    /// Advance the depth-first walk to the next purge-tree node.
    pub fn next(&mut self) -> Option<&'a PurgeNode> {
        while let Some(top) = self.stack.last() {
            match top {
                Frame::Reinhibit { .. } => {
                    let Some(Frame::Reinhibit { methods, journal }) = self.stack.pop() else {
                        unreachable!()
                    };
                    self.state.revert(self.adj, &journal);
                    for m in methods {
                        self.state.method_inhibited[m.index()] = true;
                    }
                }
                Frame::Nodes {
                    nodes, mid_index, ..
                } => {
                    let nodes = *nodes;
                    let mid = *mid_index;

                    if nodes.is_empty() || (mid != 0 && mid >= nodes.len()) {
                        let Some(Frame::Nodes {
                            depurged, journal, ..
                        }) = self.stack.pop()
                        else {
                            unreachable!()
                        };
                        self.state.revert(self.adj, &journal);
                        for node in depurged {
                            node.for_each_method(&mut |m| {
                                self.state.method_inhibited[m.index()] = true;
                            });
                        }
                    } else if mid == 0 && nodes.len() == 1 {
                        self.set_top_mid_index(1);
                        let node = &nodes[0];
                        if !node.children.is_empty() {
                            // De-purge descendant-only methods around the
                            // yield, then restore them before the children
                            // frame runs.
                            let desc = descendant_only_methods(node);
                            let journal = self.depurge(&desc);
                            self.stack.push(Frame::Nodes {
                                nodes: &node.children,
                                mid_index: 0,
                                depurged: &[],
                                journal: Journal::default(),
                            });
                            self.stack.push(Frame::Reinhibit {
                                methods: desc,
                                journal,
                            });
                        }
                        return Some(node);
                    } else if mid == 0 {
                        let p = partition_point(nodes);
                        self.set_top_mid_index(p);
                        self.do_purge(&nodes[..p], &nodes[p..]);
                    } else {
                        self.set_top_mid_index(nodes.len());
                        self.do_purge(&nodes[mid..], &nodes[..mid]);
                    }
                }
            }
        }
        None
    }

    /// Run the whole walk, invoking `callback` at every node.
    pub fn for_each(mut self, mut callback: impl FnMut(&'a PurgeNode, &EngineState)) {
        while let Some(node) = self.next() {
            callback(node, &self.state);
        }
    }

    fn set_top_mid_index(&mut self, value: usize) {
        match self.stack.last_mut() {
            Some(Frame::Nodes { mid_index, .. }) => *mid_index = value,
            _ => unreachable!(),
        }
    }

    /// Keep `still` purged, de-purge everything under `depurge`, and push
    /// the frame for `still` with the journaled delta.
    fn do_purge(&mut self, still: &'a [PurgeNode], depurge: &'a [PurgeNode]) {
        let mut methods = Vec::new();
        for node in depurge {
            node.for_each_method(&mut |m| methods.push(m));
        }
        let journal = self.depurge(&methods);
        self.stack.push(Frame::Nodes {
            nodes: still,
            mid_index: 0,
            depurged: depurge,
            journal,
        });
    }

    /// Clear the inhibition of `methods` and re-run the engine from those
    /// that are immediately schedulable: a reachable caller, or a virtual
    /// invocation source that has already observed types.
    fn depurge(&mut self, methods: &[MethodId]) -> Journal {
        let mut roots: SmallVec<[MethodId; 16]> = SmallVec::new();
        for &mid in methods {
            if !self.state.method_inhibited[mid.index()]
                || self.state.method_history[mid.index()].is_reached()
            {
                continue;
            }
            self.state.method_inhibited[mid.index()] = false;

            let m = &self.adj[mid];
            if m.backward
                .iter()
                .any(|&p| self.state.method_history[p.index()].is_reached())
                || m.virtual_invocation_sources
                    .iter()
                    .any(|&f| self.state.typeflow_history[f.index()].any())
            {
                roots.push(mid);
            }
        }
        self.state.run::<false, true>(self.adj, &roots, false)
    }
}

/// Methods mentioned in `node`'s children subtrees but not in `node`'s own
/// purge set. For the usual nested trees this is empty.
fn descendant_only_methods(node: &PurgeNode) -> Vec<MethodId> {
    let own: FxHashSet<MethodId> = node.methods.iter().copied().collect();
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for child in &node.children {
        child.for_each_method(&mut |m| {
            if !own.contains(&m) && seen.insert(m) {
                out.push(m);
            }
        });
    }
    out
}

/// Split a sibling list into two runs of roughly equal total purge-set
/// size. The boundary node goes to whichever half brings the totals closer.
fn partition_point(nodes: &[PurgeNode]) -> usize {
    let total: usize = nodes.iter().map(|n| n.methods.len()).sum();
    let half = total / 2;
    let mut mid = 0;
    let mut acc = 0;
    while mid < nodes.len() && acc < half {
        acc += nodes[mid].methods.len();
        if acc >= half {
            if total - acc > acc - nodes[mid].methods.len() {
                mid += 1;
            }
            break;
        }
        mid += 1;
    }
    mid.clamp(1, nodes.len() - 1)
}

#[cfg(test)]
#[path = "../tests/incremental.rs"]
mod tests;
