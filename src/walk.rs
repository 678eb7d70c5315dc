//! Visitor traversal: walk the query, then dig everything below it.
//!
//! `walk` narrows to the leaves that consume the query exactly, then hands
//! every descendant leaf and node to the visitor along with the trace of
//! (key, value) pairs that led there. External renderers (tree listings,
//! graphviz output) are built on nothing but this surface.

use std::sync::Arc;

use crate::leaf::Leaf;
use crate::lookup::strict_lookup_traced;
use crate::node::Node;
use crate::path::{Pair, Path};

/// Receiver for [`walk`] and [`dig`] traversals.
///
/// `trace` is the stack of pairs consumed between the walk's start and the
/// visited element. It is borrowed for the duration of the callback only;
/// a visitor that retains it must copy.
pub trait Visitor {
    /// Called for every leaf reached. False stops the traversal.
    fn on_leaf(&mut self, trace: &[Pair], leaf: &Arc<Leaf>) -> bool;
    /// Called for every node reached. False stops the traversal.
    fn on_node(&mut self, trace: &[Pair], node: &Arc<Node>) -> bool;
}

/// Strict-walks `query` from `leaf`, then depth-first digs below every
/// leaf that consumed it, feeding the visitor.
pub fn walk(leaf: &Arc<Leaf>, query: &Path, visitor: &mut dyn Visitor) {
    let mut trace = Vec::with_capacity(query.len() + 8);
    strict_lookup_traced(leaf, query, &mut trace, &mut |trace, l| {
        dig_rec(l, trace, visitor)
    });
}

/// Depth-first visit of everything at and below `leaf`.
pub fn dig(leaf: &Arc<Leaf>, visitor: &mut dyn Visitor) -> bool {
    let mut trace = Vec::new();
    dig_rec(leaf, &mut trace, visitor)
}

fn dig_rec(leaf: &Arc<Leaf>, trace: &mut Vec<Pair>, visitor: &mut dyn Visitor) -> bool {
    if !visitor.on_leaf(trace, leaf) {
        return false;
    }
    for node in leaf.children_snapshot() {
        if !visitor.on_node(trace, &node) {
            return false;
        }
        for (value, child) in node.snapshot_leaves() {
            trace.push(Pair::new(node.key(), value));
            let cont = dig_rec(&child, trace, visitor);
            trace.pop();
            if !cont {
                return false;
            }
        }
    }
    true
}

/// Visitor that sums payload sizes.
#[derive(Debug, Default)]
pub struct ItemCounter {
    count: usize,
}

impl ItemCounter {
    /// Total record ids seen so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Visitor for ItemCounter {
    fn on_leaf(&mut self, _trace: &[Pair], leaf: &Arc<Leaf>) -> bool {
        self.count += leaf.payload().len();
        true
    }

    fn on_node(&mut self, _trace: &[Pair], _node: &Arc<Node>) -> bool {
        true
    }
}

/// Visitor that counts leaves and nodes.
#[derive(Debug, Default)]
pub struct Inspector {
    leaves: usize,
    nodes: usize,
}

impl Inspector {
    /// (leaves, nodes) seen so far.
    pub fn sizes(&self) -> (usize, usize) {
        (self.leaves, self.nodes)
    }
}

impl Visitor for Inspector {
    fn on_leaf(&mut self, _trace: &[Pair], _leaf: &Arc<Leaf>) -> bool {
        self.leaves += 1;
        true
    }

    fn on_node(&mut self, _trace: &[Pair], _node: &Arc<Node>) -> bool {
        self.nodes += 1;
        true
    }
}

// Closure adapter delivering (trace, value) pairs.
pub(crate) struct ForEach<F> {
    pub(crate) f: F,
}

impl<F: FnMut(&[Pair], u64) -> bool> Visitor for ForEach<F> {
    fn on_leaf(&mut self, trace: &[Pair], leaf: &Arc<Leaf>) -> bool {
        let mut ok = true;
        leaf.payload().ascend(&mut |v| {
            ok = (self.f)(trace, v);
            ok
        });
        ok
    }

    fn on_node(&mut self, _trace: &[Pair], _node: &Arc<Node>) -> bool {
        true
    }
}
