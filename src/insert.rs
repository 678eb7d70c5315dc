//! Insertion: priority-ordered anchoring, then adaptive placement.
//!
//! The inserter is deliberately lazy about tree shape. It first anchors the
//! record under the highest-priority attribute the caller declared in
//! `node_order`, then repeatedly reuses whatever child node already indexes
//! one of the remaining attributes. Only when nothing matches does it build
//! a fresh chain for the whole remainder, so attributes shared between
//! records converge onto shared nodes.

use std::sync::Arc;

use crate::leaf::Leaf;
use crate::node::Node;
use crate::path::{Pair, Path};
use crate::payload::Caps;

/// Callback invoked for every node an insertion creates, e.g. to feed the
/// reorder priority heap.
pub type IndexNodeFn = Box<dyn Fn(&Arc<Node>) + Send + Sync>;

/// Insertion configuration: a fixed attribute precedence and an optional
/// new-node hook.
#[derive(Default)]
pub struct Inserter {
    node_order: Vec<u32>,
    index_node: Option<IndexNodeFn>,
}

impl Inserter {
    /// Inserter that anchors insertions under the first key of
    /// `node_order` present in the path.
    pub fn new(node_order: Vec<u32>) -> Self {
        Inserter {
            node_order,
            index_node: None,
        }
    }

    /// Adds a hook fired for every node this inserter creates.
    pub fn with_index_node(mut self, cb: IndexNodeFn) -> Self {
        self.index_node = Some(cb);
        self
    }

    /// Declared attribute precedence.
    pub fn node_order(&self) -> &[u32] {
        &self.node_order
    }

    /// Inserts `value` at `path` below `leaf`, creating nodes and leaves
    /// as needed.
    pub fn insert(&self, leaf: &Arc<Leaf>, path: &Path, value: u64) {
        let mut leaf = Arc::clone(leaf);
        let mut path = path.clone();

        // Anchor under the first declared key present in the path; the
        // adaptive phase lays out the rest.
        for &key in &self.node_order {
            if let Some(v) = path.get(key).cloned() {
                let (node, inserted) = leaf.get_or_insert_child(key);
                if inserted {
                    self.notify(&node);
                }
                leaf = node.get_or_insert_leaf(v);
                path = path.without(key);
                break;
            }
        }

        while !path.is_empty() {
            // Read-only probe first: the usage pattern makes a hit likely,
            // and a hit keeps the leaf open for concurrent lookups.
            let node = match leaf.find_any_child(path.keys()) {
                Some(node) => node,
                None => {
                    let caps = leaf.caps();
                    let (node, inserted) = leaf.get_or_insert_any_child(path.keys(), || {
                        self.make_chain(caps, &path, value)
                    });
                    if inserted {
                        tracing::trace!(
                            key = node.key(),
                            pairs = path.len(),
                            "spliced fresh chain"
                        );
                        // The chain consumed the whole remainder, value
                        // included.
                        return;
                    }
                    // Lost the race to a concurrent writer; descend through
                    // its node instead.
                    node
                }
            };
            let v = path
                .get(node.key())
                .cloned()
                .expect("probe returned a key absent from the path");
            leaf = node.get_or_insert_leaf(v);
            path = path.without(node.key());
        }

        leaf.payload().append(value);
    }

    /// Inserts `value` along `pairs` taken literally, in the given order,
    /// without probing for reusable nodes. For callers that know the exact
    /// topology they want — tests, rebuilds, renderer fixtures.
    pub fn force_insert(&self, leaf: &Arc<Leaf>, pairs: &[Pair], value: u64) {
        let mut leaf = Arc::clone(leaf);
        for pair in pairs {
            let (node, inserted) = leaf.get_or_insert_child(pair.key);
            if inserted {
                self.notify(&node);
            }
            leaf = node.get_or_insert_leaf(pair.value.clone());
        }
        leaf.payload().append(value);
    }

    // Builds a detached chain consuming every remaining pair, deepest pair
    // first: the deepest becomes the terminal leaf holding `value`, each
    // shallower pair wraps one Node+Leaf above it. Returns the topmost node.
    fn make_chain(&self, caps: Caps, path: &Path, value: u64) -> Arc<Node> {
        let (mut cur, last) = path
            .prev(path.end())
            .expect("chain requested for empty path");
        let mut node = Node::new(last.key, caps);
        node.get_or_insert_leaf(last.value.clone())
            .payload()
            .append(value);
        self.notify(&node);

        while let Some((prev, pair)) = path.prev(cur) {
            let upper = Node::new(pair.key, caps);
            let leaf = upper.get_or_insert_leaf(pair.value.clone());
            leaf.add_child(node);
            self.notify(&upper);
            node = upper;
            cur = prev;
        }
        node
    }

    fn notify(&self, node: &Arc<Node>) {
        if let Some(cb) = &self.index_node {
            cb(node);
        }
    }
}

impl std::fmt::Debug for Inserter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inserter")
            .field("node_order", &self.node_order)
            .field("index_node", &self.index_node.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn root() -> Arc<Leaf> {
        Leaf::new_root(Caps::default())
    }

    fn path(pairs: &[(u32, &str)]) -> Path {
        Path::from_pairs(pairs.iter().map(|&(k, v)| (k, v.as_bytes().to_vec())))
    }

    // Descends key/value hops and returns the leaf at the end.
    fn descend(leaf: &Arc<Leaf>, hops: &[(u32, &str)]) -> Arc<Leaf> {
        let mut cur = Arc::clone(leaf);
        for &(k, v) in hops {
            let node = cur.get_child(k).unwrap_or_else(|| panic!("no child {k}"));
            cur = node
                .get_leaf(v.as_bytes())
                .unwrap_or_else(|| panic!("no leaf {v} under {k}"));
        }
        cur
    }

    #[test]
    fn plain_insert_builds_sorted_chain() {
        let root = root();
        Inserter::default().insert(&root, &path(&[(2, "b"), (1, "a")]), 7);
        let leaf = descend(&root, &[(1, "a"), (2, "b")]);
        assert_eq!(leaf.data(), vec![7]);
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn node_order_anchors_under_first_present_key() {
        let ins = Inserter::new(vec![3, 2, 1]);
        let root = root();
        // 3 is absent, so 2 anchors; the remainder chains below.
        ins.insert(&root, &path(&[(1, "a"), (2, "b")]), 1);
        assert_eq!(descend(&root, &[(2, "b"), (1, "a")]).data(), vec![1]);

        // 3 present: it anchors, the rest lays out in ascending key order.
        ins.insert(&root, &path(&[(3, "c"), (1, "a"), (2, "st")]), 3);
        assert_eq!(
            descend(&root, &[(3, "c"), (1, "a"), (2, "st")]).data(),
            vec![3]
        );
    }

    #[test]
    fn adaptive_phase_reuses_existing_nodes() {
        let ins = Inserter::default();
        let root = root();
        ins.insert(&root, &path(&[(1, "a"), (2, "b")]), 1);
        ins.insert(&root, &path(&[(1, "a"), (2, "x")]), 2);
        // Both records share the key-1 node and the "a" leaf.
        assert_eq!(root.child_count(), 1);
        let a = descend(&root, &[(1, "a")]);
        assert_eq!(a.child_count(), 1);
        assert_eq!(descend(&a, &[(2, "b")]).data(), vec![1]);
        assert_eq!(descend(&a, &[(2, "x")]).data(), vec![2]);
    }

    #[test]
    fn insert_into_existing_subpath_appends() {
        let ins = Inserter::default();
        let root = root();
        ins.insert(&root, &path(&[(1, "a"), (2, "b")]), 1);
        ins.insert(&root, &path(&[(1, "a")]), 3);
        assert_eq!(descend(&root, &[(1, "a")]).data(), vec![3]);
        ins.insert(&root, &path(&[(1, "a"), (2, "b")]), 2);
        assert_eq!(descend(&root, &[(1, "a"), (2, "b")]).data(), vec![1, 2]);
    }

    #[test]
    fn empty_path_lands_on_start_leaf() {
        let root = root();
        Inserter::default().insert(&root, &Path::default(), 5);
        assert_eq!(root.data(), vec![5]);
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn force_insert_keeps_given_order() {
        let root = root();
        let pairs = [
            Pair::new(3, &b"c"[..]),
            Pair::new(1, &b"a"[..]),
            Pair::new(2, &b"st"[..]),
        ];
        Inserter::default().force_insert(&root, &pairs, 9);
        assert_eq!(
            descend(&root, &[(3, "c"), (1, "a"), (2, "st")]).data(),
            vec![9]
        );
    }

    #[test]
    fn index_node_fires_per_created_node() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ins = Inserter::new(vec![2]).with_index_node(Box::new(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));
        let root = root();
        ins.insert(&root, &path(&[(1, "a"), (2, "b"), (3, "c")]), 1);
        // One anchor node plus a two-node chain.
        assert_eq!(count.load(Ordering::Relaxed), 3);

        // Re-inserting the same path creates nothing.
        ins.insert(&root, &path(&[(1, "a"), (2, "b"), (3, "c")]), 2);
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }
}
