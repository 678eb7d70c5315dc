//! The trie facade: configuration, mutation, queries, inspection.

use std::sync::Arc;

use crate::insert::Inserter;
use crate::leaf::Leaf;
use crate::lookup::{
    capture, find_exact, greedy_lookup, strict_lookup, LookupStrategy, Wildcard,
};
use crate::path::{Pair, Path};
use crate::payload::{Caps, DEFAULT_ARRAY_CAPACITY, DEFAULT_BTREE_DEGREE};
use crate::walk::{ForEach, Inspector, ItemCounter, Visitor};

/// Construction-time knobs. All fields have defaults.
#[derive(Debug, Clone)]
pub struct TrieConfig {
    /// Attribute precedence for insertion: paths carrying any of these keys
    /// are anchored under the first one present.
    pub node_order: Vec<u32>,
    /// Payload size at which a leaf's record array is promoted to a B-tree.
    pub payload_array_capacity: usize,
    /// Minimum degree of the payload B-tree.
    pub btree_degree: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        TrieConfig {
            node_order: Vec::new(),
            payload_array_capacity: DEFAULT_ARRAY_CAPACITY,
            btree_degree: DEFAULT_BTREE_DEGREE,
        }
    }
}

/// Reorderable multi-attribute radix trie mapping attribute sets to
/// multisets of record ids.
///
/// All operations take `&self`; interior reader-writer locks serialise
/// per-node and per-leaf state. Lookups are linearisable at each node they
/// touch but there is no cross-node snapshot: a lookup racing a structural
/// mutation may observe pre- and post-states at different nodes. Iterator
/// callbacks must not mutate the trie they are iterating.
#[derive(Debug)]
pub struct Trie {
    root: Arc<Leaf>,
    inserter: Inserter,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    /// Empty trie with default configuration.
    pub fn new() -> Self {
        Self::with_config(TrieConfig::default())
    }

    /// Empty trie with the given configuration.
    pub fn with_config(config: TrieConfig) -> Self {
        let caps = Caps {
            array_capacity: config.payload_array_capacity.max(1),
            btree_degree: config.btree_degree,
        };
        Trie {
            root: Leaf::new_root(caps),
            inserter: Inserter::new(config.node_order),
        }
    }

    /// The root leaf. Records with empty attribute sets live directly on it.
    pub fn root(&self) -> &Arc<Leaf> {
        &self.root
    }

    /// Inserts `value` at `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` construction panicked upstream — see
    /// [`Path::from_slice`]. Insertion itself cannot fail; the returned
    /// flag mirrors [`delete`](Trie::delete) for symmetry.
    pub fn insert(&self, path: &Path, value: u64) -> bool {
        self.insert_to(&self.root, path, value)
    }

    /// Inserts `value` at `path` below an explicit leaf.
    pub fn insert_to(&self, leaf: &Arc<Leaf>, path: &Path, value: u64) -> bool {
        self.inserter.insert(leaf, path, value);
        true
    }

    /// The leaf whose path from the root consumes `path` exactly, if the
    /// topology contains one.
    pub fn at(&self, path: &Path) -> Option<Arc<Leaf>> {
        find_exact(&self.root, path)
    }

    /// Removes one occurrence of `value` at `path`. False when no leaf
    /// matching `path` holds `value`.
    pub fn delete(&self, path: &Path, value: u64) -> bool {
        self.delete_from(&self.root, path, value)
    }

    /// [`delete`](Trie::delete) below an explicit leaf.
    pub fn delete_from(&self, leaf: &Arc<Leaf>, path: &Path, value: u64) -> bool {
        let mut removed: Option<Arc<Leaf>> = None;
        strict_lookup(leaf, path, &mut |l| {
            if l.payload().remove(value) {
                removed = Some(Arc::clone(l));
                false
            } else {
                true
            }
        });
        let Some(l) = removed else {
            return false;
        };
        if l.empty() {
            cleanup(l);
        }
        true
    }

    /// Delivers ids recorded at exactly the attribute set `query` names.
    pub fn lookup_strict(&self, query: &Path, mut it: impl FnMut(u64) -> bool) {
        match query.len() {
            0 => {
                self.root.payload().ascend(&mut it);
            }
            1 => {
                // Single-key fast path: at most one leaf can match.
                let pair = query.first().expect("len 1");
                if let Some(leaf) = self
                    .root
                    .get_child(pair.key)
                    .and_then(|n| n.get_leaf(&pair.value))
                {
                    leaf.payload().ascend(&mut it);
                }
            }
            _ => {
                strict_lookup(&self.root, query, &mut |l| l.payload().ascend(&mut it));
            }
        }
    }

    /// Delivers ids from every leaf the greedy traversal visits: matches
    /// for every subset of `query`, digging through attributes the query
    /// does not name.
    pub fn lookup_greedy(&self, query: &Path, mut it: impl FnMut(u64) -> bool) {
        greedy_lookup(&self.root, query, &mut |l| l.payload().ascend(&mut it));
    }

    /// Greedy select: like [`lookup_greedy`](Trie::lookup_greedy), but
    /// attributes named by `wildcard` have their values captured for each
    /// delivery.
    pub fn select_greedy(
        &self,
        query: &Path,
        wildcard: &Wildcard,
        it: impl FnMut(&Wildcard, u64) -> bool,
    ) {
        self.run_capture(query, wildcard, true, LookupStrategy::Greedy, it);
    }

    /// Strict select: wildcard capture with delivery only at leaves that
    /// consumed the whole query.
    pub fn select_strict(
        &self,
        query: &Path,
        wildcard: &Wildcard,
        it: impl FnMut(&Wildcard, u64) -> bool,
    ) {
        self.run_capture(query, wildcard, true, LookupStrategy::Strict, it);
    }

    /// Greedy wildcard lookup: like select, but attributes named by
    /// neither query nor wildcard are not descended into.
    pub fn lookup_wildcard_greedy(
        &self,
        query: &Path,
        wildcard: &Wildcard,
        it: impl FnMut(&Wildcard, u64) -> bool,
    ) {
        self.run_capture(query, wildcard, false, LookupStrategy::Greedy, it);
    }

    /// Strict wildcard lookup.
    pub fn lookup_wildcard_strict(
        &self,
        query: &Path,
        wildcard: &Wildcard,
        it: impl FnMut(&Wildcard, u64) -> bool,
    ) {
        self.run_capture(query, wildcard, false, LookupStrategy::Strict, it);
    }

    fn run_capture(
        &self,
        query: &Path,
        wildcard: &Wildcard,
        greedy: bool,
        strategy: LookupStrategy,
        mut it: impl FnMut(&Wildcard, u64) -> bool,
    ) {
        let mut wc = wildcard.clone();
        capture(&self.root, query, &mut wc, greedy, strategy, &mut |w, l| {
            let mut ok = true;
            l.payload().ascend(&mut |v| {
                ok = it(w, v);
                ok
            });
            ok
        });
    }

    /// Strict-walks `query`, then feeds every leaf and node below the
    /// reached leaves to `visitor`.
    pub fn walk(&self, query: &Path, visitor: &mut dyn Visitor) {
        crate::walk::walk(&self.root, query, visitor);
    }

    /// Calls `f` with the trace and value of every record below the leaves
    /// `query` selects. False return stops the iteration.
    pub fn for_each(&self, query: &Path, f: impl FnMut(&[Pair], u64) -> bool) {
        let mut fe = ForEach { f };
        self.walk(query, &mut fe);
    }

    /// Number of records below the leaves `query` selects.
    pub fn item_count(&self, query: &Path) -> usize {
        let mut counter = ItemCounter::default();
        self.walk(query, &mut counter);
        counter.count()
    }

    /// (leaves, nodes) below the leaves `query` selects, the selected
    /// leaves included.
    pub fn size_of(&self, query: &Path) -> (usize, usize) {
        let mut insp = Inspector::default();
        self.walk(query, &mut insp);
        insp.sizes()
    }
}

// Bottom-up pruning after a deletion emptied `leaf`. Every unlink runs
// under an atomic emptiness guard; a failed guard means a concurrent
// writer brought the subtree back to life, and the walk must stop rather
// than retry.
fn cleanup(mut leaf: Arc<Leaf>) {
    loop {
        let Some(node) = leaf.parent() else {
            return;
        };
        if node.delete_empty_leaf(leaf.value()).is_none() {
            return;
        }
        tracing::trace!(key = node.key(), "pruned empty leaf");
        let Some(parent) = node.parent() else {
            return;
        };
        if parent.remove_empty_child(node.key()).is_none() {
            return;
        }
        tracing::trace!(key = node.key(), "pruned empty node");
        leaf = parent;
    }
}
