//! Query traversal: strict and greedy lookup, and wildcard capture.
//!
//! Two independent axes. The traversal shape decides which child nodes are
//! entered: the strict shape follows only attributes the query names, the
//! greedy shape additionally digs through every leaf of nodes the query
//! does not name. The delivery strategy decides where payloads are handed
//! to the iterator: only at leaves that consumed the whole query, or at
//! every leaf visited.
//!
//! Reordering the tree is sound against all of these because queries
//! address attributes by key, never by position: two trees enumerating the
//! same (path, value) multiset answer identically.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::leaf::Leaf;
use crate::path::Path;

/// Where along the traversal payloads are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Deliver only at leaves that consumed the query completely.
    Strict,
    /// Deliver at every leaf visited.
    Greedy,
}

/// Caller-supplied capture set for partial-query selects.
///
/// Keys registered up front start out mapped to the empty value; while a
/// select runs, each key tracks the attribute value of the subtree
/// currently being visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wildcard {
    map: HashMap<u32, Bytes>,
}

impl Wildcard {
    /// Wildcard capturing the given attribute keys.
    pub fn new(keys: impl IntoIterator<Item = u32>) -> Self {
        Wildcard {
            map: keys.into_iter().map(|k| (k, Bytes::new())).collect(),
        }
    }

    /// True if `key` is captured by this wildcard.
    pub fn has(&self, key: u32) -> bool {
        self.map.contains_key(&key)
    }

    /// Currently captured value for `key`.
    pub fn get(&self, key: u32) -> Option<&Bytes> {
        self.map.get(&key)
    }

    /// Captured (key, value) entries.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Bytes)> + '_ {
        self.map.iter().map(|(&k, v)| (k, v))
    }

    /// Number of captured keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no keys are captured.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn set(&mut self, key: u32, value: Bytes) -> Bytes {
        self.map.insert(key, value).unwrap_or_default()
    }
}

/// Strict-shape traversal: descends only through child nodes whose key the
/// query names, via the value the query names. Delivers `it` at leaves that
/// consumed the whole query. Returns false if `it` short-circuited.
pub(crate) fn strict_lookup(
    leaf: &Arc<Leaf>,
    query: &Path,
    it: &mut dyn FnMut(&Arc<Leaf>) -> bool,
) -> bool {
    if query.is_empty() {
        return it(leaf);
    }
    let (lo, hi) = query.key_range().expect("non-empty query");
    let mut ok = true;
    leaf.ascend_children_range(lo, hi, &mut |node| {
        if let Some(v) = query.get(node.key()) {
            if let Some(child) = node.get_leaf(v) {
                if !strict_lookup(&child, &query.without(node.key()), it) {
                    ok = false;
                    return false;
                }
            }
        }
        true
    });
    ok
}

/// Strict-shape traversal that maintains the trace of consumed pairs, for
/// the walker. `it` receives the trace stack still mutably borrowed so the
/// dig below the reached leaf can extend it in place.
pub(crate) fn strict_lookup_traced(
    leaf: &Arc<Leaf>,
    query: &Path,
    trace: &mut Vec<crate::path::Pair>,
    it: &mut dyn FnMut(&mut Vec<crate::path::Pair>, &Arc<Leaf>) -> bool,
) -> bool {
    if query.is_empty() {
        return it(trace, leaf);
    }
    let (lo, hi) = query.key_range().expect("non-empty query");
    let mut ok = true;
    leaf.ascend_children_range(lo, hi, &mut |node| {
        if let Some(v) = query.get(node.key()) {
            if let Some(child) = node.get_leaf(v) {
                trace.push(crate::path::Pair::new(node.key(), v.clone()));
                let cont = strict_lookup_traced(&child, &query.without(node.key()), trace, it);
                trace.pop();
                if !cont {
                    ok = false;
                    return false;
                }
            }
        }
        true
    });
    ok
}

/// Greedy-shape traversal: delivers at every leaf, follows query-named
/// attributes by value and digs through all leaves of unnamed attributes.
pub(crate) fn greedy_lookup(
    leaf: &Arc<Leaf>,
    query: &Path,
    it: &mut dyn FnMut(&Arc<Leaf>) -> bool,
) -> bool {
    if !it(leaf) {
        return false;
    }
    for node in leaf.children_snapshot() {
        match query.get(node.key()) {
            Some(v) => {
                if let Some(child) = node.get_leaf(v) {
                    if !greedy_lookup(&child, &query.without(node.key()), it) {
                        return false;
                    }
                }
            }
            None => {
                let done =
                    node.ascend_leaves(&mut |_, child| greedy_lookup(child, query, it));
                if !done {
                    return false;
                }
            }
        }
    }
    true
}

/// Capture traversal behind Select and LookupWildcard.
///
/// Child nodes the query names are followed by value. Nodes it does not
/// name but the wildcard captures are entered through every leaf, with the
/// wildcard temporarily bound to each leaf's value; the previous binding is
/// restored on the way out, so a key appearing in several sibling subtrees
/// captures correctly in each. Nodes named by neither are entered through
/// every leaf without capture when `greedy`, and skipped otherwise.
pub(crate) fn capture(
    leaf: &Arc<Leaf>,
    query: &Path,
    wildcard: &mut Wildcard,
    greedy: bool,
    strategy: LookupStrategy,
    it: &mut dyn FnMut(&Wildcard, &Arc<Leaf>) -> bool,
) -> bool {
    if (strategy == LookupStrategy::Greedy || query.is_empty()) && !it(wildcard, leaf) {
        return false;
    }
    for node in leaf.children_snapshot() {
        let key = node.key();
        if let Some(v) = query.get(key) {
            if let Some(child) = node.get_leaf(v) {
                if !capture(&child, &query.without(key), wildcard, greedy, strategy, it) {
                    return false;
                }
            }
        } else if wildcard.has(key) {
            for (value, child) in node.snapshot_leaves() {
                let prev = wildcard.set(key, value);
                let ok = capture(&child, query, wildcard, greedy, strategy, it);
                wildcard.set(key, prev);
                if !ok {
                    return false;
                }
            }
        } else if greedy {
            let done = node.ascend_leaves(&mut |_, child| {
                capture(child, query, wildcard, greedy, strategy, it)
            });
            if !done {
                return false;
            }
        }
    }
    true
}

/// First leaf whose path from `leaf` consumes `query` exactly.
pub(crate) fn find_exact(leaf: &Arc<Leaf>, query: &Path) -> Option<Arc<Leaf>> {
    let mut found = None;
    strict_lookup(leaf, query, &mut |l| {
        found = Some(Arc::clone(l));
        false
    });
    found
}
