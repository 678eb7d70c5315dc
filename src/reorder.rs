//! Reordering: promote a widely shared attribute one level toward the root.
//!
//! When most records under a node share some other attribute, pulling that
//! attribute's node up deduplicates every subtree that carries it. The
//! operation is purely structural: it preserves the (path, value) multiset
//! modulo key order, which is exactly what the lookup contract permits.
//!
//! These are manual tooling operations. Nothing in the trie triggers them
//! automatically, and lookups never consult them.

use std::sync::Arc;

use crate::leaf::Leaf;
use crate::node::Node;

/// Rotates `n` one level up.
///
/// Requires `n` to hang under a leaf whose parent node itself hangs under a
/// leaf; with either ancestor missing this is a no-op returning `n`.
///
/// A twin of `n` is created (or found) beside `n`'s grandparent node. Every
/// leaf under the grandparent that owns a child with `n`'s key has that
/// child's subtrees re-hung under the twin, with the grandparent's key
/// reinserted one level deeper. Leaves drained by the extraction — and
/// finally the grandparent itself — are removed under the atomic cleanup
/// guards, so a concurrent writer that repopulates them wins the race.
pub fn sift_up(n: &Arc<Node>) -> Arc<Node> {
    let Some(pleaf) = n.parent() else {
        return Arc::clone(n);
    };
    let Some(p) = pleaf.parent() else {
        return Arc::clone(n);
    };
    let Some(root) = p.parent() else {
        return Arc::clone(n);
    };
    let key = n.key();
    let (nn, _) = root.get_or_insert_child(key);

    let mut migrated = 0usize;
    for (pv, l) in p.snapshot_leaves() {
        let Some(c) = l.remove_child(key) else {
            continue;
        };
        for (w, gleaf) in c.take_leaves() {
            let target = nn.get_or_insert_leaf(w);
            let (pp, _) = target.get_or_insert_child(p.key());
            match pp.get_leaf(&pv) {
                None => pp.attach_leaf(pv.clone(), gleaf),
                Some(existing) => merge_leaf(&existing, &gleaf),
            }
            migrated += 1;
        }
        if l.empty() {
            p.delete_empty_leaf(l.value());
        }
    }
    if p.empty() {
        root.remove_empty_child(p.key());
    }
    tracing::debug!(key, over = p.key(), migrated, "sifted node up");
    nn
}

/// Applies [`sift_up`] to the majority child key of `n`'s leaves, if one
/// key is shared by strictly more than half of them.
pub fn compress(n: &Arc<Node>) {
    let (candidate, count, total) = major(n);
    let Some(m) = candidate else {
        return;
    };
    if count * 2 > total {
        tracing::debug!(node = n.key(), promote = m.key(), count, total, "compressing");
        sift_up(&m);
    }
}

// Boyer-Moore majority vote over the child keys of `n`'s leaves. Each leaf
// votes with its smallest-keyed child; childless leaves count toward the
// total without voting. The second pass counts leaves owning a child with
// the candidate key, so the caller gets an exact occurrence count.
pub(crate) fn major(n: &Arc<Node>) -> (Option<Arc<Node>>, usize, usize) {
    let mut total = 0usize;
    let mut counter = 0usize;
    let mut candidate: Option<Arc<Node>> = None;
    n.ascend_leaves(&mut |_, leaf| {
        total += 1;
        if let Some(child) = leaf.first_child() {
            let held = candidate.as_ref().map(|c| c.key());
            if counter == 0 {
                candidate = Some(child);
                counter = 1;
            } else if held == Some(child.key()) {
                counter += 1;
            } else {
                counter -= 1;
            }
        }
        true
    });
    let Some(c) = candidate else {
        return (None, 0, total);
    };
    let mut count = 0usize;
    n.ascend_leaves(&mut |_, leaf| {
        if leaf.has_child(c.key()) {
            count += 1;
        }
        true
    });
    (Some(c), count, total)
}

// Folds `src` into `dst`: payload values are appended, child subtrees are
// spliced across, colliding (key, value) slots merge recursively.
fn merge_leaf(dst: &Arc<Leaf>, src: &Arc<Leaf>) {
    src.payload().ascend(&mut |v| {
        dst.payload().append(v);
        true
    });
    for node in src.children_snapshot() {
        let Some(node) = src.remove_child(node.key()) else {
            continue;
        };
        match dst.get_child(node.key()) {
            None => dst.add_child(node),
            Some(existing) => {
                for (v, l) in node.take_leaves() {
                    match existing.get_leaf(&v) {
                        None => existing.attach_leaf(v, l),
                        Some(el) => merge_leaf(&el, &l),
                    }
                }
            }
        }
    }
}
