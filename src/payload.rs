//! Per-leaf payload: the multiset of record ids attached to one leaf.
//!
//! Small payloads live in a sorted array; once an append would push the
//! array past its capacity the whole thing is promoted into a B-tree.
//! The promotion is one-way — a tree that shrinks back under the
//! threshold stays a tree, so mixed workloads cannot oscillate between
//! forms. A tree drained to empty is released, which returns the
//! container to the (empty) array form.

mod btree;

use parking_lot::RwLock;

use btree::BTreeMultiset;

/// Array-form capacity used when no configuration is supplied.
pub const DEFAULT_ARRAY_CAPACITY: usize = 12;

/// B-tree minimum degree used when no configuration is supplied.
pub const DEFAULT_BTREE_DEGREE: usize = 128;

/// Payload sizing knobs, propagated from the trie to every leaf it creates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Caps {
    pub array_capacity: usize,
    pub btree_degree: usize,
}

impl Default for Caps {
    fn default() -> Self {
        Caps {
            array_capacity: DEFAULT_ARRAY_CAPACITY,
            btree_degree: DEFAULT_BTREE_DEGREE,
        }
    }
}

#[derive(Debug)]
enum Repr {
    Array(Vec<u64>),
    Tree(BTreeMultiset),
}

/// Thread-safe multiset of record ids.
#[derive(Debug)]
pub struct Payload {
    caps: Caps,
    inner: RwLock<Repr>,
}

impl Payload {
    pub(crate) fn new(caps: Caps) -> Self {
        Payload {
            caps,
            inner: RwLock::new(Repr::Array(Vec::new())),
        }
    }

    /// Adds one occurrence of `v`, promoting to the tree form when the
    /// array is already at capacity.
    pub fn append(&self, v: u64) {
        let mut inner = self.inner.write();
        match &mut *inner {
            Repr::Tree(tree) => tree.insert(v),
            Repr::Array(arr) => {
                if arr.len() < self.caps.array_capacity {
                    let i = arr.partition_point(|&x| x <= v);
                    arr.insert(i, v);
                    return;
                }
                let mut tree = BTreeMultiset::new(self.caps.btree_degree);
                for &x in arr.iter() {
                    tree.insert(x);
                }
                tree.insert(v);
                *inner = Repr::Tree(tree);
            }
        }
    }

    /// Removes one occurrence of `v`. Returns false if absent.
    pub fn remove(&self, v: u64) -> bool {
        let mut inner = self.inner.write();
        match &mut *inner {
            Repr::Tree(tree) => {
                let ok = tree.remove(v);
                if ok && tree.is_empty() {
                    *inner = Repr::Array(Vec::new());
                }
                ok
            }
            Repr::Array(arr) => {
                let i = arr.partition_point(|&x| x < v);
                if i < arr.len() && arr[i] == v {
                    arr.remove(i);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Number of stored ids, counting multiplicity.
    pub fn len(&self) -> usize {
        match &*self.inner.read() {
            Repr::Array(arr) => arr.len(),
            Repr::Tree(tree) => tree.len(),
        }
    }

    /// True when no ids are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits ids in increasing order; stops when `it` returns false and
    /// reports whether the visit ran to completion.
    ///
    /// The array form is snapshotted before iteration; the tree form is
    /// read under the container's read lock, so `it` must not mutate this
    /// same payload.
    pub fn ascend(&self, it: &mut dyn FnMut(u64) -> bool) -> bool {
        let inner = self.inner.read();
        let snapshot = match &*inner {
            Repr::Tree(tree) => return tree.ascend(it),
            Repr::Array(arr) => arr.clone(),
        };
        drop(inner);
        for v in snapshot {
            if !it(v) {
                return false;
            }
        }
        true
    }

    /// Copies the ids out in increasing order.
    pub fn data(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.len());
        self.ascend(&mut |v| {
            out.push(v);
            true
        });
        out
    }

    /// True when the payload has been promoted to the B-tree form.
    pub fn tree_backed(&self) -> bool {
        matches!(&*self.inner.read(), Repr::Tree(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Payload {
        Payload::new(Caps::default())
    }

    // Mirrors of the append/remove form-transition table the original
    // container was verified against.
    #[test]
    fn form_transitions() {
        for (append, remove, tree, expect_len) in [
            (1usize, 0usize, false, 1usize),
            (1, 1, false, 0),
            (DEFAULT_ARRAY_CAPACITY, 0, false, DEFAULT_ARRAY_CAPACITY),
            (
                DEFAULT_ARRAY_CAPACITY + 1,
                0,
                true,
                DEFAULT_ARRAY_CAPACITY + 1,
            ),
            (
                DEFAULT_ARRAY_CAPACITY + 1,
                1,
                true,
                DEFAULT_ARRAY_CAPACITY,
            ),
            (DEFAULT_ARRAY_CAPACITY + 1, DEFAULT_ARRAY_CAPACITY + 1, false, 0),
            (DEFAULT_ARRAY_CAPACITY, DEFAULT_ARRAY_CAPACITY, false, 0),
        ] {
            let p = payload();
            for i in 0..append {
                p.append(i as u64);
            }
            for i in 0..remove {
                assert!(p.remove(i as u64), "append:{append} remove:{remove}");
            }
            assert_eq!(p.tree_backed(), tree, "append:{append} remove:{remove}");
            assert_eq!(p.len(), expect_len, "append:{append} remove:{remove}");
        }
    }

    #[test]
    fn ascend_is_sorted_across_promotion() {
        let p = payload();
        let mut values: Vec<u64> = (0..=DEFAULT_ARRAY_CAPACITY as u64).rev().collect();
        for &v in &values {
            p.append(v);
        }
        values.sort_unstable();
        assert!(p.tree_backed());
        assert_eq!(p.data(), values);
    }

    #[test]
    fn duplicates_are_kept() {
        let p = payload();
        p.append(7);
        p.append(7);
        assert_eq!(p.data(), vec![7, 7]);
        assert!(p.remove(7));
        assert_eq!(p.data(), vec![7]);
        assert!(p.remove(7));
        assert!(!p.remove(7));
        assert!(p.is_empty());
    }

    #[test]
    fn remove_of_absent_is_false() {
        let p = payload();
        assert!(!p.remove(1));
        p.append(2);
        assert!(!p.remove(1));
    }

    #[test]
    fn tree_released_when_drained() {
        let p = payload();
        for v in 0..=DEFAULT_ARRAY_CAPACITY as u64 {
            p.append(v);
        }
        assert!(p.tree_backed());
        for v in 0..DEFAULT_ARRAY_CAPACITY as u64 {
            assert!(p.remove(v));
        }
        // Still tree-backed while non-empty.
        assert!(p.tree_backed());
        assert!(p.remove(DEFAULT_ARRAY_CAPACITY as u64));
        assert!(!p.tree_backed());
        assert!(p.is_empty());
    }

    #[test]
    fn small_degree_config() {
        let p = Payload::new(Caps {
            array_capacity: 2,
            btree_degree: 2,
        });
        for v in [9u64, 3, 7, 1, 5] {
            p.append(v);
        }
        assert!(p.tree_backed());
        assert_eq!(p.data(), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn ascend_short_circuits() {
        let p = payload();
        for v in 0..6u64 {
            p.append(v);
        }
        let mut n = 0;
        assert!(!p.ascend(&mut |_| {
            n += 1;
            false
        }));
        assert_eq!(n, 1);
    }
}
