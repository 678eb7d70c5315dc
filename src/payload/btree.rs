//! B-tree multiset of record ids, the large form of the payload container.
//!
//! Classic fix-before-descend B-tree with a configurable minimum degree.
//! Duplicate ids are folded into per-entry counts so the node layout stays
//! a flat sorted run of distinct values.

/// One distinct value with its multiplicity.
#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    count: u32,
}

#[derive(Debug, Default)]
struct BNode {
    entries: Vec<Entry>,
    /// Empty for leaf nodes; otherwise `entries.len() + 1` children.
    children: Vec<Box<BNode>>,
}

impl BNode {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Ordered multiset with O(log n) insert/remove and in-order ascent.
#[derive(Debug)]
pub(crate) struct BTreeMultiset {
    /// Minimum degree `t`: non-root nodes hold `t-1 ..= 2t-1` entries.
    degree: usize,
    root: Box<BNode>,
    /// Total stored values, counting multiplicity.
    len: usize,
}

impl BTreeMultiset {
    pub(crate) fn new(degree: usize) -> Self {
        BTreeMultiset {
            degree: degree.max(2),
            root: Box::default(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn max_entries(&self) -> usize {
        2 * self.degree - 1
    }

    pub(crate) fn insert(&mut self, v: u64) {
        if self.root.entries.len() == self.max_entries() {
            let old = std::mem::take(&mut self.root);
            self.root.children.push(old);
            Self::split_child(&mut self.root, 0, self.degree);
        }
        Self::insert_nonfull(&mut self.root, v, self.degree);
        self.len += 1;
    }

    /// Removes one occurrence of `v`. Returns false if absent.
    pub(crate) fn remove(&mut self, v: u64) -> bool {
        let ok = Self::remove_rec(&mut self.root, v, self.degree);
        if ok {
            self.len -= 1;
        }
        if self.root.entries.is_empty() && !self.root.is_leaf() {
            // The root drained into its single remaining child.
            self.root = self.root.children.remove(0);
        }
        ok
    }

    /// In-order visit, duplicates delivered as repeated calls.
    /// Stops early when `it` returns false; the return value mirrors it.
    pub(crate) fn ascend(&self, it: &mut dyn FnMut(u64) -> bool) -> bool {
        Self::ascend_rec(&self.root, it)
    }

    fn ascend_rec(node: &BNode, it: &mut dyn FnMut(u64) -> bool) -> bool {
        for (i, e) in node.entries.iter().enumerate() {
            if !node.is_leaf() && !Self::ascend_rec(&node.children[i], it) {
                return false;
            }
            for _ in 0..e.count {
                if !it(e.value) {
                    return false;
                }
            }
        }
        if let Some(last) = node.children.last() {
            return Self::ascend_rec(last, it);
        }
        true
    }

    // `parent.children[i]` is full; lift its median into `parent`.
    fn split_child(parent: &mut BNode, i: usize, t: usize) {
        let child = &mut parent.children[i];
        let right_entries = child.entries.split_off(t);
        let median = child.entries.pop().expect("full node has a median");
        let right_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(t)
        };
        parent.entries.insert(i, median);
        parent.children.insert(
            i + 1,
            Box::new(BNode {
                entries: right_entries,
                children: right_children,
            }),
        );
    }

    fn insert_nonfull(node: &mut BNode, v: u64, t: usize) {
        let mut i = node.entries.partition_point(|e| e.value < v);
        if i < node.entries.len() && node.entries[i].value == v {
            node.entries[i].count += 1;
            return;
        }
        if node.is_leaf() {
            node.entries.insert(i, Entry { value: v, count: 1 });
            return;
        }
        if node.children[i].entries.len() == 2 * t - 1 {
            Self::split_child(node, i, t);
            if node.entries[i].value == v {
                node.entries[i].count += 1;
                return;
            }
            if v > node.entries[i].value {
                i += 1;
            }
        }
        Self::insert_nonfull(&mut node.children[i], v, t)
    }

    fn remove_rec(node: &mut BNode, v: u64, t: usize) -> bool {
        let i = node.entries.partition_point(|e| e.value < v);
        let found = i < node.entries.len() && node.entries[i].value == v;
        if found {
            if node.entries[i].count > 1 {
                node.entries[i].count -= 1;
                return true;
            }
            if node.is_leaf() {
                node.entries.remove(i);
                return true;
            }
            if node.children[i].entries.len() >= t {
                node.entries[i] = Self::take_max(&mut node.children[i], t);
            } else if node.children[i + 1].entries.len() >= t {
                node.entries[i] = Self::take_min(&mut node.children[i + 1], t);
            } else {
                Self::merge_children(node, i);
                return Self::remove_rec(&mut node.children[i], v, t);
            }
            return true;
        }
        if node.is_leaf() {
            return false;
        }
        let i = Self::ensure_child(node, i, t);
        Self::remove_rec(&mut node.children[i], v, t)
    }

    // Guarantees `children[i]` holds at least `t` entries before descending,
    // borrowing from a sibling or merging. Returns the index to descend into.
    fn ensure_child(node: &mut BNode, i: usize, t: usize) -> usize {
        if node.children[i].entries.len() >= t {
            return i;
        }
        if i > 0 && node.children[i - 1].entries.len() >= t {
            // Rotate the separator down and the left sibling's max up.
            let (left_part, right_part) = node.children.split_at_mut(i);
            let left = &mut left_part[i - 1];
            let child = &mut right_part[0];
            let up = left.entries.pop().expect("sibling has spare entry");
            let sep = std::mem::replace(&mut node.entries[i - 1], up);
            child.entries.insert(0, sep);
            if let Some(c) = left.children.pop() {
                child.children.insert(0, c);
            }
            return i;
        }
        if i + 1 < node.children.len() && node.children[i + 1].entries.len() >= t {
            let (left_part, right_part) = node.children.split_at_mut(i + 1);
            let child = &mut left_part[i];
            let right = &mut right_part[0];
            let up = right.entries.remove(0);
            let sep = std::mem::replace(&mut node.entries[i], up);
            child.entries.push(sep);
            if !right.children.is_empty() {
                child.children.push(right.children.remove(0));
            }
            return i;
        }
        if i > 0 {
            Self::merge_children(node, i - 1);
            i - 1
        } else {
            Self::merge_children(node, i);
            i
        }
    }

    // Folds `children[i+1]` and the separator entry into `children[i]`.
    fn merge_children(node: &mut BNode, i: usize) {
        let sep = node.entries.remove(i);
        let right = node.children.remove(i + 1);
        let child = &mut node.children[i];
        child.entries.push(sep);
        child.entries.extend(right.entries);
        child.children.extend(right.children);
    }

    fn take_max(node: &mut BNode, t: usize) -> Entry {
        if node.is_leaf() {
            return node.entries.pop().expect("non-empty subtree");
        }
        let i = Self::ensure_child(node, node.children.len() - 1, t);
        Self::take_max(&mut node.children[i], t)
    }

    fn take_min(node: &mut BNode, t: usize) -> Entry {
        if node.is_leaf() {
            return node.entries.remove(0);
        }
        let i = Self::ensure_child(node, 0, t);
        Self::take_min(&mut node.children[i], t)
    }
}
