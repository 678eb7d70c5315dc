//! Reorder priority heap: nodes ranked by accumulated hit score.
//!
//! A d-ary max-heap with an identity index, so a node's score can be bumped
//! in place as insertions touch it. The trie never consults this structure;
//! it exists for tooling that decides which nodes are worth a
//! [`compress`](crate::reorder::compress) pass. Feed it from the inserter:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use facetrie::{Inserter, NodeHeap, Path};
//!
//! let heap = Arc::new(Mutex::new(NodeHeap::new(4)));
//! let sink = Arc::clone(&heap);
//! let inserter = Inserter::new(vec![]).with_index_node(Box::new(move |node| {
//!     sink.lock().unwrap().insert(Arc::clone(node));
//! }));
//! # let root = facetrie::Trie::new().root().clone();
//! inserter.insert(&root, &Path::from_pairs([(1u32, &b"a"[..])]), 1);
//! assert_eq!(heap.lock().unwrap().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::Node;

#[derive(Debug)]
struct HeapRecord {
    node: Arc<Node>,
    score: i64,
}

/// d-ary max-heap of trie nodes keyed by a mutable score.
#[derive(Debug)]
pub struct NodeHeap {
    d: usize,
    data: Vec<HeapRecord>,
    /// Node identity (allocation address) to slot index.
    index: HashMap<usize, usize>,
}

impl NodeHeap {
    /// Heap with fan-out `d` (clamped to at least 2).
    pub fn new(d: usize) -> Self {
        NodeHeap {
            d: d.max(2),
            data: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no nodes are tracked.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Highest-scored node, if any.
    pub fn head(&self) -> Option<&Arc<Node>> {
        self.data.first().map(|r| &r.node)
    }

    /// True if `node` is tracked.
    pub fn contains(&self, node: &Arc<Node>) -> bool {
        self.index.contains_key(&Self::id(node))
    }

    /// Starts tracking `node` at score zero. Re-inserting an already
    /// tracked node is a no-op.
    pub fn insert(&mut self, node: Arc<Node>) {
        let id = Self::id(&node);
        if self.index.contains_key(&id) {
            return;
        }
        let i = self.data.len();
        self.data.push(HeapRecord { node, score: 0 });
        self.index.insert(id, i);
        self.sift_up(i);
    }

    /// Adds `delta` to the node's score, restoring heap order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not tracked.
    pub fn modify(&mut self, node: &Arc<Node>, delta: i64) {
        let i = *self
            .index
            .get(&Self::id(node))
            .expect("modified record is not in the heap");
        let score = self.data[i].score + delta;
        self.update(i, score);
    }

    /// Removes and returns the highest-scored node.
    pub fn pop(&mut self) -> Option<Arc<Node>> {
        if self.data.is_empty() {
            return None;
        }
        let last = self.data.len() - 1;
        self.data.swap(0, last);
        let rec = self.data.pop().expect("non-empty");
        self.index.remove(&Self::id(&rec.node));
        if !self.data.is_empty() {
            self.index.insert(Self::id(&self.data[0].node), 0);
            self.sift_down(0);
        }
        Some(rec.node)
    }

    /// Visits tracked nodes in storage order, highest score first at the
    /// head; false return short-circuits.
    pub fn ascend(&self, cb: &mut dyn FnMut(&Arc<Node>) -> bool) {
        for rec in &self.data {
            if !cb(&rec.node) {
                return;
            }
        }
    }

    fn update(&mut self, i: usize, score: i64) {
        let prev = self.data[i].score;
        self.data[i].score = score;
        if score > prev {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / self.d;
            if self.data[i].score <= self.data[parent].score {
                return;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let mut max = i;
            for c in 1..=self.d {
                let child = self.d * i + c;
                if child >= self.data.len() {
                    break;
                }
                if self.data[child].score > self.data[max].score {
                    max = child;
                }
            }
            if max == i {
                return;
            }
            self.swap(i, max);
            i = max;
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
        self.index.insert(Self::id(&self.data[i].node), i);
        self.index.insert(Self::id(&self.data[j].node), j);
    }

    fn id(node: &Arc<Node>) -> usize {
        Arc::as_ptr(node) as usize
    }
}
