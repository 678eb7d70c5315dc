//! Sorted collection of a leaf's child nodes, keyed by attribute key.
//!
//! A plain sorted vector with binary search. Serialisation is the owning
//! leaf's business: reads happen under the leaf's read lock, mutation under
//! its write lock, which is what makes `get_or_insert_first_matching` the
//! atomic re-probe used by the inserter.

use std::sync::Arc;

use crate::node::Node;

#[derive(Debug, Default)]
pub(crate) struct NodeArray {
    data: Vec<Arc<Node>>,
}

impl NodeArray {
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn has(&self, key: u32) -> bool {
        self.search(key).is_ok()
    }

    pub(crate) fn get(&self, key: u32) -> Option<Arc<Node>> {
        self.search(key).ok().map(|i| Arc::clone(&self.data[i]))
    }

    /// Existing node for `key`, or the one produced by `factory`, inserted.
    /// The flag reports whether an insertion happened.
    pub(crate) fn get_or_insert(
        &mut self,
        key: u32,
        factory: impl FnOnce() -> Arc<Node>,
    ) -> (Arc<Node>, bool) {
        match self.search(key) {
            Ok(i) => (Arc::clone(&self.data[i]), false),
            Err(i) => {
                let node = factory();
                debug_assert_eq!(node.key(), key);
                self.data.insert(i, Arc::clone(&node));
                (node, true)
            }
        }
    }

    /// Inserts `node`, returning the displaced entry if its key was taken.
    pub(crate) fn upsert(&mut self, node: Arc<Node>) -> Option<Arc<Node>> {
        match self.search(node.key()) {
            Ok(i) => Some(std::mem::replace(&mut self.data[i], node)),
            Err(i) => {
                self.data.insert(i, node);
                None
            }
        }
    }

    pub(crate) fn delete(&mut self, key: u32) -> Option<Arc<Node>> {
        self.search(key).ok().map(|i| self.data.remove(i))
    }

    /// Deletes the node for `key` only if `pred` approves it.
    pub(crate) fn delete_if(
        &mut self,
        key: u32,
        pred: impl FnOnce(&Arc<Node>) -> bool,
    ) -> Option<Arc<Node>> {
        let i = self.search(key).ok()?;
        if pred(&self.data[i]) {
            Some(self.data.remove(i))
        } else {
            None
        }
    }

    /// Visits nodes in ascending key order; false return short-circuits.
    pub(crate) fn ascend(&self, cb: &mut dyn FnMut(&Arc<Node>) -> bool) -> bool {
        self.data.iter().all(|n| cb(n))
    }

    /// Visits nodes with keys in `[lo, hi]` inclusive.
    pub(crate) fn ascend_range(
        &self,
        lo: u32,
        hi: u32,
        cb: &mut dyn FnMut(&Arc<Node>) -> bool,
    ) -> bool {
        let start = self.data.partition_point(|n| n.key() < lo);
        self.data[start..]
            .iter()
            .take_while(|n| n.key() <= hi)
            .all(|n| cb(n))
    }

    /// First key pulled from `keys` that exists in the collection.
    ///
    /// The iterator supplies candidate keys in its own order; for the
    /// sorted key iterators the trie uses, the smallest match wins.
    pub(crate) fn find_first_matching(
        &self,
        keys: impl Iterator<Item = u32>,
    ) -> Option<Arc<Node>> {
        for key in keys {
            if let Ok(i) = self.search(key) {
                return Some(Arc::clone(&self.data[i]));
            }
        }
        None
    }

    /// Write-side analogue of [`find_first_matching`]: re-probes, and when
    /// nothing matches installs the node built by `factory`.
    ///
    /// [`find_first_matching`]: NodeArray::find_first_matching
    pub(crate) fn get_or_insert_first_matching(
        &mut self,
        keys: impl Iterator<Item = u32>,
        factory: impl FnOnce() -> Arc<Node>,
    ) -> (Arc<Node>, bool) {
        if let Some(found) = self.find_first_matching(keys) {
            return (found, false);
        }
        let node = factory();
        let i = self
            .data
            .partition_point(|n| n.key() < node.key());
        self.data.insert(i, Arc::clone(&node));
        (node, true)
    }

    fn search(&self, key: u32) -> Result<usize, usize> {
        self.data.binary_search_by_key(&key, |n| n.key())
    }
}
