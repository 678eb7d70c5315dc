//! Node tier: one attribute key, fanning out to leaves by attribute value.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::leaf::Leaf;
use crate::payload::Caps;

/// Interior tier of the trie: a single attribute key and a map from
/// attribute value to the child [`Leaf`] holding everything recorded under
/// that value.
///
/// All operations are consistent under the node's reader-writer lock.
#[derive(Debug)]
pub struct Node {
    key: u32,
    caps: Caps,
    parent: RwLock<Weak<Leaf>>,
    values: RwLock<HashMap<Bytes, Arc<Leaf>>>,
}

impl Node {
    pub(crate) fn new(key: u32, caps: Caps) -> Arc<Node> {
        Arc::new(Node {
            key,
            caps,
            parent: RwLock::new(Weak::new()),
            values: RwLock::new(HashMap::new()),
        })
    }

    #[cfg(test)]
    pub(crate) fn detached(key: u32) -> Arc<Node> {
        Self::new(key, Caps::default())
    }

    /// The attribute key this node indexes by.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// The leaf this node hangs under, if still attached.
    pub fn parent(&self) -> Option<Arc<Leaf>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: Option<&Arc<Leaf>>) {
        *self.parent.write() = parent.map_or_else(Weak::new, Arc::downgrade);
    }

    /// Number of child leaves.
    pub fn leaf_count(&self) -> usize {
        self.values.read().len()
    }

    /// True when no child leaves remain.
    pub fn empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// True if a leaf exists for `value`.
    pub fn has_leaf(&self, value: &[u8]) -> bool {
        self.values.read().contains_key(value)
    }

    /// Child leaf for `value`, if any.
    pub fn get_leaf(&self, value: &[u8]) -> Option<Arc<Leaf>> {
        self.values.read().get(value).cloned()
    }

    /// Child leaf for `value`, created on first use.
    pub fn get_or_insert_leaf(self: &Arc<Self>, value: Bytes) -> Arc<Leaf> {
        let mut values = self.values.write();
        if let Some(leaf) = values.get(&value) {
            return Arc::clone(leaf);
        }
        let leaf = Leaf::new(Some(self), value.clone(), self.caps);
        values.insert(value, Arc::clone(&leaf));
        leaf
    }

    /// Unlinks and returns the leaf for `value`.
    pub fn delete_leaf(&self, value: &[u8]) -> Option<Arc<Leaf>> {
        let mut values = self.values.write();
        let leaf = values.remove(value)?;
        leaf.clear_parent();
        Some(leaf)
    }

    /// Atomic cleanup guard: unlinks the leaf for `value` only if it is
    /// empty at this instant. `None` means the leaf was absent or live,
    /// and the bottom-up cleanup walk must stop.
    pub fn delete_empty_leaf(&self, value: &[u8]) -> Option<Arc<Leaf>> {
        let mut values = self.values.write();
        let leaf = values.get(value)?;
        if !leaf.empty() {
            return None;
        }
        let leaf = values.remove(value).expect("checked above");
        leaf.clear_parent();
        Some(leaf)
    }

    /// Visits (value, leaf) entries in no particular order under the read
    /// lock; false return short-circuits.
    pub fn ascend_leaves(&self, cb: &mut dyn FnMut(&Bytes, &Arc<Leaf>) -> bool) -> bool {
        self.values.read().iter().all(|(v, l)| cb(v, l))
    }

    // Splices an existing leaf in under `value`, re-parenting it.
    // Panics if the slot is occupied; merging is the reorderer's business.
    pub(crate) fn attach_leaf(self: &Arc<Self>, value: Bytes, leaf: Arc<Leaf>) {
        let mut values = self.values.write();
        if values.contains_key(&value) {
            panic!(
                "value {:?} already present on node {}",
                String::from_utf8_lossy(&value),
                self.key,
            );
        }
        leaf.reparent(self);
        values.insert(value, leaf);
    }

    pub(crate) fn snapshot_leaves(&self) -> Vec<(Bytes, Arc<Leaf>)> {
        self.values
            .read()
            .iter()
            .map(|(v, l)| (v.clone(), Arc::clone(l)))
            .collect()
    }

    // Empties the value map, handing every child over. Used when the node
    // has already been unlinked from its parent during reordering.
    pub(crate) fn take_leaves(&self) -> Vec<(Bytes, Arc<Leaf>)> {
        self.values.write().drain().collect()
    }
}
