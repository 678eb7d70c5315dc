//! Leaf tier: a payload of record ids plus an ordered set of child nodes.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::node::Node;
use crate::node_array::NodeArray;
use crate::payload::{Caps, Payload};

/// Terminal tier of the trie. Every leaf sits under a parent node at some
/// attribute value (the root leaf sits under nothing, at the empty value)
/// and owns the record ids recorded for the attribute set spelled out by
/// the path from the root.
#[derive(Debug)]
pub struct Leaf {
    value: Bytes,
    caps: Caps,
    parent: RwLock<Weak<Node>>,
    payload: Payload,
    children: RwLock<NodeArray>,
}

impl Leaf {
    pub(crate) fn new(parent: Option<&Arc<Node>>, value: Bytes, caps: Caps) -> Arc<Leaf> {
        Arc::new(Leaf {
            value,
            caps,
            parent: RwLock::new(parent.map_or_else(Weak::new, Arc::downgrade)),
            payload: Payload::new(caps),
            children: RwLock::new(NodeArray::default()),
        })
    }

    pub(crate) fn new_root(caps: Caps) -> Arc<Leaf> {
        Self::new(None, Bytes::new(), caps)
    }

    /// The attribute value this leaf is indexed under by its parent node.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// The node this leaf hangs under; `None` for the root leaf and for
    /// leaves unlinked by deletion cleanup.
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn clear_parent(&self) {
        *self.parent.write() = Weak::new();
    }

    pub(crate) fn reparent(&self, parent: &Arc<Node>) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    /// The record-id multiset attached to this leaf.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Copy of the payload in increasing order.
    pub fn data(&self) -> Vec<u64> {
        self.payload.data()
    }

    /// True when the leaf carries no payload and no children — the
    /// condition the deletion cleanup prunes on.
    pub fn empty(&self) -> bool {
        self.children.read().len() == 0 && self.payload.is_empty()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// True if a child node exists for `key`.
    pub fn has_child(&self, key: u32) -> bool {
        self.children.read().has(key)
    }

    /// Child node for `key`, if any.
    pub fn get_child(&self, key: u32) -> Option<Arc<Node>> {
        self.children.read().get(key)
    }

    /// Child node for `key`, created on first use. The flag reports
    /// whether this call created it.
    pub fn get_or_insert_child(self: &Arc<Self>, key: u32) -> (Arc<Node>, bool) {
        self.children.write().get_or_insert(key, || {
            let node = Node::new(key, self.caps);
            node.set_parent(Some(self));
            node
        })
    }

    // Splices a ready-made node in as a child.
    // Panics if a child with the same key exists.
    pub(crate) fn add_child(self: &Arc<Self>, node: Arc<Node>) {
        let key = node.key();
        node.set_parent(Some(self));
        if self.children.write().upsert(node).is_some() {
            panic!("leaf already has child with key {key}");
        }
    }

    /// Unlinks and returns the child node for `key`.
    pub fn remove_child(&self, key: u32) -> Option<Arc<Node>> {
        let node = self.children.write().delete(key)?;
        node.set_parent(None);
        Some(node)
    }

    /// Atomic cleanup guard: unlinks the child for `key` only if it has no
    /// leaves at this instant. `None` ends the bottom-up cleanup walk.
    pub fn remove_empty_child(&self, key: u32) -> Option<Arc<Node>> {
        let node = self.children.write().delete_if(key, |n| n.empty())?;
        node.set_parent(None);
        Some(node)
    }

    /// Visits child nodes in ascending key order under the read lock.
    pub fn ascend_children(&self, cb: &mut dyn FnMut(&Arc<Node>) -> bool) -> bool {
        self.children.read().ascend(cb)
    }

    /// Visits child nodes with keys in `[lo, hi]` inclusive.
    pub fn ascend_children_range(
        &self,
        lo: u32,
        hi: u32,
        cb: &mut dyn FnMut(&Arc<Node>) -> bool,
    ) -> bool {
        self.children.read().ascend_range(lo, hi, cb)
    }

    // Read-only probe for any of the supplied keys, taken under the shared
    // lock so concurrent lookups keep flowing while inserters sniff around.
    pub(crate) fn find_any_child(
        &self,
        keys: impl Iterator<Item = u32>,
    ) -> Option<Arc<Node>> {
        self.children.read().find_first_matching(keys)
    }

    // Exclusive re-probe: if between the shared probe and here another
    // writer installed a matching child, that child wins and `factory`
    // never runs.
    pub(crate) fn get_or_insert_any_child(
        self: &Arc<Self>,
        keys: impl Iterator<Item = u32>,
        factory: impl FnOnce() -> Arc<Node>,
    ) -> (Arc<Node>, bool) {
        let (node, inserted) = self.children.write().get_or_insert_first_matching(keys, factory);
        if inserted {
            node.set_parent(Some(self));
        }
        (node, inserted)
    }

    // Smallest-keyed child, the deterministic vote in majority detection.
    pub(crate) fn first_child(&self) -> Option<Arc<Node>> {
        let mut first = None;
        self.children.read().ascend(&mut |n| {
            first = Some(Arc::clone(n));
            false
        });
        first
    }

    pub(crate) fn children_snapshot(&self) -> Vec<Arc<Node>> {
        let mut out = Vec::with_capacity(self.child_count());
        self.children.read().ascend(&mut |n| {
            out.push(Arc::clone(n));
            true
        });
        out
    }

    pub(crate) fn caps(&self) -> Caps {
        self.caps
    }
}
