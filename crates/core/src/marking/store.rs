use super::{KindSet, MarkKind, Marker, Marking, MarkingKind, Markings};
use crate::tree::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Markings of every node of a tree, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<NodeMarkings>", from = "Vec<NodeMarkings>")]
pub struct MarkingStore {
    nodes: HashMap<NodeId, Markings>,
}

/// Serialized record of one node's markings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMarkings {
    pub node: NodeId,
    pub markings: Markings,
}

impl MarkingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&Markings> {
        self.nodes.get(&node)
    }

    pub fn get_kind(&self, node: NodeId, kind: MarkKind) -> Option<&Marking> {
        self.nodes.get(&node).and_then(|m| m.get(kind))
    }

    pub fn is_marked(&self, node: NodeId, kind: MarkKind) -> bool {
        self.get_kind(node, kind).is_some()
    }

    /// True when `node` carries a marking of every kind in `kinds`.
    pub fn has_all(&self, node: NodeId, kinds: &KindSet) -> bool {
        kinds.iter().all(|kind| self.is_marked(node, *kind))
    }

    pub fn set(&mut self, node: NodeId, marking: Marking) {
        self.nodes.entry(node).or_default().insert(marking);
    }

    /// Stores every marking of `markings` on `node`, replacing same-kind values.
    pub fn set_all(&mut self, node: NodeId, markings: &Markings) {
        if markings.is_empty() {
            return;
        }
        self.nodes.entry(node).or_default().extend_from(markings);
    }

    pub fn clear(&mut self, node: NodeId, kind: MarkKind) -> Option<Marking> {
        let markings = self.nodes.get_mut(&node)?;
        let removed = markings.remove(kind);
        if markings.is_empty() {
            self.nodes.remove(&node);
        }
        removed
    }

    /// Drops every marking of `node`.
    pub fn remove(&mut self, node: NodeId) -> Option<Markings> {
        self.nodes.remove(&node)
    }

    /// Keeps only the nodes for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.nodes.retain(|node, _| keep(*node));
    }

    /// Typed accessor for one kind of one node.
    pub fn marker<K: MarkingKind>(&mut self, node: NodeId) -> Marker<'_, K> {
        Marker::attached(self, node)
    }

    /// Value of one kind of one node, or the kind's read default.
    pub fn read<K: MarkingKind>(&self, node: NodeId) -> K::Value {
        self.get_kind(node, K::KIND)
            .and_then(K::peek)
            .cloned()
            .unwrap_or_else(K::read_default)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Marked nodes in ascending id order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self.nodes.keys().copied().collect();
        nodes.sort();
        nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Markings)> + '_ {
        self.nodes.iter().map(|(node, markings)| (*node, markings))
    }
}

impl From<MarkingStore> for Vec<NodeMarkings> {
    fn from(store: MarkingStore) -> Self {
        let mut out: Vec<_> = store
            .nodes
            .into_iter()
            .map(|(node, markings)| NodeMarkings { node, markings })
            .collect();
        out.sort_by_key(|record| record.node);
        out
    }
}

impl From<Vec<NodeMarkings>> for MarkingStore {
    fn from(records: Vec<NodeMarkings>) -> Self {
        let mut store = MarkingStore::new();
        for record in records {
            store.set_all(record.node, &record.markings);
        }
        store
    }
}
