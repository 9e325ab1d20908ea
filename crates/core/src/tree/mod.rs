//! Arena-backed tree model.
//!
//! Every node lives in a single `Tree` and is addressed by a stable `NodeId`. Identity is the id:
//! two structurally identical subtrees are distinct nodes. Markings and other side tables key on
//! `NodeId` rather than on node contents, so rewriting or copying a subtree never disturbs the
//! facts recorded for the original.

use crate::ast::Atom;
use crate::grammar::Grammar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

mod build;

/// Kind reported for list nodes.
pub const LIST_KIND: &str = "list";
/// Kind reported for the empty node.
pub const EMPTY_KIND: &str = "empty";
/// Kind reported for atomic leaves.
pub const ATOM_KIND: &str = "atom";

/// Stable index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Id of the `index`-th node allocated; only meaningful for the tree that allocated it.
    pub fn new(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Empty,
    Atom(Atom),
    List(Vec<NodeId>),
    /// Structured node; `fields` follows the grammar's canonical field order for `kind`.
    Structured { kind: String, fields: Vec<NodeId> },
}

/// How a child hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label<'a> {
    Field(&'a str),
    Index(usize),
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Field(name) => write!(f, "{name}"),
            Label::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Arena length recorded before transient nodes are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Returns true when `id` was allocated after this checkpoint.
    pub fn is_transient(&self, id: NodeId) -> bool {
        id.index() >= self.0
    }
}

/// Arena of nodes sharing one grammar.
#[derive(Debug, Clone)]
pub struct Tree {
    grammar: Arc<Grammar>,
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(grammar: Grammar) -> Self {
        Self::with_grammar(Arc::new(grammar))
    }

    pub fn with_grammar(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            nodes: Vec::new(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn shared_grammar(&self) -> Arc<Grammar> {
        Arc::clone(&self.grammar)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Kind tag: the structured kind, or one of `list`, `empty`, `atom`.
    pub fn kind(&self, id: NodeId) -> &str {
        match &self[id] {
            Node::Empty => EMPTY_KIND,
            Node::Atom(_) => ATOM_KIND,
            Node::List(_) => LIST_KIND,
            Node::Structured { kind, .. } => kind,
        }
    }

    pub fn is_empty(&self, id: NodeId) -> bool {
        matches!(self[id], Node::Empty)
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        matches!(self[id], Node::List(_))
    }

    pub fn is_atomic(&self, id: NodeId) -> bool {
        matches!(self[id], Node::Atom(_))
    }

    pub fn atom(&self, id: NodeId) -> Option<&Atom> {
        match &self[id] {
            Node::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// String payload of an atomic leaf.
    pub fn atom_str(&self, id: NodeId) -> Option<&str> {
        self.atom(id).and_then(Atom::as_str)
    }

    pub fn list_items(&self, id: NodeId) -> Option<&[NodeId]> {
        match &self[id] {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// Ordered `(label, child)` pairs.
    pub fn children(&self, id: NodeId) -> Vec<(Label<'_>, NodeId)> {
        match &self[id] {
            Node::Empty | Node::Atom(_) => Vec::new(),
            Node::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, child)| (Label::Index(i), *child))
                .collect(),
            Node::Structured { kind, fields } => match self.grammar.get(kind) {
                Some(spec) => spec
                    .fields
                    .iter()
                    .zip(fields)
                    .map(|(name, child)| (Label::Field(name.as_str()), *child))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// Child stored under `field` of a structured node.
    pub fn child(&self, id: NodeId, field: &str) -> Option<NodeId> {
        match &self[id] {
            Node::Structured { kind, fields } => {
                let position = self.grammar.get(kind)?.position(field)?;
                fields.get(position).copied()
            }
            _ => None,
        }
    }

    /// Items of the list stored under `field`, empty when the field is missing or not a list.
    pub fn child_items(&self, id: NodeId, field: &str) -> Vec<NodeId> {
        self.child(id, field)
            .and_then(|child| self.list_items(child))
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default()
    }

    /// Preorder walk starting at (and including) `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.iter().rev().map(|(_, child)| *child));
        }
        out
    }

    /// Children-first walk from `id`, visiting children in label order.
    ///
    /// This is the order `import` allocates nodes in.
    pub fn postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((next, expanded)) = stack.pop() {
            if expanded {
                out.push(next);
                continue;
            }
            stack.push((next, true));
            let children = self.children(next);
            stack.extend(children.iter().rev().map(|(_, child)| (*child, false)));
        }
        out
    }

    /// True for a non-empty list whose items are all statements.
    pub fn is_statement_block(&self, id: NodeId) -> bool {
        match &self[id] {
            Node::List(items) => {
                !items.is_empty()
                    && items
                        .iter()
                        .all(|item| self.grammar.is_statement(self.kind(*item)))
            }
            _ => false,
        }
    }

    /// Every statement block reachable from `root`, outermost first.
    pub fn statement_blocks(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.is_statement_block(*id))
            .collect()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Drops every node allocated after `checkpoint`.
    ///
    /// Nodes older than the checkpoint must not reference transient ones; transient nodes are
    /// only ever referenced by other transient nodes.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.nodes.truncate(checkpoint.0);
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}
