//! Construction, import and export of tree nodes.

use super::{Node, NodeId, Tree};
use crate::ast::{Ast, Atom};
use crate::grammar::Grammar;
use crate::result::{Error, Result};

impl Tree {
    /// Imports an owned tree, returning it together with its root.
    pub fn from_ast(grammar: Grammar, ast: &Ast) -> Result<(Tree, NodeId)> {
        let mut tree = Tree::new(grammar);
        let root = tree.import(ast)?;
        Ok((tree, root))
    }

    pub fn add_empty(&mut self) -> NodeId {
        self.push(Node::Empty)
    }

    pub fn add_atom(&mut self, atom: Atom) -> NodeId {
        self.push(Node::Atom(atom))
    }

    pub fn add_str(&mut self, value: impl Into<String>) -> NodeId {
        self.add_atom(Atom::Str(value.into()))
    }

    pub fn add_list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Node::List(items))
    }

    /// Adds a structured node, validating its kind and fields against the grammar.
    ///
    /// Fields the caller leaves out become empty nodes, so every structured node carries its
    /// kind's full field set.
    pub fn add_node<I, F>(&mut self, kind: &str, fields: I) -> Result<NodeId>
    where
        I: IntoIterator<Item = (F, NodeId)>,
        F: AsRef<str>,
    {
        let grammar = self.shared_grammar();
        let spec = grammar
            .get(kind)
            .ok_or_else(|| Error::UnknownNodeKind(kind.to_string()))?;
        let mut slots: Vec<Option<NodeId>> = vec![None; spec.fields.len()];
        for (field, child) in fields {
            let field = field.as_ref();
            if !self.contains(child) {
                return Err(Error::InvalidNode(child));
            }
            let position = spec.position(field).ok_or_else(|| Error::UnknownField {
                kind: kind.to_string(),
                field: field.to_string(),
            })?;
            slots[position] = Some(child);
        }
        let fields = slots
            .into_iter()
            .map(|slot| match slot {
                Some(child) => child,
                None => self.push(Node::Empty),
            })
            .collect();
        Ok(self.push(Node::Structured {
            kind: kind.to_string(),
            fields,
        }))
    }

    /// Adds a structured node without fields, such as a context or operator.
    pub fn add_unit(&mut self, kind: &str) -> Result<NodeId> {
        self.add_node(kind, std::iter::empty::<(&str, NodeId)>())
    }

    /// Concatenates `items` into a new list node.
    ///
    /// With `flatten`, list-typed items are spliced in by content instead of nested.
    pub fn build_list(&mut self, items: &[NodeId], flatten: bool) -> NodeId {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match (&self[*item], flatten) {
                (Node::List(inner), true) => out.extend(inner.iter().copied()),
                _ => out.push(*item),
            }
        }
        self.add_list(out)
    }

    /// Replaces the items of an existing list node.
    pub fn set_list(&mut self, id: NodeId, items: Vec<NodeId>) -> Result<()> {
        if let Some(invalid) = items.iter().find(|item| !self.contains(**item)) {
            return Err(Error::InvalidNode(*invalid));
        }
        match self.nodes.get_mut(id.index()) {
            Some(Node::List(current)) => {
                *current = items;
                Ok(())
            }
            Some(_) => Err(Error::NotAList(id)),
            None => Err(Error::InvalidNode(id)),
        }
    }

    /// Shallow copy of a structured node with one field replaced.
    pub fn with_field(&mut self, id: NodeId, field: &str, value: NodeId) -> Result<NodeId> {
        let (kind, mut fields) = match self.get(id) {
            Some(Node::Structured { kind, fields }) => (kind.clone(), fields.clone()),
            Some(_) => {
                return Err(Error::TypeViolation {
                    expected: "structured node",
                    found: self.kind(id).to_string(),
                })
            }
            None => return Err(Error::InvalidNode(id)),
        };
        let position = self
            .grammar
            .get(&kind)
            .and_then(|spec| spec.position(field))
            .ok_or_else(|| Error::UnknownField {
                kind: kind.clone(),
                field: field.to_string(),
            })?;
        fields[position] = value;
        Ok(self.push(Node::Structured { kind, fields }))
    }

    /// Copies the subtree under `id` into fresh nodes.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self[id].clone();
        let copy = match node {
            Node::Empty | Node::Atom(_) => node,
            Node::List(items) => Node::List(items.into_iter().map(|i| self.deep_copy(i)).collect()),
            Node::Structured { kind, fields } => Node::Structured {
                kind,
                fields: fields.into_iter().map(|f| self.deep_copy(f)).collect(),
            },
        };
        self.push(copy)
    }

    /// Imports an owned tree, validating every structured node against the grammar.
    pub fn import(&mut self, ast: &Ast) -> Result<NodeId> {
        match ast {
            Ast::Empty => Ok(self.add_empty()),
            Ast::Atom(atom) => Ok(self.add_atom(atom.clone())),
            Ast::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.import(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.add_list(items))
            }
            Ast::Node { kind, fields } => {
                let grammar = self.shared_grammar();
                let spec = grammar
                    .get(kind)
                    .ok_or_else(|| Error::UnknownNodeKind(kind.clone()))?;
                if let Some((field, _)) = fields
                    .iter()
                    .find(|(f, _)| spec.position(f).is_none() && !grammar.is_ignored(f))
                {
                    return Err(Error::UnknownField {
                        kind: kind.clone(),
                        field: field.clone(),
                    });
                }
                // Children are allocated in canonical field order, so importing an exported
                // tree reproduces the same ids as `Tree::postorder`.
                let mut children = Vec::with_capacity(spec.fields.len());
                for field in &spec.fields {
                    let child = match fields.iter().find(|(f, _)| f == field) {
                        Some((_, value)) => self.import(value)?,
                        None => self.add_empty(),
                    };
                    children.push((field.as_str(), child));
                }
                self.add_node(kind, children)
            }
        }
    }

    /// Exports the subtree under `id` to its owned form.
    pub fn export(&self, id: NodeId) -> Ast {
        match &self[id] {
            Node::Empty => Ast::Empty,
            Node::Atom(atom) => Ast::Atom(atom.clone()),
            Node::List(items) => Ast::List(items.iter().map(|i| self.export(*i)).collect()),
            Node::Structured { kind, .. } => Ast::Node {
                kind: kind.clone(),
                fields: self
                    .children(id)
                    .into_iter()
                    .map(|(label, child)| (label.to_string(), self.export(child)))
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree_of(value: serde_json::Value) -> (Tree, NodeId) {
        let ast = Ast::from_value(&value).unwrap();
        Tree::from_ast(Grammar::python(), &ast).unwrap()
    }

    #[test]
    fn missing_fields_become_empty() {
        let (tree, root) = tree_of(json!({"_type": "Return"}));
        let value = tree.child(root, "value").unwrap();
        assert!(tree.is_empty(value));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let ast = Ast::from_value(&json!({"_type": "Pass", "colour": 1})).unwrap();
        let err = Tree::from_ast(Grammar::python(), &ast).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn build_list_flattens_lists_on_request() {
        let (mut tree, _) = tree_of(json!(null));
        let a = tree.add_str("a");
        let b = tree.add_str("b");
        let inner = tree.add_list(vec![a, b]);
        let c = tree.add_str("c");

        let nested = tree.build_list(&[inner, c], false);
        assert_eq!(tree.list_items(nested), Some(&[inner, c][..]));

        let flat = tree.build_list(&[inner, c], true);
        assert_eq!(tree.list_items(flat), Some(&[a, b, c][..]));
    }

    #[test]
    fn deep_copy_allocates_distinct_nodes() {
        let (mut tree, root) = tree_of(json!({
            "_type": "Name", "id": "x", "ctx": {"_type": "Load"}
        }));
        let copy = tree.deep_copy(root);
        assert_ne!(copy, root);
        assert_eq!(tree.export(copy), tree.export(root));
        assert_ne!(tree.child(copy, "ctx"), tree.child(root, "ctx"));
    }

    #[test]
    fn rollback_discards_transient_nodes() {
        let (mut tree, root) = tree_of(json!({"_type": "Pass"}));
        let checkpoint = tree.checkpoint();
        let extra = tree.add_unit("Load").unwrap();
        assert!(checkpoint.is_transient(extra));
        assert!(!checkpoint.is_transient(root));
        tree.rollback(checkpoint);
        assert!(!tree.contains(extra));
        assert!(tree.contains(root));
    }
}
