//! A tree together with its root and markings: the unit every transform works on.

use crate::ast::Ast;
use crate::grammar::Grammar;
use crate::marking::{MarkingStore, Markings};
use crate::result::Result;
use crate::tree::{NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bundle handed to the analysis and every transform.
#[derive(Debug, Clone)]
pub struct AstBundle {
    pub tree: Tree,
    pub root: NodeId,
    pub markings: MarkingStore,
}

/// Durable form of a bundle: the exported tree plus markings keyed by canonical ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundleFile {
    tree: Ast,
    #[serde(default)]
    markings: MarkingStore,
}

impl AstBundle {
    /// Imports a tree without markings.
    pub fn from_ast(grammar: Grammar, ast: &Ast) -> Result<Self> {
        let (tree, root) = Tree::from_ast(grammar, ast)?;
        Ok(Self {
            tree,
            root,
            markings: MarkingStore::new(),
        })
    }

    /// Reads either a bare front-end tree or a saved `{tree, markings}` bundle.
    pub fn from_json(grammar: Grammar, json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let is_bundle = value
            .as_object()
            .is_some_and(|map| map.contains_key("tree") && !map.contains_key("_type"));
        if !is_bundle {
            return Self::from_ast(grammar, &Ast::from_value(&value)?);
        }
        let file: BundleFile = serde_json::from_value(value)?;
        let mut bundle = Self::from_ast(grammar, &file.tree)?;
        let ids = bundle.tree.postorder(bundle.root);
        for (node, markings) in file.markings.iter() {
            if let Some(id) = ids.get(node.index()) {
                bundle.markings.set_all(*id, markings);
            }
        }
        Ok(bundle)
    }

    /// Saves the tree reachable from the root and its markings.
    ///
    /// Node ids are renumbered to the order a fresh import allocates them in, so nodes that are
    /// no longer reachable and their markings are dropped.
    pub fn to_json(&self) -> Result<String> {
        let canonical: HashMap<NodeId, NodeId> = self
            .tree
            .postorder(self.root)
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, NodeId::new(i)))
            .collect();
        let mut markings = MarkingStore::new();
        for (node, stored) in self.markings.iter() {
            if let Some(id) = canonical.get(&node) {
                markings.set_all(*id, stored);
            }
        }
        let file = BundleFile {
            tree: self.tree.export(self.root),
            markings,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Markings stored for `node`, if any.
    pub fn markings_of(&self, node: NodeId) -> Option<&Markings> {
        self.markings.get(node)
    }
}
