//! Construction of the desugared forms used by rewrite rules.
//!
//! Every node built here is transient: the auto-marker rolls the arena back once the top-level
//! resolve returns.

use super::rules::Rewrite;
use braid_core::tree::{NodeId, Tree};
use braid_core::Result;

impl Rewrite {
    /// Builds the rewritten form of `node`, or `None` when the rewrite does not apply.
    pub fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<Option<NodeId>> {
        match self {
            Rewrite::DecoratedDefinition { decorators, name } => {
                decorated_definition(tree, node, decorators, name)
            }
            Rewrite::AugmentedAssignment { target, op, value } => {
                augmented_assignment(tree, node, target, op, value)
            }
        }
    }
}

fn name(tree: &mut Tree, id: &str, ctx: &str) -> Result<NodeId> {
    let id = tree.add_str(id);
    let ctx = tree.add_unit(ctx)?;
    tree.add_node("Name", [("id", id), ("ctx", ctx)])
}

fn decorated_definition(
    tree: &mut Tree,
    node: NodeId,
    decorators: &str,
    name_field: &str,
) -> Result<Option<NodeId>> {
    let decorator_list = tree.child_items(node, decorators);
    if decorator_list.is_empty() {
        return Ok(None);
    }
    let Some(defined) = tree
        .child(node, name_field)
        .and_then(|n| tree.atom_str(n))
        .map(str::to_string)
    else {
        return Ok(None);
    };

    let no_decorators = tree.add_list(Vec::new());
    let plain = tree.with_field(node, decorators, no_decorators)?;

    // The decorator closest to the definition is applied first.
    let mut calls = name(tree, &defined, "Load")?;
    for decorator in decorator_list.into_iter().rev() {
        let args = tree.add_list(vec![calls]);
        let keywords = tree.add_list(Vec::new());
        calls = tree.add_node(
            "Call",
            [("func", decorator), ("args", args), ("keywords", keywords)],
        )?;
    }
    let target = name(tree, &defined, "Store")?;
    let targets = tree.add_list(vec![target]);
    let assign = tree.add_node("Assign", [("targets", targets), ("value", calls)])?;
    Ok(Some(tree.add_list(vec![plain, assign])))
}

fn augmented_assignment(
    tree: &mut Tree,
    node: NodeId,
    target_field: &str,
    op_field: &str,
    value_field: &str,
) -> Result<Option<NodeId>> {
    let (Some(target), Some(op), Some(value)) = (
        tree.child(node, target_field),
        tree.child(node, op_field),
        tree.child(node, value_field),
    ) else {
        return Ok(None);
    };
    let has_ctx = tree
        .grammar()
        .get(tree.kind(target))
        .is_some_and(|spec| spec.position("ctx").is_some());
    if !has_ctx {
        return Ok(None);
    }

    let load = tree.add_unit("Load")?;
    let read_back = tree.with_field(target, "ctx", load)?;
    let combined = tree.add_node("BinOp", [("left", read_back), ("op", op), ("right", value)])?;
    let targets = tree.add_list(vec![target]);
    let assign = tree.add_node("Assign", [("targets", targets), ("value", combined)])?;
    Ok(Some(assign))
}
