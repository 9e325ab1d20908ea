//! Node construction for the branch shapes.

use super::collection::Predicate;
use braid_core::tree::{NodeId, Tree};
use braid_core::Result;

pub(super) fn name(tree: &mut Tree, id: &str, ctx: &str) -> Result<NodeId> {
    let id = tree.add_str(id);
    let ctx = tree.add_unit(ctx)?;
    tree.add_node("Name", [("id", id), ("ctx", ctx)])
}

/// `pkg.mod.Error` as a chain of attribute loads.
pub(super) fn dotted(tree: &mut Tree, path: &str) -> Result<NodeId> {
    let mut parts = path.split('.');
    let mut value = name(tree, parts.next().unwrap_or_default(), "Load")?;
    for attr in parts {
        let attr = tree.add_str(attr);
        let ctx = tree.add_unit("Load")?;
        value = tree.add_node("Attribute", [("value", value), ("attr", attr), ("ctx", ctx)])?;
    }
    Ok(value)
}

/// `target = value`
pub(super) fn assign(tree: &mut Tree, target: &str, value: NodeId) -> Result<NodeId> {
    let target = name(tree, target, "Store")?;
    let targets = tree.add_list(vec![target]);
    tree.add_node("Assign", [("targets", targets), ("value", value)])
}

/// The predicate, negated when it is expected to be false.
pub(super) fn guard(tree: &mut Tree, predicate: &Predicate) -> Result<NodeId> {
    let expr = tree.import(&predicate.expr)?;
    if predicate.truth {
        return Ok(expr);
    }
    let not = tree.add_unit("Not")?;
    tree.add_node("UnaryOp", [("op", not), ("operand", expr)])
}

pub(super) fn if_stmt(
    tree: &mut Tree,
    test: NodeId,
    body: Vec<NodeId>,
    orelse: Vec<NodeId>,
) -> Result<NodeId> {
    let body = tree.add_list(body);
    let orelse = tree.add_list(orelse);
    tree.add_node("If", [("test", test), ("body", body), ("orelse", orelse)])
}

pub(super) fn while_stmt(tree: &mut Tree, test: NodeId, body: Vec<NodeId>) -> Result<NodeId> {
    let body = tree.add_list(body);
    let orelse = tree.add_list(Vec::new());
    tree.add_node("While", [("test", test), ("body", body), ("orelse", orelse)])
}

/// `try: body except (types): handler else: orelse`
pub(super) fn try_stmt(
    tree: &mut Tree,
    body: Vec<NodeId>,
    types: &[String],
    handler: Vec<NodeId>,
    orelse: Vec<NodeId>,
) -> Result<NodeId> {
    let caught = match types {
        [single] => dotted(tree, single)?,
        _ => {
            let elts = types
                .iter()
                .map(|t| dotted(tree, t))
                .collect::<Result<Vec<_>>>()?;
            let elts = tree.add_list(elts);
            let ctx = tree.add_unit("Load")?;
            tree.add_node("Tuple", [("elts", elts), ("ctx", ctx)])?
        }
    };
    let handler_body = tree.add_list(handler);
    let handler = tree.add_node("ExceptHandler", [("type", caught), ("body", handler_body)])?;

    let body = tree.add_list(body);
    let handlers = tree.add_list(vec![handler]);
    let orelse = tree.add_list(orelse);
    let finalbody = tree.add_list(Vec::new());
    tree.add_node(
        "Try",
        [
            ("body", body),
            ("handlers", handlers),
            ("orelse", orelse),
            ("finalbody", finalbody),
        ],
    )
}

pub(super) fn pass(tree: &mut Tree) -> Result<NodeId> {
    tree.add_unit("Pass")
}
