//! Fixtures shared by the integration tests: Python-shaped JSON builders and tracing setup.

use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_core::tree::NodeId;
use serde_json::{json, Value};

/// Installs a debug-level subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_test_writer()
        .try_init();
}

pub fn name(id: &str, ctx: &str) -> Value {
    json!({"_type": "Name", "id": id, "ctx": {"_type": ctx}})
}

pub fn constant(value: i64) -> Value {
    json!({"_type": "Constant", "value": value, "kind": null})
}

/// `target = value`
pub fn assign(target: &str, value: Value) -> Value {
    json!({
        "_type": "Assign",
        "targets": [name(target, "Store")],
        "value": value,
        "type_comment": null
    })
}

/// `left + right`
pub fn add(left: Value, right: Value) -> Value {
    json!({"_type": "BinOp", "left": left, "op": {"_type": "Add"}, "right": right})
}

/// `func(args...)` as an expression statement.
pub fn call(func: &str, args: &[&str]) -> Value {
    let args: Vec<Value> = args.iter().map(|a| name(a, "Load")).collect();
    json!({
        "_type": "Expr",
        "value": {"_type": "Call", "func": name(func, "Load"), "args": args, "keywords": []}
    })
}

pub fn module(body: Vec<Value>) -> Value {
    json!({"_type": "Module", "body": body, "type_ignores": []})
}

/// Bundle of a module with the given top-level statements.
pub fn bundle(body: Vec<Value>) -> AstBundle {
    AstBundle::from_json(Grammar::python(), &module(body).to_string()).unwrap()
}

/// Top-level statements of a module bundle.
pub fn statements(bundle: &AstBundle) -> Vec<NodeId> {
    let body = bundle.tree.child(bundle.root, "body").unwrap();
    bundle.tree.list_items(body).unwrap().to_vec()
}
