use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_core::marking::{Marking, ReadsMark, VarMap, VarScope};
use braid_tests::{assign, bundle, call, constant, module, statements};

#[test]
fn test_export_reproduces_front_end_json() {
    let source = module(vec![assign("x", constant(1)), call("print", &["x"])]);
    let bundle = bundle(vec![assign("x", constant(1)), call("print", &["x"])]);
    let exported = bundle.tree.export(bundle.root);
    assert_eq!(exported.to_value(), source);
}

#[test]
fn test_unknown_kinds_are_rejected() {
    let json = serde_json::json!({"_type": "Module", "body": [{"_type": "Goto", "label": "x"}]});
    assert!(AstBundle::from_json(Grammar::python(), &json.to_string()).is_err());
}

#[test]
fn test_markings_survive_save_and_load() {
    let mut bundle = bundle(vec![assign("x", constant(1)), call("print", &["x"])]);
    let ids = statements(&bundle);
    let (first, second) = (ids[0], ids[1]);
    bundle
        .markings
        .marker::<ReadsMark>(second)
        .add("x", VarScope::Global);
    bundle.markings.set(first, Marking::Visible(false));

    let saved = bundle.to_json().unwrap();
    let loaded = AstBundle::from_json(Grammar::python(), &saved).unwrap();
    let ids = statements(&loaded);
    let (first, second) = (ids[0], ids[1]);
    let reads: VarMap = loaded.markings.read::<ReadsMark>(second);
    assert_eq!(reads.get("x"), Some(VarScope::Global));
    assert_eq!(loaded.markings.get(first).and_then(|m| m.visible()), Some(false));
}
