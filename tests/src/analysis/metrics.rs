use braid_analysis::{collect_metrics, compare, AutoMarker, Error, Metrics, NoInteraction};
use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_tests::{add, assign, bundle, call, constant, init_tracing, name};
use serde_json::json;

/// Tests metrics for a flat module before and after markup.
#[test]
fn test_collect_metrics_flat_module() {
    init_tracing();
    let mut b = bundle(vec![
        assign("y", add(name("x", "Load"), constant(1))),
        call("print", &["y"]),
    ]);

    let metrics = collect_metrics(&b).expect("Metrics computation failed");
    assert_eq!(metrics.statement_count, 2, "Statement count mismatch");
    assert_eq!(metrics.block_count, 1, "Block count mismatch");
    assert_eq!(metrics.marked_statements, 0, "Nothing is marked yet");
    assert!(metrics.max_depth >= 5, "Assignments nest at least five levels");
    assert!(metrics.potency > 0.0, "Potency score should be positive");

    AutoMarker::python()
        .mark_bundle(&mut b, &mut NoInteraction)
        .unwrap();
    let marked = collect_metrics(&b).unwrap();
    assert_eq!(marked.marked_statements, 2, "Both statements should be marked");
    assert_eq!(marked.node_count, metrics.node_count, "Markup must not change the tree");
}

/// Tests that nested statement blocks are counted separately.
#[test]
fn test_collect_metrics_nested_blocks() {
    init_tracing();
    let flat = bundle(vec![assign("i", constant(0)), assign("j", constant(1))]);
    let nested = bundle(vec![json!({
        "_type": "For",
        "target": name("i", "Store"),
        "iter": name("xs", "Load"),
        "body": [assign("j", name("i", "Load")), call("print", &["j"])],
        "orelse": [],
        "type_comment": null
    })]);

    let flat = collect_metrics(&flat).unwrap();
    let nested = collect_metrics(&nested).unwrap();
    assert_eq!(nested.block_count, 2, "Loop body is its own block");
    assert_eq!(nested.statement_count, 3, "Statement count mismatch");
    assert!(nested.max_depth > flat.max_depth, "Loop body should nest deeper");
    assert!(nested.potency > flat.potency, "Nesting should raise potency");
}

/// Tests that a tree without nodes is rejected.
#[test]
fn test_collect_metrics_empty_tree() {
    let empty = AstBundle::from_json(Grammar::python(), "null").unwrap();
    assert!(matches!(collect_metrics(&empty), Err(Error::EmptyTree)));
}

/// Tests that growth is discounted from the potency gain.
#[test]
fn test_compare_discounts_growth() {
    let before = Metrics {
        node_count: 100,
        statement_count: 10,
        block_count: 2,
        max_depth: 8,
        marked_statements: 10,
        potency: 29.0,
    };
    let grown = Metrics {
        node_count: 140,
        statement_count: 14,
        block_count: 3,
        potency: 35.0,
        ..before.clone()
    };
    let delta = compare(&before, &grown);
    assert!((delta - 4.0).abs() < 1e-9, "6.0 gain minus 2.0 for 40 nodes, got {delta}");
    assert_eq!(compare(&before, &before), 0.0);
}
