use braid_analysis::{AutoMarker, NoInteraction};
use braid_core::marking::{BreakSet, BreakType, Marking, MarkingStore, ScopeMap, VarMap, VarScope};
use braid_core::seed::Seed;
use braid_core::tree::NodeId;
use braid_tests::{assign, bundle, call, constant, init_tracing, statements};
use braid_transform::reorder::valuers::WriteUse;
use braid_transform::reorder::{ReorderConfig, Reorderer};
use braid_transform::statement_shuffle::Reorder;
use braid_transform::Transform;

fn vars(names: &[&str]) -> VarMap {
    names.iter().map(|n| (*n, VarScope::Unknown)).collect()
}

/// Stores a complete set of reordering markings for `node`.
fn mark(
    store: &mut MarkingStore,
    node: NodeId,
    reads: &[&str],
    writes: &[&str],
    breaks: &[BreakType],
) {
    store.set(node, Marking::Visible(false));
    store.set(node, Marking::Breaks(breaks.iter().copied().collect::<BreakSet>()));
    store.set(node, Marking::Reads(vars(reads)));
    store.set(node, Marking::Writes(vars(writes)));
    store.set(node, Marking::Scope(ScopeMap::new()));
}

/// Four placeholder statements: `x` and `y` are each written once and read once.
fn crossed_block() -> (braid_core::bundle::AstBundle, Vec<NodeId>) {
    let mut b = bundle(vec![
        assign("s0", constant(0)),
        assign("s1", constant(1)),
        assign("s2", constant(2)),
        assign("s3", constant(3)),
    ]);
    let ids = statements(&b);
    mark(&mut b.markings, ids[0], &[], &["x"], &[]);
    mark(&mut b.markings, ids[1], &[], &["y"], &[]);
    mark(&mut b.markings, ids[2], &["x"], &[], &[]);
    mark(&mut b.markings, ids[3], &["y"], &[], &[]);
    (b, ids)
}

/// Tests that independent statements may take any order.
#[test]
fn test_independent_statements_permute_freely() {
    init_tracing();
    let mut b = bundle(vec![
        assign("a", constant(1)),
        assign("b", constant(2)),
        assign("c", constant(3)),
    ]);
    AutoMarker::python()
        .mark_bundle(&mut b, &mut NoInteraction)
        .unwrap();
    let ids = statements(&b);

    let reorderer = Reorderer::new(&b.markings, &ids);
    assert!(reorderer.check_markings(), "Markup should cover every statement");
    assert_eq!(reorderer.partition(), Some(vec![0..3]));
    assert_eq!(reorderer.count(), Some(6), "Three free statements have 3! orders");
    assert_eq!(reorderer.unique_count(), Some(6));
}

/// Tests that a write stays in front of the reads it feeds.
#[test]
fn test_dependencies_restrict_orders() {
    init_tracing();
    let mut b = bundle(vec![
        assign("s0", constant(0)),
        assign("s1", constant(1)),
        assign("s2", constant(2)),
    ]);
    let ids = statements(&b);
    mark(&mut b.markings, ids[0], &[], &["x"], &[]);
    mark(&mut b.markings, ids[1], &["x"], &["y"], &[]);
    mark(&mut b.markings, ids[2], &[], &["z"], &[]);

    let config = ReorderConfig {
        safe: true,
        ..ReorderConfig::default()
    };
    let reorderer = Reorderer::new(&b.markings, &ids).with_config(config);
    let candidates: Vec<Vec<usize>> = reorderer.permutations().unwrap().collect();
    assert_eq!(candidates.len(), 3, "s2 may go anywhere around s0 -> s1");
    for perm in &candidates {
        assert!(reorderer.is_valid(perm), "Invalid candidate {perm:?}");
        let first = perm.iter().position(|i| *i == 0).unwrap();
        let second = perm.iter().position(|i| *i == 1).unwrap();
        assert!(first < second, "s0 must precede s1 in {perm:?}");
    }
    assert!(!reorderer.is_valid(&[1, 0, 2]));
}

/// Tests that breaking statements pin the partitions around them.
#[test]
fn test_breaking_statements_split_partitions() {
    init_tracing();
    let mut b = bundle(vec![
        assign("a", constant(1)),
        call("stop", &[]),
        assign("b", constant(2)),
    ]);
    let ids = statements(&b);
    mark(&mut b.markings, ids[0], &[], &["a"], &[]);
    mark(&mut b.markings, ids[1], &[], &[], &[BreakType::Return]);
    mark(&mut b.markings, ids[2], &[], &["b"], &[]);

    let reorderer = Reorderer::new(&b.markings, &ids);
    assert_eq!(reorderer.partition(), Some(vec![0..1, 1..2, 2..3]));
    assert_eq!(reorderer.count(), Some(1), "Only the original order remains");
}

/// Tests that missing markings disable the reorderer until they are filled.
#[test]
fn test_incomplete_markings_are_filled_pessimistically() {
    init_tracing();
    let mut b = bundle(vec![assign("a", constant(1)), assign("b", constant(2))]);
    let ids = statements(&b);
    mark(&mut b.markings, ids[0], &[], &["a"], &[]);

    assert!(!Reorderer::new(&b.markings, &ids).check_markings());
    assert_eq!(Reorderer::new(&b.markings, &ids).count(), None);

    let filled = Reorderer::fill_markings(&mut b.markings, &ids);
    assert_eq!(filled, 5, "Every required kind of the second statement");
    let reorderer = Reorderer::new(&b.markings, &ids);
    assert!(reorderer.check_markings());
    assert_eq!(reorderer.count(), Some(1), "A breaking fallback pins the block");
}

/// Tests that the best candidate under the write-use valuer keeps live ranges short.
#[test]
fn test_best_permutation_shortens_live_ranges() {
    init_tracing();
    let (b, ids) = crossed_block();
    let reorderer = Reorderer::new(&b.markings, &ids);
    assert_eq!(reorderer.count(), Some(6));

    let best = reorderer.best_permutation(&mut WriteUse).unwrap();
    assert!(
        best == [0, 2, 1, 3] || best == [1, 3, 0, 2],
        "Unexpected best ordering {best:?}"
    );
}

/// Tests the reorder transform on a marked bundle.
#[test]
fn test_reorder_transform_rewrites_block() {
    init_tracing();
    let (mut b, ids) = crossed_block();
    let nodes = b.tree.node_count();
    let seed = Seed::generate();
    let mut rng = seed.create_deterministic_rng();

    let changed = Reorder::new("rwrange").apply(&mut b, &mut rng).unwrap();
    assert!(changed, "The original order is not the best one");

    let reordered = statements(&b);
    let expected_a = vec![ids[0], ids[2], ids[1], ids[3]];
    let expected_b = vec![ids[1], ids[3], ids[0], ids[2]];
    assert!(reordered == expected_a || reordered == expected_b);
    assert_eq!(b.tree.node_count(), nodes, "Reordering adds no nodes");
}

/// Tests that blocks without markings are left alone.
#[test]
fn test_reorder_transform_skips_unmarked_blocks() {
    init_tracing();
    let mut b = bundle(vec![assign("a", constant(1)), assign("b", constant(2))]);
    let before = statements(&b);
    let mut rng = Seed::generate().create_deterministic_rng();

    let changed = Reorder::default().apply(&mut b, &mut rng).unwrap();
    assert!(!changed);
    assert_eq!(statements(&b), before);
}
