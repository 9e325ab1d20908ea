use braid_core::ast::Ast;
use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_core::seed::Seed;
use braid_tests::{assign, bundle, constant, init_tracing, name, statements};
use braid_transform::branch_insert::Branch;
use braid_transform::brancher::{Brancher, BrancherSet, Expression, Predicate};
use braid_transform::obfuscator::{obfuscate, ObfuscationConfig};
use braid_transform::pass::{DefaultPass, Pass};
use braid_transform::statement_shuffle::Reorder;
use braid_transform::{PassConfig, Result, Transform};
use rand::rngs::StdRng;
use serde_json::json;

/// Appends a copy of the last top-level statement.
struct Duplicate;

impl Transform for Duplicate {
    fn name(&self) -> &'static str {
        "Duplicate"
    }

    fn apply(&self, bundle: &mut AstBundle, _rng: &mut StdRng) -> Result<bool> {
        let body = bundle.tree.child(bundle.root, "body").unwrap();
        let mut items = bundle.tree.list_items(body).unwrap().to_vec();
        let copy = bundle.tree.deep_copy(*items.last().unwrap());
        items.push(copy);
        bundle.tree.set_list(body, items)?;
        Ok(true)
    }
}

/// Reports no change.
struct Noop;

impl Transform for Noop {
    fn name(&self) -> &'static str {
        "Noop"
    }

    fn apply(&self, _bundle: &mut AstBundle, _rng: &mut StdRng) -> Result<bool> {
        Ok(false)
    }
}

fn sample() -> AstBundle {
    bundle(vec![
        assign("a", constant(1)),
        assign("b", constant(2)),
        assign("c", constant(3)),
    ])
}

fn catalog() -> BrancherSet {
    let g = Grammar::python();
    let mut b = Brancher::new("flag", "f").unwrap();
    b.initial_mut()
        .insert(&g, Expression(Ast::from_value(&constant(1)).unwrap()))
        .unwrap();
    b.predicates_mut()
        .insert(
            &g,
            Predicate {
                expr: Ast::from_value(&json!({
                    "_type": "Compare",
                    "left": name("f", "Load"),
                    "ops": [{"_type": "Gt"}],
                    "comparators": [constant(0)]
                }))
                .unwrap(),
                truth: true,
            },
        )
        .unwrap();
    let mut set = BrancherSet::new();
    set.add(b).unwrap();
    set
}

/// Tests that a conservative pass drops results below the acceptance threshold.
#[test]
fn test_pass_threshold_rejects_small_gains() {
    init_tracing();
    let seed = Seed::generate();
    let passes: Vec<Box<dyn Transform>> = vec![Box::new(Noop), Box::new(Duplicate)];

    let mut strict = sample();
    let conservative = DefaultPass::new(PassConfig {
        accept_threshold: 100.0,
        aggressive: false,
        ..PassConfig::default()
    });
    let applied = conservative.run(&mut strict, &passes, &seed).unwrap();
    assert!(applied.is_empty(), "Nothing reaches the threshold");
    assert_eq!(statements(&strict).len(), 3, "The rejected snapshot is discarded");

    let mut loose = sample();
    let applied = DefaultPass::default().run(&mut loose, &passes, &seed).unwrap();
    assert_eq!(applied, vec!["Duplicate".to_string()], "Unchanged results are never kept");
    assert_eq!(statements(&loose).len(), 4);
}

/// Tests the full pipeline: markup, branch insertion and the report.
#[test]
fn test_obfuscate_marks_and_branches() {
    init_tracing();
    let mut b = sample();
    let config = ObfuscationConfig {
        transforms: vec![Box::new(Reorder::default()), Box::new(Branch::new(catalog(), 1.0))],
        ..ObfuscationConfig::default()
    };

    let result = obfuscate(&mut b, config).unwrap();
    let markup = result.markup.expect("Markup runs by default");
    assert_eq!(markup.statements, 3);
    assert_eq!(markup.aborted, 0);
    assert!(result.transforms_applied.contains(&"Branch".to_string()));
    assert!(
        result.after.block_count > result.before.block_count,
        "Block count should increase"
    );
    assert!(result.after.node_count > result.before.node_count);
}

/// Tests that a fixed seed reproduces the same output.
#[test]
fn test_obfuscate_is_deterministic_per_seed() {
    init_tracing();
    let seed =
        Seed::from_hex("0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef")
            .unwrap();
    let run = || {
        let mut b = sample();
        let mut config = ObfuscationConfig::with_seed(seed.clone());
        config.transforms = vec![Box::new(Branch::new(catalog(), 1.0))];
        obfuscate(&mut b, config).unwrap();
        b.to_json().unwrap()
    };
    assert_eq!(run(), run());
}

/// Tests that skipping markup leaves the marking store empty.
#[test]
fn test_obfuscate_without_markup() {
    init_tracing();
    let mut b = sample();
    let config = ObfuscationConfig {
        mark: false,
        transforms: vec![Box::new(Reorder::default())],
        ..ObfuscationConfig::default()
    };

    let result = obfuscate(&mut b, config).unwrap();
    assert!(result.markup.is_none());
    assert!(result.transforms_applied.is_empty(), "Unmarked blocks are not reordered");
    assert_eq!(result.before.marked_statements, 0);
    assert!(b.markings.is_empty());
}
