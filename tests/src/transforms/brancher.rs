use braid_core::ast::Ast;
use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_core::marking::{BreakType, Marking};
use braid_core::seed::Seed;
use braid_tests::{add, assign, bundle, constant, init_tracing, name, statements};
use braid_transform::branch_insert::Branch;
use braid_transform::brancher::{
    BranchKind, Brancher, BrancherSet, ExceptionStatement, Expression, Predicate, Region,
    SimpleStatement,
};
use braid_transform::Transform;
use serde_json::{json, Value};

fn ast(value: Value) -> Ast {
    Ast::from_value(&value).unwrap()
}

/// `s` counter brancher with one entry in every collection.
fn counter() -> Brancher {
    let g = Grammar::python();
    let mut b = Brancher::new("counter", "s").unwrap();
    b.initial_mut().insert(&g, Expression(ast(constant(0)))).unwrap();
    b.predicates_mut()
        .insert(
            &g,
            Predicate {
                expr: ast(json!({
                    "_type": "Compare",
                    "left": name("s", "Load"),
                    "ops": [{"_type": "Eq"}],
                    "comparators": [constant(0)]
                })),
                truth: true,
            },
        )
        .unwrap();
    b.exceptions_mut()
        .insert(
            &g,
            ExceptionStatement {
                stmt: ast(json!({
                    "_type": "Expr",
                    "value": {
                        "_type": "BinOp",
                        "left": constant(1),
                        "op": {"_type": "Div"},
                        "right": name("s", "Load")
                    }
                })),
                raises: true,
                types: vec!["ZeroDivisionError".to_string()],
            },
        )
        .unwrap();
    b.preserving_mut()
        .insert(&g, SimpleStatement(ast(assign("s", add(name("s", "Load"), constant(0))))))
        .unwrap();
    b.randomising_mut()
        .insert(&g, SimpleStatement(ast(assign("s", constant(7)))))
        .unwrap();
    b.destroying_mut()
        .insert(&g, SimpleStatement(ast(assign("s", constant(1)))))
        .unwrap();
    b
}

fn sample() -> AstBundle {
    bundle(vec![
        assign("a", constant(1)),
        assign("b", constant(2)),
        assign("c", constant(3)),
    ])
}

/// Tests that an if-branch wraps exactly the requested region.
#[test]
fn test_if_branch_wraps_region() {
    init_tracing();
    let mut b = sample();
    let ids = statements(&b);
    let mut rng = Seed::generate().create_deterministic_rng();

    let outcome = counter()
        .branch(
            BranchKind::If,
            &mut b.tree,
            &b.markings,
            &ids,
            Region::Range { start: 0, end: 2 },
            &mut rng,
        )
        .unwrap()
        .expect("every collection is filled");
    assert!(outcome.success);

    let out = &outcome.statements;
    assert_eq!(out.len(), 4, "init, preserving statement, if, untouched tail");
    assert_eq!(b.tree.kind(out[0]), "Assign");
    assert_eq!(b.tree.kind(out[2]), "If");
    assert_eq!(out[3], ids[2]);
    let body = b.tree.child(out[2], "body").unwrap();
    assert_eq!(b.tree.list_items(body).unwrap(), &ids[..2]);
}

/// Tests that an if-else branch duplicates the region into both arms.
#[test]
fn test_ifelse_branch_copies_region() {
    init_tracing();
    let mut b = sample();
    let ids = statements(&b);
    let mut rng = Seed::generate().create_deterministic_rng();

    let outcome = counter()
        .ifelse_branch(&mut b.tree, &ids, Region::Range { start: 1, end: 3 }, &mut rng)
        .unwrap()
        .unwrap();
    let branch = outcome.statements[3];
    assert_eq!(b.tree.kind(branch), "If");
    let body = b.tree.child(branch, "body").unwrap();
    let orelse = b.tree.child(branch, "orelse").unwrap();
    let body = b.tree.list_items(body).unwrap().to_vec();
    let orelse = b.tree.list_items(orelse).unwrap().to_vec();
    assert_eq!(body, ids[1..].to_vec());
    assert_eq!(orelse.len(), 2);
    assert!(orelse.iter().all(|s| !ids.contains(s)), "The else arm holds copies");
}

/// Tests that a raising exception statement runs the region in its handler.
#[test]
fn test_except_branch_guards_region() {
    init_tracing();
    let mut b = sample();
    let ids = statements(&b);
    let mut rng = Seed::generate().create_deterministic_rng();

    let outcome = counter()
        .except_branch(&mut b.tree, &ids, Region::Range { start: 0, end: 3 }, &mut rng)
        .unwrap()
        .unwrap();
    assert_eq!(outcome.statements.len(), 2);
    let guarded = outcome.statements[1];
    assert_eq!(b.tree.kind(guarded), "Try");
    let handlers = b.tree.child(guarded, "handlers").unwrap();
    let handler = b.tree.list_items(handlers).unwrap()[0];
    let handler_body = b.tree.child(handler, "body").unwrap();
    assert_eq!(b.tree.list_items(handler_body).unwrap(), ids.as_slice());
}

/// Tests that loops are never wrapped around statements that may break.
#[test]
fn test_while_branch_refuses_breaking_statements() {
    init_tracing();
    let mut b = sample();
    let ids = statements(&b);
    b.markings.set(
        ids[1],
        Marking::Breaks([BreakType::Continue].into_iter().collect()),
    );
    let mut rng = Seed::generate().create_deterministic_rng();
    let brancher = counter();

    let refused = brancher
        .while_branch(&mut b.tree, &b.markings, &ids, Region::Range { start: 0, end: 2 }, &mut rng)
        .unwrap()
        .unwrap();
    assert!(!refused.success);
    assert_eq!(refused.statements, ids);

    let accepted = brancher
        .while_branch(&mut b.tree, &b.markings, &ids, Region::Range { start: 2, end: 3 }, &mut rng)
        .unwrap()
        .unwrap();
    assert!(accepted.success);
    assert_eq!(b.tree.kind(accepted.statements[3]), "While");
}

/// Tests that the branch transform inserts branches and the result saves cleanly.
#[test]
fn test_branch_transform_on_bundle() {
    init_tracing();
    let mut set = BrancherSet::new();
    set.add(counter()).unwrap();
    let mut b = sample();
    let before = b.tree.statement_blocks(b.root).len();
    let mut rng = Seed::generate().create_deterministic_rng();

    let changed = Branch::new(set, 1.0).apply(&mut b, &mut rng).unwrap();
    assert!(changed, "A fully stocked brancher always succeeds on unmarked statements");
    assert!(b.tree.statement_blocks(b.root).len() > before, "The branch adds a block");

    let saved = b.to_json().unwrap();
    let loaded = AstBundle::from_json(Grammar::python(), &saved).unwrap();
    assert_eq!(
        loaded.tree.statement_blocks(loaded.root).len(),
        b.tree.statement_blocks(b.root).len()
    );
}

/// Tests that a catalog survives a save and load through JSON.
#[test]
fn test_catalog_round_trip() {
    let mut set = BrancherSet::new();
    set.add(counter()).unwrap();
    assert!(set.add(Brancher::new("counter", "t").unwrap()).is_err());

    let loaded = BrancherSet::from_json(&Grammar::python(), &set.to_json().unwrap()).unwrap();
    assert_eq!(loaded, set);
    let brancher = loaded.get("counter").unwrap();
    assert!(BranchKind::ALL
        .into_iter()
        .all(|kind| brancher.availability(kind) == Some(true)));
}
