use braid_analysis::automarker::{Adjust, LeafRule, Rule, RuleTable, Strategy};
use braid_analysis::{AutoMarker, Error, Interaction, MarkupConfig, NoInteraction, Resolution};
use braid_core::marking::{
    BreakType, IndirectAccess, IndirectScope, KindSet, MarkKind, Marking, Markings,
};
use braid_core::tree::{NodeId, Tree};
use braid_tests::{add, assign, bundle, call, constant, init_tracing, name, statements};
use serde_json::json;

fn kinds(list: &[MarkKind]) -> KindSet {
    list.iter().copied().collect()
}

/// Records the kind of every reviewed node and declines one kind.
#[derive(Default)]
struct Reviewer {
    seen: Vec<String>,
    decline: Option<&'static str>,
}

impl Interaction for Reviewer {
    fn review(&mut self, tree: &Tree, node: NodeId, _result: &Markings) -> bool {
        let kind = tree.kind(node).to_string();
        let accept = self.decline != Some(kind.as_str());
        self.seen.push(kind);
        accept
    }
}

/// Answers visibility for expression statements, or cancels every question.
struct Answer {
    cancel: bool,
}

impl Interaction for Answer {
    fn ask(
        &mut self,
        tree: &Tree,
        node: NodeId,
        wanted: &KindSet,
    ) -> Result<Markings, braid_analysis::automarker::Cancelled> {
        if self.cancel {
            return Err(braid_analysis::automarker::Cancelled);
        }
        let mut answer = Markings::new();
        if tree.kind(node) == "Expr" && wanted.contains(&MarkKind::Visible) {
            answer.insert(Marking::Visible(false));
        }
        Ok(answer)
    }
}

#[test]
fn test_assignment_markings() {
    init_tracing();
    let mut b = bundle(vec![
        assign("y", add(name("x", "Load"), constant(1))),
        assign("z", constant(2)),
    ]);
    let ids = statements(&b);
    let marker = AutoMarker::python();
    let all = MarkKind::all();

    let resolution = marker
        .resolve(&mut b.tree, &mut b.markings, ids[0], &all, &mut NoInteraction)
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert_eq!(markings.visible(), Some(false));
    assert!(markings.reads().unwrap().contains("x"));
    assert!(!markings.reads().unwrap().contains("y"));
    assert!(markings.writes().unwrap().contains("y"));
    assert!(markings.breaks().unwrap().contains(BreakType::Except));
    assert!(b.markings.has_all(ids[0], &all));

    let resolution = marker
        .resolve(&mut b.tree, &mut b.markings, ids[1], &all, &mut NoInteraction)
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert!(markings.writes().unwrap().contains("z"));
    assert!(!markings.breaks().unwrap().contains(BreakType::Except));
}

#[test]
fn test_calls_fall_back_to_visible() {
    init_tracing();
    let mut fresh = bundle(vec![call("print", &["x"])]);
    let statement = statements(&fresh)[0];
    let visible = kinds(&[MarkKind::Visible]);
    let marker = AutoMarker::python();

    let resolution = marker
        .resolve(&mut fresh.tree, &mut fresh.markings, statement, &visible, &mut NoInteraction)
        .unwrap();
    assert_eq!(resolution.markings().unwrap().visible(), Some(true));

    let mut known = bundle(vec![call("print", &["x"])]);
    let statement = statements(&known)[0];
    known.markings.set(statement, Marking::Visible(false));
    let resolution = marker
        .resolve(&mut known.tree, &mut known.markings, statement, &visible, &mut NoInteraction)
        .unwrap();
    assert_eq!(resolution.markings().unwrap().visible(), Some(false));
}

#[test]
fn test_review_sees_nested_nodes_last_to_first() {
    init_tracing();
    let mut b = bundle(vec![assign("y", name("x", "Load"))]);
    let statement = statements(&b)[0];
    let mut reviewer = Reviewer::default();

    let resolution = AutoMarker::python()
        .resolve(&mut b.tree, &mut b.markings, statement, &MarkKind::all(), &mut reviewer)
        .unwrap();
    assert!(!resolution.is_aborted());
    assert!(reviewer.seen.iter().any(|kind| kind == "Name"));
    assert_eq!(reviewer.seen.last().map(String::as_str), Some("Assign"));
}

#[test]
fn test_declined_review_commits_nothing() {
    init_tracing();
    let mut b = bundle(vec![assign("y", name("x", "Load"))]);
    let statement = statements(&b)[0];
    let mut reviewer = Reviewer {
        decline: Some("Name"),
        ..Reviewer::default()
    };

    let resolution = AutoMarker::python()
        .resolve(&mut b.tree, &mut b.markings, statement, &MarkKind::all(), &mut reviewer)
        .unwrap();
    assert_eq!(resolution, Resolution::Aborted);
    assert!(b.markings.is_empty());
}

#[test]
fn test_augmented_assignment_leaves_no_transient_nodes() {
    init_tracing();
    let mut b = bundle(vec![json!({
        "_type": "AugAssign",
        "target": name("x", "Store"),
        "op": {"_type": "Add"},
        "value": constant(1)
    })]);
    let statement = statements(&b)[0];
    let before = b.tree.node_count();

    let resolution = AutoMarker::python()
        .resolve(
            &mut b.tree,
            &mut b.markings,
            statement,
            &kinds(&[MarkKind::Reads, MarkKind::Writes]),
            &mut NoInteraction,
        )
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert!(markings.reads().unwrap().contains("x"));
    assert!(markings.writes().unwrap().contains("x"));

    assert_eq!(b.tree.node_count(), before);
    assert!(b.markings.iter().all(|(id, _)| b.tree.contains(id)));
    assert!(b.markings.has_all(statement, &kinds(&[MarkKind::Reads, MarkKind::Writes])));
}

#[test]
fn test_all_of_overlap_falls_back_to_defaults() {
    init_tracing();
    let mut overlapping = RuleTable::new();
    overlapping.insert(
        "Pass",
        Rule::AllOf(vec![
            LeafRule::of(&[]).known(&[MarkKind::Visible]).into(),
            LeafRule::of(&[]).known(&[MarkKind::Visible]).into(),
        ]),
    );
    let mut b = bundle(vec![json!({"_type": "Pass"})]);
    let statement = statements(&b)[0];
    let marker = AutoMarker::new(MarkupConfig::default(), overlapping).unwrap();
    let resolution = marker
        .resolve(
            &mut b.tree,
            &mut b.markings,
            statement,
            &kinds(&[MarkKind::Visible]),
            &mut NoInteraction,
        )
        .unwrap();
    assert_eq!(resolution.markings().unwrap().visible(), Some(true));

    let mut disjoint = RuleTable::new();
    disjoint.insert(
        "Pass",
        Rule::AllOf(vec![
            LeafRule::of(&[]).known(&[MarkKind::Visible]).into(),
            LeafRule::of(&[])
                .known(&[MarkKind::Breaks])
                .with(Adjust::AddBreak(BreakType::Return))
                .into(),
        ]),
    );
    let mut b = bundle(vec![json!({"_type": "Pass"})]);
    let statement = statements(&b)[0];
    let marker = AutoMarker::new(MarkupConfig::default(), disjoint).unwrap();
    let resolution = marker
        .resolve(
            &mut b.tree,
            &mut b.markings,
            statement,
            &kinds(&[MarkKind::Visible, MarkKind::Breaks]),
            &mut NoInteraction,
        )
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert_eq!(markings.visible(), Some(false));
    let breaks = markings.breaks().unwrap();
    assert!(breaks.contains(BreakType::Return));
    assert!(!breaks.contains(BreakType::Except));
}

#[test]
fn test_loop_absorbs_its_breaks() {
    init_tracing();
    let mut b = bundle(vec![json!({
        "_type": "For",
        "target": name("i", "Store"),
        "iter": name("xs", "Load"),
        "body": [{"_type": "Break"}],
        "orelse": [],
        "type_comment": null
    })]);
    let statement = statements(&b)[0];
    let wanted = kinds(&[MarkKind::Breaks, MarkKind::Reads, MarkKind::Writes]);

    let resolution = AutoMarker::python()
        .resolve(&mut b.tree, &mut b.markings, statement, &wanted, &mut NoInteraction)
        .unwrap();
    let markings = resolution.markings().unwrap();
    let breaks = markings.breaks().unwrap();
    assert!(breaks.contains(BreakType::Except));
    assert!(!breaks.contains(BreakType::Break));
    assert!(markings.reads().unwrap().contains("xs"));
    assert!(markings.writes().unwrap().contains("i"));

    // The nested break statement keeps its own marking.
    let body = b.tree.child(statement, "body").unwrap();
    let inner = b.tree.list_items(body).unwrap()[0];
    assert!(b.markings.get_kind(inner, MarkKind::Breaks).is_some_and(|m| {
        *m == Marking::Breaks([BreakType::Break].into_iter().collect())
    }));
}

#[test]
fn test_duplicate_strategies_are_rejected() {
    let config = MarkupConfig {
        order: vec![Strategy::Existing, Strategy::Computed, Strategy::Existing],
        ..MarkupConfig::default()
    };
    assert!(matches!(
        AutoMarker::new(config, RuleTable::python()),
        Err(Error::DuplicateStrategy(_))
    ));
    assert!(MarkupConfig::from_json(r#"{"order": ["computed", "computed"]}"#).is_err());
}

#[test]
fn test_interactive_answers_take_precedence() {
    init_tracing();
    let config = MarkupConfig {
        order: vec![Strategy::Existing, Strategy::Interactive, Strategy::Computed],
        ..MarkupConfig::default()
    };
    let marker = AutoMarker::new(config, RuleTable::python()).unwrap();
    let wanted = kinds(&[MarkKind::Visible, MarkKind::Reads]);

    let mut b = bundle(vec![call("print", &["x"])]);
    let statement = statements(&b)[0];
    let resolution = marker
        .resolve(&mut b.tree, &mut b.markings, statement, &wanted, &mut Answer { cancel: false })
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert_eq!(markings.visible(), Some(false));
    assert!(markings.reads().unwrap().contains("print"));
    assert!(markings.reads().unwrap().contains("x"));

    let mut b = bundle(vec![call("print", &["x"])]);
    let statement = statements(&b)[0];
    let resolution = marker
        .resolve(&mut b.tree, &mut b.markings, statement, &wanted, &mut Answer { cancel: true })
        .unwrap();
    assert!(resolution.is_aborted());
    assert!(b.markings.is_empty());
}

#[test]
fn test_function_body_contributes_indirect_accesses() {
    init_tracing();
    let arg = json!({"_type": "arg", "arg": "a", "annotation": null, "type_comment": null});
    let mut b = bundle(vec![json!({
        "_type": "FunctionDef",
        "name": "f",
        "args": {
            "_type": "arguments",
            "posonlyargs": [],
            "args": [arg],
            "vararg": null,
            "kwonlyargs": [],
            "kw_defaults": [],
            "kwarg": null,
            "defaults": []
        },
        "body": [
            {"_type": "Global", "names": ["g"]},
            assign("g", add(name("a", "Load"), name("b", "Load"))),
            assign("c", constant(1))
        ],
        "decorator_list": [],
        "returns": null,
        "type_comment": null
    })]);
    let statement = statements(&b)[0];

    let resolution = AutoMarker::python()
        .resolve(
            &mut b.tree,
            &mut b.markings,
            statement,
            &kinds(&[MarkKind::IndirectRw, MarkKind::Writes]),
            &mut NoInteraction,
        )
        .unwrap();
    let markings = resolution.markings().unwrap();
    assert!(markings.writes().unwrap().contains("f"));

    let indirect = markings.indirect().unwrap();
    assert_eq!(indirect.access("b", IndirectScope::Free).read, Some(true));
    assert_eq!(indirect.access("g", IndirectScope::Global).write, Some(true));
    assert_eq!(indirect.access("a", IndirectScope::Free), IndirectAccess::NONE);
    assert_eq!(indirect.access("c", IndirectScope::Free), IndirectAccess::NONE);
}

#[test]
fn test_mark_bundle_report() {
    init_tracing();
    let mut b = bundle(vec![assign("y", name("x", "Load")), call("print", &["y"])]);
    let report = AutoMarker::python()
        .mark_bundle(&mut b, &mut NoInteraction)
        .unwrap();
    assert_eq!(report.blocks, 1);
    assert_eq!(report.statements, 2);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.aborted, 0);

    let all = MarkKind::all();
    assert!(statements(&b).into_iter().all(|id| b.markings.has_all(id, &all)));
}
