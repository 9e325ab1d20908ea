//! Rule table for the Python 3 abstract grammar.

use super::rules::{Adjust, LeafRule, Rewrite, RewriteRule, Rule, RuleTable};
use braid_core::marking::{BreakType, DeclScope, MarkKind};

use BreakType::{Break, Continue, Except, Return, Yield};
use MarkKind::{Breaks, IndirectRw, Reads, Scope, Visible, Writes};

fn leaf(children: &[&str]) -> LeafRule {
    LeafRule::of(children)
}

/// Leaf that adds `except`: evaluation may raise.
fn raising(children: &[&str]) -> Rule {
    leaf(children).with(Adjust::AddBreak(Except)).into()
}

/// Loop body: `break` and `continue` only leave the loop itself.
fn loop_body(field: &str) -> Rule {
    leaf(&[field])
        .with(Adjust::RemoveBreak(Break))
        .with(Adjust::RemoveBreak(Continue))
        .into()
}

fn either(a: &str, b: &str) -> Rule {
    Rule::AnyOf(vec![leaf(&[a]).into(), leaf(&[b]).into()])
}

fn decorated(otherwise: Rule) -> Rule {
    Rule::Rewrite(RewriteRule {
        rewrite: Rewrite::DecoratedDefinition {
            decorators: "decorator_list".into(),
            name: "name".into(),
        },
        otherwise: Some(Box::new(otherwise)),
    })
}

/// Definition of a function-like scope: defining it evaluates `evaluated` and binds `binds`,
/// while the body only contributes indirect accesses.
fn scope_definition(evaluated: &[&str], binds: Option<&str>, body: &str) -> Rule {
    let mut outer = leaf(evaluated).known(&[Visible, Breaks, Reads, Writes, Scope]);
    if let Some(name) = binds {
        outer = outer.with(Adjust::Binds { name: name.into() });
    }
    let inner = leaf(&[]).known(&[IndirectRw]).with(Adjust::EnclosedScope {
        body: body.into(),
        params: "args".into(),
    });
    Rule::AllOf(vec![outer.into(), inner.into()])
}

impl RuleTable {
    /// Default rules for Python 3 kinds, including the legacy kinds older front ends emit.
    ///
    /// Kinds whose runtime effect cannot be bounded from the tree alone (calls, imports, `with`,
    /// `await`) only answer the variable kinds; visibility and breaks fall through to later
    /// strategies. Generator expressions and operator nodes have no rule.
    pub fn python() -> Self {
        let mut t = RuleTable::new();
        let variables = [Reads, Writes, Scope, IndirectRw];

        // mod
        for kind in ["Module", "Interactive", "Expression"] {
            t.insert(kind, leaf(&["body"]));
        }

        // stmt
        let function = scope_definition(&["args", "returns"], Some("name"), "body");
        t.insert("FunctionDef", decorated(function.clone()));
        t.insert("AsyncFunctionDef", decorated(function));
        t.insert(
            "ClassDef",
            decorated(
                leaf(&["bases", "keywords", "body"])
                    .known(&[Visible, Breaks, Reads, Writes])
                    .with(Adjust::Binds {
                        name: "name".into(),
                    })
                    .into(),
            ),
        );
        t.insert("Return", leaf(&["value"]).with(Adjust::AddBreak(Return)));
        t.insert("Delete", leaf(&["targets"]));
        t.insert("Assign", leaf(&["value", "targets"]));
        t.insert(
            "AugAssign",
            Rule::Rewrite(RewriteRule {
                rewrite: Rewrite::AugmentedAssignment {
                    target: "target".into(),
                    op: "op".into(),
                    value: "value".into(),
                },
                otherwise: None,
            }),
        );
        t.insert("AnnAssign", leaf(&["annotation", "value", "target"]));
        for kind in ["For", "AsyncFor"] {
            t.insert(
                kind,
                Rule::Sequential(vec![
                    raising(&["iter", "target"]),
                    loop_body("body"),
                    leaf(&["orelse"]).into(),
                ]),
            );
        }
        t.insert(
            "While",
            Rule::Sequential(vec![
                leaf(&["test"]).into(),
                loop_body("body"),
                leaf(&["orelse"]).into(),
            ]),
        );
        t.insert(
            "If",
            Rule::Sequential(vec![leaf(&["test"]).into(), either("body", "orelse")]),
        );
        for kind in ["With", "AsyncWith"] {
            t.insert(kind, leaf(&["items", "body"]).known(&variables));
        }
        t.insert("Raise", raising(&["exc", "cause"]));
        let guarded = || -> Rule {
            leaf(&["body"])
                .with(Adjust::CatchAll {
                    handlers: "handlers".into(),
                })
                .into()
        };
        t.insert(
            "Try",
            Rule::Sequential(vec![
                guarded(),
                leaf(&["handlers", "orelse", "finalbody"]).into(),
            ]),
        );
        t.insert(
            "TryExcept",
            Rule::Sequential(vec![guarded(), leaf(&["handlers", "orelse"]).into()]),
        );
        t.insert("TryFinally", leaf(&["body", "finalbody"]));
        t.insert("Assert", raising(&["test", "msg"]));
        for kind in ["Import", "ImportFrom"] {
            t.insert(kind, leaf(&["names"]).known(&variables));
        }
        t.insert(
            "Global",
            leaf(&[]).with(Adjust::Declares {
                names: "names".into(),
                scope: DeclScope::Global,
            }),
        );
        t.insert(
            "Nonlocal",
            leaf(&[]).with(Adjust::Declares {
                names: "names".into(),
                scope: DeclScope::Nonlocal,
            }),
        );
        t.insert("Expr", leaf(&["value"]));
        t.insert("Pass", leaf(&[]));
        t.insert("Break", leaf(&[]).with(Adjust::AddBreak(Break)));
        t.insert("Continue", leaf(&[]).with(Adjust::AddBreak(Continue)));

        // expr
        t.insert("BoolOp", leaf(&["values"]));
        t.insert("NamedExpr", leaf(&["value", "target"]));
        t.insert("BinOp", raising(&["left", "right"]));
        t.insert("UnaryOp", raising(&["operand"]));
        t.insert("Lambda", scope_definition(&["args"], None, "body"));
        t.insert(
            "IfExp",
            Rule::Sequential(vec![leaf(&["test"]).into(), either("body", "orelse")]),
        );
        t.insert("Dict", leaf(&["keys", "values"]));
        t.insert("Set", leaf(&["elts"]));
        t.insert("ListComp", leaf(&["generators", "elt"]));
        t.insert("SetComp", leaf(&["generators", "elt"]));
        t.insert("DictComp", leaf(&["generators", "key", "value"]));
        t.insert("Await", leaf(&["value"]).known(&variables));
        for kind in ["Yield", "YieldFrom"] {
            t.insert(
                kind,
                leaf(&["value"])
                    .with(Adjust::AddBreak(Except))
                    .with(Adjust::AddBreak(Yield)),
            );
        }
        t.insert("Compare", raising(&["left", "comparators"]));
        t.insert("Call", leaf(&["func", "args", "keywords"]).known(&variables));
        t.insert("FormattedValue", raising(&["value", "format_spec"]));
        t.insert("JoinedStr", leaf(&["values"]));
        for kind in ["Constant", "Num", "Str", "Bytes", "NameConstant", "Ellipsis"] {
            t.insert(kind, leaf(&[]));
        }
        t.insert("Attribute", leaf(&["value", "ctx"]));
        t.insert("Subscript", leaf(&["value", "slice", "ctx"]));
        t.insert("Starred", leaf(&["value", "ctx"]));
        t.insert(
            "Name",
            leaf(&["ctx"]).with(Adjust::NameAccess {
                name: "id".into(),
                context: "ctx".into(),
            }),
        );
        for kind in ["List", "Tuple"] {
            t.insert(
                kind,
                leaf(&["elts", "ctx"]).with(Adjust::AddBreakWhen {
                    child: "ctx".into(),
                    kind: "Store".into(),
                    brk: Except,
                }),
            );
        }
        t.insert("Slice", leaf(&["lower", "upper", "step"]));
        t.insert("ExtSlice", leaf(&["dims"]));
        t.insert("Index", leaf(&["value"]));

        // expr_context: a missing name raises on load and delete
        t.insert("Load", raising(&[]));
        t.insert("Store", leaf(&[]));
        t.insert("Del", raising(&[]));

        // helpers
        t.insert("comprehension", raising(&["iter", "target", "ifs"]));
        t.insert(
            "ExceptHandler",
            leaf(&["type", "body"]).with(Adjust::Binds {
                name: "name".into(),
            }),
        );
        t.insert(
            "arguments",
            leaf(&[
                "posonlyargs",
                "args",
                "vararg",
                "kwonlyargs",
                "kw_defaults",
                "kwarg",
                "defaults",
            ]),
        );
        t.insert("arg", leaf(&["annotation"]));
        t.insert("keyword", leaf(&["value"]));
        t.insert(
            "alias",
            leaf(&[]).with(Adjust::BindsAlias {
                name: "name".into(),
                asname: "asname".into(),
            }),
        );
        t.insert("withitem", leaf(&["context_expr", "optional_vars"]));
        t
    }
}
