//! Node kind table supplied alongside trees by the front end.
//!
//! A grammar fixes, for every structured kind, its category and its field set. Trees validate
//! every structured node against it on construction, and the branch catalog uses the categories
//! to enforce its expression/statement constraints.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Coarse category of a structured kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Statement,
    Expression,
    Other,
}

/// Field layout of one structured kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSpec {
    pub category: Category,
    /// All fields, in canonical order.
    pub fields: Vec<String>,
    /// Fields holding nested statement blocks.
    #[serde(default)]
    pub blocks: Vec<String>,
}

impl KindSpec {
    /// Returns the position of `field` in the canonical order.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }
}

/// Finite table of structured node kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    kinds: BTreeMap<String, KindSpec>,
    /// Attributes the front end may attach to any node and that carry no structure.
    #[serde(default)]
    ignored: BTreeSet<String>,
}

impl Grammar {
    /// Builds a grammar from explicit kind specs.
    pub fn new(kinds: BTreeMap<String, KindSpec>) -> Self {
        Self {
            kinds,
            ignored: BTreeSet::new(),
        }
    }

    /// Python 3 abstract grammar, including the legacy kinds older front ends still emit.
    pub fn python() -> Self {
        let kinds = PYTHON
            .iter()
            .map(|(kind, category, fields, blocks)| {
                (
                    kind.to_string(),
                    KindSpec {
                        category: *category,
                        fields: fields.iter().map(|f| f.to_string()).collect(),
                        blocks: blocks.iter().map(|f| f.to_string()).collect(),
                    },
                )
            })
            .collect();
        let ignored = ["lineno", "col_offset", "end_lineno", "end_col_offset"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        Self { kinds, ignored }
    }

    pub fn get(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn is_ignored(&self, attribute: &str) -> bool {
        self.ignored.contains(attribute)
    }

    pub fn category(&self, kind: &str) -> Option<Category> {
        self.kinds.get(kind).map(|spec| spec.category)
    }

    pub fn is_statement(&self, kind: &str) -> bool {
        self.category(kind) == Some(Category::Statement)
    }

    pub fn is_expression(&self, kind: &str) -> bool {
        self.category(kind) == Some(Category::Expression)
    }

    /// A simple statement is a statement kind without nested statement blocks.
    pub fn is_simple_statement(&self, kind: &str) -> bool {
        self.kinds
            .get(kind)
            .is_some_and(|spec| spec.category == Category::Statement && spec.blocks.is_empty())
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::python()
    }
}

type KindRow = (
    &'static str,
    Category,
    &'static [&'static str],
    &'static [&'static str],
);

use Category::{Expression as E, Other as O, Statement as S};

const PYTHON: &[KindRow] = &[
    // mod
    ("Module", O, &["body", "type_ignores"], &["body"]),
    ("Interactive", O, &["body"], &["body"]),
    ("Expression", O, &["body"], &[]),
    ("TypeIgnore", O, &["lineno", "tag"], &[]),
    // stmt
    (
        "FunctionDef",
        S,
        &["name", "args", "body", "decorator_list", "returns", "type_comment"],
        &["body"],
    ),
    (
        "AsyncFunctionDef",
        S,
        &["name", "args", "body", "decorator_list", "returns", "type_comment"],
        &["body"],
    ),
    (
        "ClassDef",
        S,
        &["name", "bases", "keywords", "body", "decorator_list"],
        &["body"],
    ),
    ("Return", S, &["value"], &[]),
    ("Delete", S, &["targets"], &[]),
    ("Assign", S, &["targets", "value", "type_comment"], &[]),
    ("AugAssign", S, &["target", "op", "value"], &[]),
    ("AnnAssign", S, &["target", "annotation", "value", "simple"], &[]),
    (
        "For",
        S,
        &["target", "iter", "body", "orelse", "type_comment"],
        &["body", "orelse"],
    ),
    (
        "AsyncFor",
        S,
        &["target", "iter", "body", "orelse", "type_comment"],
        &["body", "orelse"],
    ),
    ("While", S, &["test", "body", "orelse"], &["body", "orelse"]),
    ("If", S, &["test", "body", "orelse"], &["body", "orelse"]),
    ("With", S, &["items", "body", "type_comment"], &["body"]),
    ("AsyncWith", S, &["items", "body", "type_comment"], &["body"]),
    ("Raise", S, &["exc", "cause"], &[]),
    (
        "Try",
        S,
        &["body", "handlers", "orelse", "finalbody"],
        &["body", "handlers", "orelse", "finalbody"],
    ),
    (
        "TryExcept",
        S,
        &["body", "handlers", "orelse"],
        &["body", "handlers", "orelse"],
    ),
    ("TryFinally", S, &["body", "finalbody"], &["body", "finalbody"]),
    ("Assert", S, &["test", "msg"], &[]),
    ("Import", S, &["names"], &[]),
    ("ImportFrom", S, &["module", "names", "level"], &[]),
    ("Global", S, &["names"], &[]),
    ("Nonlocal", S, &["names"], &[]),
    ("Expr", S, &["value"], &[]),
    ("Pass", S, &[], &[]),
    ("Break", S, &[], &[]),
    ("Continue", S, &[], &[]),
    // expr
    ("BoolOp", E, &["op", "values"], &[]),
    ("NamedExpr", E, &["target", "value"], &[]),
    ("BinOp", E, &["left", "op", "right"], &[]),
    ("UnaryOp", E, &["op", "operand"], &[]),
    ("Lambda", E, &["args", "body"], &[]),
    ("IfExp", E, &["test", "body", "orelse"], &[]),
    ("Dict", E, &["keys", "values"], &[]),
    ("Set", E, &["elts"], &[]),
    ("ListComp", E, &["elt", "generators"], &[]),
    ("SetComp", E, &["elt", "generators"], &[]),
    ("DictComp", E, &["key", "value", "generators"], &[]),
    ("GeneratorExp", E, &["elt", "generators"], &[]),
    ("Await", E, &["value"], &[]),
    ("Yield", E, &["value"], &[]),
    ("YieldFrom", E, &["value"], &[]),
    ("Compare", E, &["left", "ops", "comparators"], &[]),
    ("Call", E, &["func", "args", "keywords"], &[]),
    (
        "FormattedValue",
        E,
        &["value", "conversion", "format_spec"],
        &[],
    ),
    ("JoinedStr", E, &["values"], &[]),
    ("Constant", E, &["value", "kind"], &[]),
    ("Num", E, &["n"], &[]),
    ("Str", E, &["s"], &[]),
    ("Bytes", E, &["s"], &[]),
    ("NameConstant", E, &["value"], &[]),
    ("Ellipsis", E, &[], &[]),
    ("Attribute", E, &["value", "attr", "ctx"], &[]),
    ("Subscript", E, &["value", "slice", "ctx"], &[]),
    ("Starred", E, &["value", "ctx"], &[]),
    ("Name", E, &["id", "ctx"], &[]),
    ("List", E, &["elts", "ctx"], &[]),
    ("Tuple", E, &["elts", "ctx"], &[]),
    ("Slice", E, &["lower", "upper", "step"], &[]),
    // expr_context
    ("Load", O, &[], &[]),
    ("Store", O, &[], &[]),
    ("Del", O, &[], &[]),
    ("AugLoad", O, &[], &[]),
    ("AugStore", O, &[], &[]),
    ("Param", O, &[], &[]),
    // slice (legacy)
    ("ExtSlice", O, &["dims"], &[]),
    ("Index", O, &["value"], &[]),
    // boolop, operator, unaryop, cmpop
    ("And", O, &[], &[]),
    ("Or", O, &[], &[]),
    ("Add", O, &[], &[]),
    ("Sub", O, &[], &[]),
    ("Mult", O, &[], &[]),
    ("MatMult", O, &[], &[]),
    ("Div", O, &[], &[]),
    ("Mod", O, &[], &[]),
    ("Pow", O, &[], &[]),
    ("LShift", O, &[], &[]),
    ("RShift", O, &[], &[]),
    ("BitOr", O, &[], &[]),
    ("BitXor", O, &[], &[]),
    ("BitAnd", O, &[], &[]),
    ("FloorDiv", O, &[], &[]),
    ("Invert", O, &[], &[]),
    ("Not", O, &[], &[]),
    ("UAdd", O, &[], &[]),
    ("USub", O, &[], &[]),
    ("Eq", O, &[], &[]),
    ("NotEq", O, &[], &[]),
    ("Lt", O, &[], &[]),
    ("LtE", O, &[], &[]),
    ("Gt", O, &[], &[]),
    ("GtE", O, &[], &[]),
    ("Is", O, &[], &[]),
    ("IsNot", O, &[], &[]),
    ("In", O, &[], &[]),
    ("NotIn", O, &[], &[]),
    // helpers
    ("comprehension", O, &["target", "iter", "ifs", "is_async"], &[]),
    ("ExceptHandler", O, &["type", "name", "body"], &["body"]),
    (
        "arguments",
        O,
        &[
            "posonlyargs",
            "args",
            "vararg",
            "kwonlyargs",
            "kw_defaults",
            "kwarg",
            "defaults",
        ],
        &[],
    ),
    ("arg", O, &["arg", "annotation", "type_comment"], &[]),
    ("keyword", O, &["arg", "value"], &[]),
    ("alias", O, &["name", "asname"], &[]),
    ("withitem", O, &["context_expr", "optional_vars"], &[]),
];
