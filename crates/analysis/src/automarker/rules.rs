//! Declarative rule algebra used by the computed strategy.
//!
//! A [`RuleTable`] maps a structured node kind to a [`Rule`]. Rules are plain data, so a table
//! can be loaded from JSON as well as built in code.

use braid_core::marking::{BreakType, DeclScope, KindSet, MarkKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the rule algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Recurse into child fields, then adjust.
    Leaf(LeafRule),
    /// Resolve an equivalent desugared node instead.
    Rewrite(RewriteRule),
    /// Sub-rules run one after another.
    Sequential(Vec<Rule>),
    /// Sub-rules answer disjoint kinds of the same node.
    AllOf(Vec<Rule>),
    /// Sub-rules are mutually exclusive runtime paths.
    AnyOf(Vec<Rule>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeafRule {
    /// Kinds this rule can answer; every kind when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known: Option<KindSet>,
    /// Kinds this rule never answers.
    #[serde(default, skip_serializing_if = "KindSet::is_empty")]
    pub unknown: KindSet,
    /// Child fields combined in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjust: Vec<Adjust>,
}

impl LeafRule {
    /// Leaf combining `children` in order.
    pub fn of(children: &[&str]) -> Self {
        Self {
            children: children.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn known(mut self, kinds: &[MarkKind]) -> Self {
        self.known = Some(kinds.iter().copied().collect());
        self
    }

    pub fn unknown(mut self, kinds: &[MarkKind]) -> Self {
        self.unknown = kinds.iter().copied().collect();
        self
    }

    pub fn with(mut self, adjust: Adjust) -> Self {
        self.adjust.push(adjust);
        self
    }

    /// Kinds of `wanted` this leaf answers. Overlapping known and unknown sets answer nothing.
    pub fn answerable(&self, wanted: &KindSet) -> Option<KindSet> {
        if let Some(known) = &self.known {
            if !known.is_disjoint(&self.unknown) {
                return None;
            }
        }
        Some(
            wanted
                .iter()
                .filter(|kind| self.known.as_ref().is_none_or(|known| known.contains(*kind)))
                .filter(|kind| !self.unknown.contains(*kind))
                .copied()
                .collect(),
        )
    }
}

impl From<LeafRule> for Rule {
    fn from(leaf: LeafRule) -> Self {
        Rule::Leaf(leaf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub rewrite: Rewrite,
    /// Evaluated when the rewrite does not apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Box<Rule>>,
}

/// Desugarings available to [`RewriteRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rewrite {
    /// `@d1 @d2 def f` becomes `[def f, f = d1(d2(f))]`.
    DecoratedDefinition { decorators: String, name: String },
    /// `t op= v` becomes `t = t op v`.
    AugmentedAssignment {
        target: String,
        op: String,
        value: String,
    },
}

/// Kind-specific corrections applied after a leaf's children are combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjust {
    AddBreak(BreakType),
    RemoveBreak(BreakType),
    /// Adds `brk` when the `child` field holds a node of kind `kind`.
    AddBreakWhen {
        child: String,
        kind: String,
        brk: BreakType,
    },
    /// Removes `except` when some handler in `handlers` has no exception type.
    CatchAll { handlers: String },
    /// Loads read the identifier in `name`; stores and deletes write it.
    NameAccess { name: String, context: String },
    /// The identifier in `name` is written.
    Binds { name: String },
    /// Import alias: `asname` is written if present, otherwise the first part of `name`.
    BindsAlias { name: String, asname: String },
    /// Every identifier in the `names` list is declared with `scope`.
    Declares { names: String, scope: DeclScope },
    /// Accesses from the enclosed scope whose code is `body` and parameters are under `params`.
    EnclosedScope { body: String, params: String },
}

/// Rules keyed by structured node kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: BTreeMap<String, Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: &str) -> Option<&Rule> {
        self.rules.get(kind)
    }

    pub fn insert(&mut self, kind: impl Into<String>, rule: impl Into<Rule>) -> Option<Rule> {
        self.rules.insert(kind.into(), rule.into())
    }

    pub fn remove(&mut self, kind: &str) -> Option<Rule> {
        self.rules.remove(kind)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.keys().map(String::as_str)
    }
}
