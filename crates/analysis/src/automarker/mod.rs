//! Auto-marking: resolves markings for nodes through an ordered list of strategies.
//!
//! A resolve call tries each configured [`Strategy`] for the kinds still unanswered, then fills
//! whatever is left from the per-kind defaults. Nested resolves (children, rewritten forms) go
//! through the same loop and are reviewed individually; if any review declines, the whole
//! top-level call aborts and nothing is committed.
//!
//! Results are staged in an overlay store while the call runs and only written back once the
//! top-level resolve completes. Rewrite rules allocate transient nodes; the arena is rolled back
//! after every top-level call and no marking for a transient node is committed.

mod eval;
mod python;
mod rewrite;
mod rules;

pub use rules::{Adjust, LeafRule, Rewrite, RewriteRule, Rule, RuleTable};

use crate::{Error, Result};
use braid_core::bundle::AstBundle;
use braid_core::marking::{KindSet, MarkKind, Marking, MarkingStore, Markings};
use braid_core::tree::{Node, NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// One way of answering requested marking kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Markings already stored on the node.
    Existing,
    /// Markings derived from the rule table.
    Computed,
    /// Markings supplied by the [`Interaction`].
    Interactive,
}

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Strategies in the order they are tried; defaults always come last.
    pub order: Vec<Strategy>,
    /// Commit resolved markings to the store.
    pub write_back: bool,
    /// Per-kind overrides of the fallback values.
    pub defaults: BTreeMap<MarkKind, Marking>,
    /// Kinds resolved by [`AutoMarker::mark_blocks`].
    pub kinds: KindSet,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            order: vec![Strategy::Existing, Strategy::Computed],
            write_back: true,
            defaults: BTreeMap::new(),
            kinds: MarkKind::all(),
        }
    }
}

impl MarkupConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for strategy in &self.order {
            if !seen.insert(*strategy) {
                return Err(Error::DuplicateStrategy(format!("{strategy:?}").to_lowercase()));
            }
        }
        for (kind, marking) in &self.defaults {
            if marking.kind() != *kind {
                return Err(Error::MismatchedDefault {
                    kind: *kind,
                    found: marking.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Value used for `kind` when no strategy answered.
    pub fn default_for(&self, kind: MarkKind) -> Marking {
        self.defaults
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Marking::fallback(kind))
    }
}

/// Signal raised by an interactive strategy to abandon the resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("resolution cancelled")]
pub struct Cancelled;

/// Hooks into a resolve call for user input and review.
pub trait Interaction {
    /// Answers some of `wanted` for `node`; kinds left out fall through to later strategies.
    fn ask(
        &mut self,
        _tree: &Tree,
        _node: NodeId,
        _wanted: &KindSet,
    ) -> std::result::Result<Markings, Cancelled> {
        Ok(Markings::new())
    }

    /// Accepts or declines the markings resolved for `node`. Declining aborts the whole call.
    fn review(&mut self, _tree: &Tree, _node: NodeId, _result: &Markings) -> bool {
        true
    }
}

/// Interaction that answers nothing and accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInteraction;

impl Interaction for NoInteraction {}

/// Outcome of a top-level resolve call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every requested kind was resolved (and committed, with write-back).
    Committed(Markings),
    /// A review declined or the interaction cancelled; nothing was committed.
    Aborted,
}

impl Resolution {
    pub fn markings(&self) -> Option<&Markings> {
        match self {
            Resolution::Committed(markings) => Some(markings),
            Resolution::Aborted => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Resolution::Aborted)
    }
}

/// Summary of a bulk markup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupReport {
    pub blocks: usize,
    pub statements: usize,
    pub resolved: usize,
    pub aborted: usize,
}

/// Why a session stopped early.
enum Halt {
    Aborted,
    Failed(braid_core::Error),
}

impl From<braid_core::Error> for Halt {
    fn from(err: braid_core::Error) -> Self {
        Halt::Failed(err)
    }
}

type Step<T> = std::result::Result<T, Halt>;

/// State of one top-level resolve call.
struct Session<'a, I: Interaction + ?Sized> {
    config: &'a MarkupConfig,
    rules: &'a RuleTable,
    tree: &'a mut Tree,
    store: &'a MarkingStore,
    pending: MarkingStore,
    interaction: &'a mut I,
}

fn missing(needed: &KindSet, result: &Markings) -> KindSet {
    needed
        .iter()
        .filter(|kind| !result.contains(**kind))
        .copied()
        .collect()
}

impl<I: Interaction + ?Sized> Session<'_, I> {
    fn resolve(&mut self, node: NodeId, needed: &KindSet) -> Step<Markings> {
        let config = self.config;
        let mut result = Markings::new();
        for strategy in &config.order {
            let wanted = missing(needed, &result);
            if wanted.is_empty() {
                break;
            }
            let found = match strategy {
                Strategy::Existing => self.existing(node, &wanted),
                Strategy::Computed => self.computed(node, &wanted)?,
                Strategy::Interactive => self
                    .interaction
                    .ask(self.tree, node, &wanted)
                    .map_err(|Cancelled| Halt::Aborted)?,
            };
            for marking in found {
                if wanted.contains(&marking.kind()) {
                    result.insert(marking);
                }
            }
        }
        for kind in missing(needed, &result) {
            result.insert(config.default_for(kind));
        }

        if !self.interaction.review(self.tree, node, &result) {
            debug!("Review declined markings for {} {}", self.tree.kind(node), node);
            return Err(Halt::Aborted);
        }
        self.pending.set_all(node, &result);
        Ok(result)
    }

    /// Staged answers first, then the store.
    fn existing(&self, node: NodeId, wanted: &KindSet) -> Markings {
        wanted
            .iter()
            .filter_map(|kind| {
                self.pending
                    .get_kind(node, *kind)
                    .or_else(|| self.store.get_kind(node, *kind))
                    .cloned()
            })
            .collect()
    }

    fn computed(&mut self, node: NodeId, wanted: &KindSet) -> Step<Markings> {
        let rules = self.rules;
        match &self.tree[node] {
            Node::List(items) => {
                let items = items.clone();
                self.group(&items, wanted)
            }
            Node::Empty | Node::Atom(_) => Ok(Markings::base(wanted)),
            Node::Structured { kind, .. } => match rules.get(kind) {
                Some(rule) => self.eval(rule, node, wanted),
                None => Ok(Markings::new()),
            },
        }
    }

    /// Sequential combination of resolving every item.
    fn group(&mut self, items: &[NodeId], wanted: &KindSet) -> Step<Markings> {
        let mut result = Markings::base(wanted);
        for item in items {
            let marks = self.resolve(*item, wanted)?;
            result.combine(&marks);
        }
        Ok(result)
    }
}

/// Resolution engine: an ordered strategy list plus a rule table.
#[derive(Debug, Clone)]
pub struct AutoMarker {
    config: MarkupConfig,
    rules: RuleTable,
}

impl Default for AutoMarker {
    fn default() -> Self {
        Self::python()
    }
}

impl AutoMarker {
    pub fn new(config: MarkupConfig, rules: RuleTable) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, rules })
    }

    /// Default configuration with the Python rule table.
    pub fn python() -> Self {
        Self {
            config: MarkupConfig::default(),
            rules: RuleTable::python(),
        }
    }

    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Resolves `needed` for `node`.
    ///
    /// Either every requested kind is answered (defaults fill what the strategies could not) and,
    /// with write-back, committed along with every nested result, or the call aborts and the store
    /// is left untouched.
    pub fn resolve<I: Interaction + ?Sized>(
        &self,
        tree: &mut Tree,
        store: &mut MarkingStore,
        node: NodeId,
        needed: &KindSet,
        interaction: &mut I,
    ) -> Result<Resolution> {
        if !tree.contains(node) {
            return Err(braid_core::Error::InvalidNode(node).into());
        }
        let checkpoint = tree.checkpoint();
        let before = tree.node_count();
        let (outcome, mut pending) = {
            let mut session = Session {
                config: &self.config,
                rules: &self.rules,
                tree: &mut *tree,
                store: &*store,
                pending: MarkingStore::new(),
                interaction: &mut *interaction,
            };
            let outcome = session.resolve(node, needed);
            (outcome, session.pending)
        };
        let transient = tree.node_count() - before;
        tree.rollback(checkpoint);

        match outcome {
            Ok(markings) => {
                pending.retain(|id| !checkpoint.is_transient(id));
                if self.config.write_back {
                    for (id, marks) in pending.iter() {
                        store.set_all(id, marks);
                    }
                }
                debug!(
                    "Resolved {} kinds for {} ({} nodes staged, {} transient)",
                    markings.len(),
                    node,
                    pending.len(),
                    transient
                );
                Ok(Resolution::Committed(markings))
            }
            Err(Halt::Aborted) => {
                debug!("Resolution of {} aborted", node);
                Ok(Resolution::Aborted)
            }
            Err(Halt::Failed(err)) => Err(err.into()),
        }
    }

    /// Resolves the configured kinds for every statement of every statement block under `root`.
    pub fn mark_blocks<I: Interaction + ?Sized>(
        &self,
        tree: &mut Tree,
        store: &mut MarkingStore,
        root: NodeId,
        interaction: &mut I,
    ) -> Result<MarkupReport> {
        let mut report = MarkupReport::default();
        for block in tree.statement_blocks(root) {
            report.blocks += 1;
            let statements = tree.list_items(block).map(<[NodeId]>::to_vec).unwrap_or_default();
            for statement in statements {
                report.statements += 1;
                match self.resolve(tree, store, statement, &self.config.kinds, interaction)? {
                    Resolution::Committed(_) => report.resolved += 1,
                    Resolution::Aborted => report.aborted += 1,
                }
            }
        }
        debug!(
            "Marked {} statements in {} blocks ({} aborted)",
            report.resolved, report.blocks, report.aborted
        );
        Ok(report)
    }

    /// [`Self::mark_blocks`] over a whole bundle.
    pub fn mark_bundle<I: Interaction + ?Sized>(
        &self,
        bundle: &mut AstBundle,
        interaction: &mut I,
    ) -> Result<MarkupReport> {
        let AstBundle {
            tree,
            root,
            markings,
        } = bundle;
        self.mark_blocks(tree, markings, *root, interaction)
    }
}

