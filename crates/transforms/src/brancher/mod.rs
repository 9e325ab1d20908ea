//! Branch construction from catalogued code fragments.
//!
//! A [`Brancher`] owns a state variable and six typed collections. Each constructor sets the
//! state from an initial expression and wraps a region of a statement block in control flow
//! whose outcome the collections make predictable, so the region still runs exactly once:
//!
//! - if: `state = init; <preserving>; if <guard>: region`
//! - if-else: `state = init; <randomising>; if pred: region else: copy(region)`
//! - except: `state = init; try: stmt except T: region` (or `except T: pass else: region`)
//! - while: `state = init; while <guard>: region; <destroying>`

mod build;
pub mod collection;
mod set;

pub use collection::{
    Collection, Entry, ExceptionStatement, Expression, Predicate, SimpleStatement,
};
pub use set::BrancherSet;

use crate::{Error, Result};
use braid_core::grammar::Grammar;
use braid_core::ident::identifier;
use braid_core::marking::{BreakType, BreaksMark, MarkingStore};
use braid_core::tree::{NodeId, Tree};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

/// The six collections of a brancher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Predicates,
    Exceptions,
    Initial,
    Preserving,
    Destroying,
    Randomising,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 6] = [
        CollectionKind::Predicates,
        CollectionKind::Exceptions,
        CollectionKind::Initial,
        CollectionKind::Preserving,
        CollectionKind::Destroying,
        CollectionKind::Randomising,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Predicates => "predicates",
            CollectionKind::Exceptions => "exceptions",
            CollectionKind::Initial => "initial",
            CollectionKind::Preserving => "preserving",
            CollectionKind::Destroying => "destroying",
            CollectionKind::Randomising => "randomising",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownName {
                what: "collection",
                name: s.to_string(),
            })
    }
}

/// The four branch shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    If,
    IfElse,
    Except,
    While,
}

impl BranchKind {
    pub const ALL: [BranchKind; 4] = [
        BranchKind::If,
        BranchKind::IfElse,
        BranchKind::Except,
        BranchKind::While,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::If => "if",
            BranchKind::IfElse => "ifelse",
            BranchKind::Except => "except",
            BranchKind::While => "while",
        }
    }

    /// Collections that need at least one entry for this shape.
    pub fn requires(self) -> &'static [CollectionKind] {
        use CollectionKind::*;
        match self {
            BranchKind::If => &[Initial, Predicates],
            BranchKind::IfElse => &[Initial, Predicates, Randomising],
            BranchKind::Except => &[Initial, Exceptions],
            BranchKind::While => &[Initial, Predicates, Destroying],
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownName {
                what: "branch",
                name: s.to_string(),
            })
    }
}

/// Statements of a block to wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Positions `start..end`.
    Range { start: usize, end: usize },
    /// A random range containing `pivot` (itself random when absent).
    Around { pivot: Option<usize> },
}

impl Region {
    /// Concrete range within `len` statements; `None` for an empty block.
    pub fn resolve(self, len: usize, rng: &mut StdRng) -> Result<Option<Range<usize>>> {
        match self {
            Region::Range { start, end } => {
                if start >= end || end > len {
                    return Err(Error::InvalidRegion { start, end, len });
                }
                Ok(Some(start..end))
            }
            Region::Around { .. } if len == 0 => Ok(None),
            Region::Around { pivot } => {
                let pivot = pivot
                    .map(|p| p.min(len - 1))
                    .unwrap_or_else(|| rng.random_range(0..len));
                let start = rng.random_range(0..=pivot);
                let end = rng.random_range(pivot + 1..=len);
                Ok(Some(start..end))
            }
        }
    }
}

/// Result of a branch construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOutcome {
    /// The new block contents; the input unchanged when `success` is false.
    pub statements: Vec<NodeId>,
    pub success: bool,
}

impl BranchOutcome {
    fn refused(statements: &[NodeId]) -> Self {
        Self {
            statements: statements.to_vec(),
            success: false,
        }
    }
}

/// Named set of collections used to build one family of branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brancher {
    name: String,
    state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicates: Option<Collection<Predicate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Collection<ExceptionStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Collection<Expression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserving: Option<Collection<SimpleStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroying: Option<Collection<SimpleStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub randomising: Option<Collection<SimpleStatement>>,
}

impl Brancher {
    /// Brancher without collections. `name` and `state` must be identifiers.
    pub fn new(name: &str, state: &str) -> Result<Self> {
        Ok(Self {
            name: identifier(name)?,
            state: identifier(state)?,
            predicates: None,
            exceptions: None,
            initial: None,
            preserving: None,
            destroying: None,
            randomising: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variable the initial expressions are assigned to.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn predicates_mut(&mut self) -> &mut Collection<Predicate> {
        self.predicates.get_or_insert_with(Collection::new)
    }

    pub fn exceptions_mut(&mut self) -> &mut Collection<ExceptionStatement> {
        self.exceptions.get_or_insert_with(Collection::new)
    }

    pub fn initial_mut(&mut self) -> &mut Collection<Expression> {
        self.initial.get_or_insert_with(Collection::new)
    }

    pub fn preserving_mut(&mut self) -> &mut Collection<SimpleStatement> {
        self.preserving.get_or_insert_with(Collection::new)
    }

    pub fn destroying_mut(&mut self) -> &mut Collection<SimpleStatement> {
        self.destroying.get_or_insert_with(Collection::new)
    }

    pub fn randomising_mut(&mut self) -> &mut Collection<SimpleStatement> {
        self.randomising.get_or_insert_with(Collection::new)
    }

    /// Creates an empty collection of `kind`; returns false if it already existed.
    pub fn create(&mut self, kind: CollectionKind) -> bool {
        if self.len(kind).is_some() {
            return false;
        }
        match kind {
            CollectionKind::Predicates => {
                self.predicates_mut();
            }
            CollectionKind::Exceptions => {
                self.exceptions_mut();
            }
            CollectionKind::Initial => {
                self.initial_mut();
            }
            CollectionKind::Preserving => {
                self.preserving_mut();
            }
            CollectionKind::Destroying => {
                self.destroying_mut();
            }
            CollectionKind::Randomising => {
                self.randomising_mut();
            }
        }
        true
    }

    /// Number of entries in the collection, or `None` if it does not exist.
    pub fn len(&self, kind: CollectionKind) -> Option<usize> {
        match kind {
            CollectionKind::Predicates => self.predicates.as_ref().map(Collection::len),
            CollectionKind::Exceptions => self.exceptions.as_ref().map(Collection::len),
            CollectionKind::Initial => self.initial.as_ref().map(Collection::len),
            CollectionKind::Preserving => self.preserving.as_ref().map(Collection::len),
            CollectionKind::Destroying => self.destroying.as_ref().map(Collection::len),
            CollectionKind::Randomising => self.randomising.as_ref().map(Collection::len),
        }
    }

    /// Whether `kind` can be built: `None` when a required collection does not exist,
    /// `Some(false)` when one is empty.
    pub fn availability(&self, kind: BranchKind) -> Option<bool> {
        let mut available = true;
        for required in kind.requires() {
            available &= self.len(*required)? > 0;
        }
        Some(available)
    }

    /// Re-checks names and every collection, e.g. after loading.
    pub fn validate(&self, grammar: &Grammar) -> Result<()> {
        identifier(&self.name)?;
        identifier(&self.state)?;
        fn check<T: Entry>(c: &Option<Collection<T>>, grammar: &Grammar) -> Result<()> {
            match c {
                Some(c) => Ok(c.validate(grammar)?),
                None => Ok(()),
            }
        }
        check(&self.predicates, grammar)?;
        check(&self.exceptions, grammar)?;
        check(&self.initial, grammar)?;
        check(&self.preserving, grammar)?;
        check(&self.destroying, grammar)?;
        check(&self.randomising, grammar)
    }

    /// Builds a branch of `kind`; `None` when the collections cannot support it.
    pub fn branch(
        &self,
        kind: BranchKind,
        tree: &mut Tree,
        store: &MarkingStore,
        statements: &[NodeId],
        region: Region,
        rng: &mut StdRng,
    ) -> Result<Option<BranchOutcome>> {
        match kind {
            BranchKind::If => self.if_branch(tree, statements, region, rng),
            BranchKind::IfElse => self.ifelse_branch(tree, statements, region, rng),
            BranchKind::Except => self.except_branch(tree, statements, region, rng),
            BranchKind::While => self.while_branch(tree, store, statements, region, rng),
        }
    }

    /// `state = init`
    fn initialise(&self, tree: &mut Tree, rng: &mut StdRng) -> Result<Option<NodeId>> {
        let Some(init) = self.initial.as_ref().and_then(|c| c.choose(rng)) else {
            return Ok(None);
        };
        let value = tree.import(&init.0)?;
        Ok(Some(build::assign(tree, &self.state, value)?))
    }

    fn splice(statements: &[NodeId], range: &Range<usize>, wrapped: Vec<NodeId>) -> BranchOutcome {
        let mut out = statements[..range.start].to_vec();
        out.extend(wrapped);
        out.extend_from_slice(&statements[range.end..]);
        BranchOutcome {
            statements: out,
            success: true,
        }
    }

    pub fn if_branch(
        &self,
        tree: &mut Tree,
        statements: &[NodeId],
        region: Region,
        rng: &mut StdRng,
    ) -> Result<Option<BranchOutcome>> {
        if self.availability(BranchKind::If) != Some(true) {
            return Ok(None);
        }
        let Some(range) = region.resolve(statements.len(), rng)? else {
            return Ok(Some(BranchOutcome::refused(statements)));
        };
        let (Some(init), Some(predicate)) = (
            self.initialise(tree, rng)?,
            self.predicates.as_ref().and_then(|c| c.choose(rng)),
        ) else {
            return Ok(None);
        };

        let mut wrapped = vec![init];
        if let Some(keep) = self.preserving.as_ref().and_then(|c| c.choose(rng)) {
            wrapped.push(tree.import(&keep.0)?);
        }
        let test = build::guard(tree, predicate)?;
        let body = statements[range.clone()].to_vec();
        wrapped.push(build::if_stmt(tree, test, body, Vec::new())?);
        debug!("{}: if-branch over statements {:?}", self.name, range);
        Ok(Some(Self::splice(statements, &range, wrapped)))
    }

    pub fn ifelse_branch(
        &self,
        tree: &mut Tree,
        statements: &[NodeId],
        region: Region,
        rng: &mut StdRng,
    ) -> Result<Option<BranchOutcome>> {
        if self.availability(BranchKind::IfElse) != Some(true) {
            return Ok(None);
        }
        let Some(range) = region.resolve(statements.len(), rng)? else {
            return Ok(Some(BranchOutcome::refused(statements)));
        };
        let (Some(init), Some(predicate), Some(shuffle)) = (
            self.initialise(tree, rng)?,
            self.predicates.as_ref().and_then(|c| c.choose(rng)),
            self.randomising.as_ref().and_then(|c| c.choose(rng)),
        ) else {
            return Ok(None);
        };

        let shuffle = tree.import(&shuffle.0)?;
        let test = tree.import(&predicate.expr)?;
        let body = statements[range.clone()].to_vec();
        let orelse = body.iter().map(|s| tree.deep_copy(*s)).collect();
        let branch = build::if_stmt(tree, test, body, orelse)?;
        debug!("{}: if-else-branch over statements {:?}", self.name, range);
        Ok(Some(Self::splice(statements, &range, vec![init, shuffle, branch])))
    }

    pub fn except_branch(
        &self,
        tree: &mut Tree,
        statements: &[NodeId],
        region: Region,
        rng: &mut StdRng,
    ) -> Result<Option<BranchOutcome>> {
        if self.availability(BranchKind::Except) != Some(true) {
            return Ok(None);
        }
        let Some(range) = region.resolve(statements.len(), rng)? else {
            return Ok(Some(BranchOutcome::refused(statements)));
        };
        let (Some(init), Some(trigger)) = (
            self.initialise(tree, rng)?,
            self.exceptions.as_ref().and_then(|c| c.choose(rng)),
        ) else {
            return Ok(None);
        };

        let body = vec![tree.import(&trigger.stmt)?];
        let region_statements = statements[range.clone()].to_vec();
        let guarded = if trigger.raises {
            build::try_stmt(tree, body, &trigger.types, region_statements, Vec::new())?
        } else {
            let pass = build::pass(tree)?;
            build::try_stmt(tree, body, &trigger.types, vec![pass], region_statements)?
        };
        debug!(
            "{}: except-branch over statements {:?} (raises: {})",
            self.name, range, trigger.raises
        );
        Ok(Some(Self::splice(statements, &range, vec![init, guarded])))
    }

    /// Refused when a wrapped statement may `break` or `continue`, since the loop would
    /// capture it.
    pub fn while_branch(
        &self,
        tree: &mut Tree,
        store: &MarkingStore,
        statements: &[NodeId],
        region: Region,
        rng: &mut StdRng,
    ) -> Result<Option<BranchOutcome>> {
        if self.availability(BranchKind::While) != Some(true) {
            return Ok(None);
        }
        let Some(range) = region.resolve(statements.len(), rng)? else {
            return Ok(Some(BranchOutcome::refused(statements)));
        };
        let escapes = statements[range.clone()].iter().any(|s| {
            let breaks = store.read::<BreaksMark>(*s);
            breaks.contains(BreakType::Break) || breaks.contains(BreakType::Continue)
        });
        if escapes {
            debug!("{}: while-branch refused, region may break out", self.name);
            return Ok(Some(BranchOutcome::refused(statements)));
        }
        let (Some(init), Some(predicate), Some(destroy)) = (
            self.initialise(tree, rng)?,
            self.predicates.as_ref().and_then(|c| c.choose(rng)),
            self.destroying.as_ref().and_then(|c| c.choose(rng)),
        ) else {
            return Ok(None);
        };

        let test = build::guard(tree, predicate)?;
        let mut body = statements[range.clone()].to_vec();
        body.push(tree.import(&destroy.0)?);
        let looped = build::while_stmt(tree, test, body)?;
        debug!("{}: while-branch over statements {:?}", self.name, range);
        Ok(Some(Self::splice(statements, &range, vec![init, looped])))
    }
}
