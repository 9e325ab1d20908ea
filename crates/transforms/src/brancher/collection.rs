//! Typed, id-indexed collections of code fragments.

use braid_core::ast::Ast;
use braid_core::grammar::Grammar;
use braid_core::ident::dotted_identifier;
use braid_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fragment that can live in a [`Collection`].
pub trait Entry: Clone + Serialize + DeserializeOwned {
    /// Rejects fragments of the wrong node category.
    fn validate(&self, grammar: &Grammar) -> Result<()>;
}

fn kind_of(ast: &Ast) -> String {
    ast.kind().unwrap_or("non-node value").to_string()
}

fn expect_expression(grammar: &Grammar, ast: &Ast) -> Result<()> {
    match ast.kind() {
        Some(kind) if grammar.is_expression(kind) => Ok(()),
        _ => Err(Error::TypeViolation {
            expected: "expression",
            found: kind_of(ast),
        }),
    }
}

fn expect_simple_statement(grammar: &Grammar, ast: &Ast) -> Result<()> {
    match ast.kind() {
        Some(kind) if grammar.is_simple_statement(kind) => Ok(()),
        _ => Err(Error::TypeViolation {
            expected: "simple statement",
            found: kind_of(ast),
        }),
    }
}

/// Expression with the truth value it has right after the initial state is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub expr: Ast,
    pub truth: bool,
}

impl Entry for Predicate {
    fn validate(&self, grammar: &Grammar) -> Result<()> {
        expect_expression(grammar, &self.expr)
    }
}

/// Simple statement that is known to raise (or not raise) one of `types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionStatement {
    pub stmt: Ast,
    pub raises: bool,
    /// Dotted exception type names caught by the handler.
    pub types: Vec<String>,
}

impl Entry for ExceptionStatement {
    fn validate(&self, grammar: &Grammar) -> Result<()> {
        expect_simple_statement(grammar, &self.stmt)?;
        if self.types.is_empty() {
            return Err(Error::InvalidName(String::new()));
        }
        for name in &self.types {
            dotted_identifier(name)?;
        }
        Ok(())
    }
}

/// Free-form expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(pub Ast);

impl Entry for Expression {
    fn validate(&self, grammar: &Grammar) -> Result<()> {
        expect_expression(grammar, &self.0)
    }
}

/// Free-form statement without nested statement blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimpleStatement(pub Ast);

impl Entry for SimpleStatement {
    fn validate(&self, grammar: &Grammar) -> Result<()> {
        expect_simple_statement(grammar, &self.0)
    }
}

/// Entries keyed by ids that start at 0, increase monotonically and are never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Entry")]
pub struct Collection<T: Entry> {
    next_id: usize,
    entries: BTreeMap<usize, T>,
}

impl<T: Entry> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Entry> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores `entry`, returning its id. Nothing changes on error.
    pub fn insert(&mut self, grammar: &Grammar, entry: T) -> Result<usize> {
        entry.validate(grammar)?;
        let id = self.next_id;
        self.entries.insert(id, entry);
        self.next_id += 1;
        Ok(id)
    }

    /// Replaces the entry at `id`, returning the old one. Nothing changes on error.
    pub fn replace(&mut self, grammar: &Grammar, id: usize, entry: T) -> Result<Option<T>> {
        entry.validate(grammar)?;
        match self.entries.get_mut(&id) {
            Some(slot) => Ok(Some(std::mem::replace(slot, entry))),
            None => Ok(None),
        }
    }

    pub fn remove(&mut self, id: usize) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id the next insert will receive.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn choose(&self, rng: &mut StdRng) -> Option<&T> {
        self.entries.values().choose(rng)
    }

    /// Re-checks every entry and the id counter, e.g. after loading.
    pub fn validate(&self, grammar: &Grammar) -> Result<()> {
        if let Some((last, _)) = self.entries.last_key_value() {
            if *last >= self.next_id {
                return Err(Error::TypeViolation {
                    expected: "entry id below the next id",
                    found: last.to_string(),
                });
            }
        }
        self.entries.values().try_for_each(|entry| entry.validate(grammar))
    }
}
