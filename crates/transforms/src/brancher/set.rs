//! Named branchers, saved and loaded as one JSON document.

use super::Brancher;
use crate::{Error, Result};
use braid_core::grammar::Grammar;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrancherSet {
    branchers: Vec<Brancher>,
}

impl BrancherSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, brancher: Brancher) -> Result<()> {
        if self.get(brancher.name()).is_some() {
            return Err(Error::DuplicateBrancher(brancher.name().to_string()));
        }
        self.branchers.push(brancher);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Brancher> {
        self.branchers.iter().find(|b| b.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Brancher> {
        self.branchers
            .iter_mut()
            .find(|b| b.name() == name)
            .ok_or_else(|| Error::UnknownBrancher(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<Brancher> {
        let index = self
            .branchers
            .iter()
            .position(|b| b.name() == name)
            .ok_or_else(|| Error::UnknownBrancher(name.to_string()))?;
        Ok(self.branchers.remove(index))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.branchers.iter().map(Brancher::name)
    }

    pub fn len(&self) -> usize {
        self.branchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branchers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brancher> + '_ {
        self.branchers.iter()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a saved set, rejecting duplicate names and invalid entries.
    pub fn from_json(grammar: &Grammar, json: &str) -> Result<Self> {
        let loaded: Vec<Brancher> = serde_json::from_str(json)?;
        let mut set = Self::new();
        for brancher in loaded {
            brancher.validate(grammar)?;
            set.add(brancher)?;
        }
        debug!("loaded {} branchers", set.len());
        Ok(set)
    }
}
