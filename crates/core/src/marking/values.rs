//! Value domains of the individual marking kinds.

use crate::result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Ways a statement can leave the normal linear flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakType {
    Except,
    Return,
    Break,
    Continue,
    Yield,
}

impl BreakType {
    pub const ALL: [BreakType; 5] = [
        BreakType::Except,
        BreakType::Return,
        BreakType::Break,
        BreakType::Continue,
        BreakType::Yield,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BreakType::Except => "except",
            BreakType::Return => "return",
            BreakType::Break => "break",
            BreakType::Continue => "continue",
            BreakType::Yield => "yield",
        }
    }
}

impl fmt::Display for BreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BreakType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BreakType::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| Error::InvalidBreakType(s.to_string()))
    }
}

/// Set of break types a node may perform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakSet(BTreeSet<BreakType>);

impl BreakSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every break type: the pessimistic answer for a node nobody could analyse.
    pub fn all() -> Self {
        BreakType::ALL.into_iter().collect()
    }

    /// Adds a break type, returning whether the set changed.
    pub fn insert(&mut self, kind: BreakType) -> bool {
        self.0.insert(kind)
    }

    /// Removes a break type, returning whether the set changed.
    pub fn remove(&mut self, kind: BreakType) -> bool {
        self.0.remove(&kind)
    }

    pub fn contains(&self, kind: BreakType) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = BreakType> + '_ {
        self.0.iter().copied()
    }

    pub fn union_with(&mut self, other: &BreakSet) {
        self.0.extend(other.0.iter().copied());
    }
}

impl FromIterator<BreakType> for BreakSet {
    fn from_iter<I: IntoIterator<Item = BreakType>>(iter: I) -> Self {
        BreakSet(iter.into_iter().collect())
    }
}

macro_rules! scope_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(Error::UnknownScope(s.to_string())),
                }
            }
        }
    };
}

scope_enum!(
    /// Scope class of a name read or written directly by a node.
    VarScope { Local => "local", Nonlocal => "nonlocal", Global => "global", Unknown => "unknown" }
);

scope_enum!(
    /// Scope class of a name accessed from an enclosed scope.
    IndirectScope { Free => "free", Nonlocal => "nonlocal", Global => "global" }
);

scope_enum!(
    /// Scope declared for a name.
    DeclScope { Local => "local", Nonlocal => "nonlocal", Global => "global" }
);

/// Names read or written by a node, with their scope class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarMap(BTreeMap<String, VarScope>);

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` with `scope`, returning whether anything changed.
    pub fn add(&mut self, name: impl Into<String>, scope: VarScope) -> bool {
        self.0.insert(name.into(), scope) != Some(scope)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<VarScope> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VarScope)> + '_ {
        self.0.iter().map(|(name, scope)| (name.as_str(), *scope))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key-wise union where `later` overrides the scope class of shared names.
    pub fn combine(&mut self, later: &VarMap) {
        for (name, scope) in &later.0 {
            self.0.insert(name.clone(), *scope);
        }
    }

    /// Key-wise union where disagreeing scope classes become `unknown`.
    pub fn merge_alternative(&mut self, other: &VarMap) {
        for (name, scope) in &other.0 {
            self.0
                .entry(name.clone())
                .and_modify(|current| {
                    if current != scope {
                        *current = VarScope::Unknown;
                    }
                })
                .or_insert(*scope);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, VarScope)> for VarMap {
    fn from_iter<I: IntoIterator<Item = (S, VarScope)>>(iter: I) -> Self {
        VarMap(iter.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }
}

/// OR over tri-state flags: true if either is true, false only if both are false.
pub fn tri_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Whether an enclosed scope reads and/or writes a name; `None` is "not known".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectAccess {
    pub read: Option<bool>,
    pub write: Option<bool>,
}

impl IndirectAccess {
    pub const NONE: IndirectAccess = IndirectAccess {
        read: Some(false),
        write: Some(false),
    };

    pub fn or(self, other: IndirectAccess) -> IndirectAccess {
        IndirectAccess {
            read: tri_or(self.read, other.read),
            write: tri_or(self.write, other.write),
        }
    }
}

impl Default for IndirectAccess {
    fn default() -> Self {
        IndirectAccess::NONE
    }
}

/// Key of an indirect access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndirectVar {
    pub name: String,
    pub scope: IndirectScope,
}

/// Serialized form of one indirect access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndirectEntry {
    pub name: String,
    pub scope: IndirectScope,
    pub read: Option<bool>,
    pub write: Option<bool>,
}

/// Names accessed from enclosed scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<IndirectEntry>", from = "Vec<IndirectEntry>")]
pub struct IndirectMap(BTreeMap<IndirectVar, IndirectAccess>);

impl IndirectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access recorded for `(name, scope)`; unrecorded pairs are neither read nor written.
    pub fn access(&self, name: &str, scope: IndirectScope) -> IndirectAccess {
        self.0
            .get(&IndirectVar {
                name: name.to_string(),
                scope,
            })
            .copied()
            .unwrap_or_default()
    }

    /// Sets the flags given as `Some`, leaving the others as they were.
    pub fn update(
        &mut self,
        name: &str,
        scope: IndirectScope,
        read: Option<Option<bool>>,
        write: Option<Option<bool>>,
    ) -> bool {
        let key = IndirectVar {
            name: name.to_string(),
            scope,
        };
        let previous = self.0.get(&key).copied();
        let mut access = previous.unwrap_or_default();
        if let Some(read) = read {
            access.read = read;
        }
        if let Some(write) = write {
            access.write = write;
        }
        self.0.insert(key, access);
        previous != Some(access)
    }

    pub fn mark_read(&mut self, name: &str, scope: IndirectScope, read: bool) -> bool {
        self.update(name, scope, Some(Some(read)), None)
    }

    pub fn mark_write(&mut self, name: &str, scope: IndirectScope, write: bool) -> bool {
        self.update(name, scope, None, Some(Some(write)))
    }

    pub fn remove(&mut self, name: &str, scope: IndirectScope) -> bool {
        self.0
            .remove(&IndirectVar {
                name: name.to_string(),
                scope,
            })
            .is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndirectVar, IndirectAccess)> + '_ {
        self.0.iter().map(|(key, access)| (key, *access))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-key OR of the read and write flags.
    pub fn combine(&mut self, other: &IndirectMap) {
        for (key, access) in &other.0 {
            self.0
                .entry(key.clone())
                .and_modify(|current| *current = current.or(*access))
                .or_insert(*access);
        }
    }

    pub fn insert(&mut self, key: IndirectVar, access: IndirectAccess) {
        self.0.insert(key, access);
    }
}

impl From<IndirectMap> for Vec<IndirectEntry> {
    fn from(map: IndirectMap) -> Self {
        map.0
            .into_iter()
            .map(|(key, access)| IndirectEntry {
                name: key.name,
                scope: key.scope,
                read: access.read,
                write: access.write,
            })
            .collect()
    }
}

impl From<Vec<IndirectEntry>> for IndirectMap {
    fn from(entries: Vec<IndirectEntry>) -> Self {
        IndirectMap(
            entries
                .into_iter()
                .map(|entry| {
                    (
                        IndirectVar {
                            name: entry.name,
                            scope: entry.scope,
                        },
                        IndirectAccess {
                            read: entry.read,
                            write: entry.write,
                        },
                    )
                })
                .collect(),
        )
    }
}

/// Scope declarations (`global`, `nonlocal`) made by a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeMap(BTreeMap<String, DeclScope>);

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, scope: DeclScope) -> bool {
        self.0.insert(name.into(), scope) != Some(scope)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    /// Declared scope of `name`, `None` when unknown.
    pub fn scope_of(&self, name: &str) -> Option<DeclScope> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DeclScope)> + '_ {
        self.0.iter().map(|(name, scope)| (name.as_str(), *scope))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn combine(&mut self, later: &ScopeMap) {
        for (name, scope) in &later.0 {
            self.0.insert(name.clone(), *scope);
        }
    }
}
