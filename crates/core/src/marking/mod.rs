//! Typed side table of derived semantic facts per node.
//!
//! A marking is an optional, per-kind value attached to a `NodeId`. Values are never stored on
//! the tree itself: the [`MarkingStore`] maps node ids to [`Markings`], and typed access goes
//! through [`Marker`], which knows each kind's value domain and read default.

use crate::result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

mod edit;
mod marker;
mod store;
mod values;

pub use edit::{EditAction, ScopeCode, VarEdit};
pub use marker::{
    BreaksMark, Detached, IndirectMark, Marker, MarkingKind, ReadsMark, ScopeMark, VisibleMark,
    WritesMark,
};
pub use store::MarkingStore;
pub use values::{
    tri_or, BreakSet, BreakType, DeclScope, IndirectAccess, IndirectEntry, IndirectMap,
    IndirectScope, IndirectVar, ScopeMap, VarMap, VarScope,
};

/// Recognised marking kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Visible,
    Breaks,
    Reads,
    Writes,
    IndirectRw,
    Scope,
}

pub type KindSet = BTreeSet<MarkKind>;

impl MarkKind {
    pub const ALL: [MarkKind; 6] = [
        MarkKind::Visible,
        MarkKind::Breaks,
        MarkKind::Reads,
        MarkKind::Writes,
        MarkKind::IndirectRw,
        MarkKind::Scope,
    ];

    pub fn all() -> KindSet {
        Self::ALL.into_iter().collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarkKind::Visible => "visible",
            MarkKind::Breaks => "breaks",
            MarkKind::Reads => "reads",
            MarkKind::Writes => "writes",
            MarkKind::IndirectRw => "indirectrw",
            MarkKind::Scope => "scope",
        }
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MarkKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownMarkKind(s.to_string()))
    }
}

/// Parses a comma separated list of kind names.
pub fn parse_kinds(list: &str) -> Result<KindSet> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(MarkKind::from_str)
        .collect()
}

/// One marking value, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Marking {
    Visible(bool),
    Breaks(BreakSet),
    Reads(VarMap),
    Writes(VarMap),
    IndirectRw(IndirectMap),
    Scope(ScopeMap),
}

impl Marking {
    pub fn kind(&self) -> MarkKind {
        match self {
            Marking::Visible(_) => MarkKind::Visible,
            Marking::Breaks(_) => MarkKind::Breaks,
            Marking::Reads(_) => MarkKind::Reads,
            Marking::Writes(_) => MarkKind::Writes,
            Marking::IndirectRw(_) => MarkKind::IndirectRw,
            Marking::Scope(_) => MarkKind::Scope,
        }
    }

    /// Identity of sequential combination: what an empty sequence of nodes does.
    pub fn base(kind: MarkKind) -> Self {
        match kind {
            MarkKind::Visible => Marking::Visible(false),
            MarkKind::Breaks => Marking::Breaks(BreakSet::new()),
            MarkKind::Reads => Marking::Reads(VarMap::new()),
            MarkKind::Writes => Marking::Writes(VarMap::new()),
            MarkKind::IndirectRw => Marking::IndirectRw(IndirectMap::new()),
            MarkKind::Scope => Marking::Scope(ScopeMap::new()),
        }
    }

    /// Pessimistic value used when nothing is known about a node.
    pub fn fallback(kind: MarkKind) -> Self {
        match kind {
            MarkKind::Visible => Marking::Visible(true),
            MarkKind::Breaks => Marking::Breaks(BreakSet::all()),
            other => Marking::base(other),
        }
    }

    /// Folds in the marking of a node executed after this one.
    ///
    /// Values of a different kind are left alone.
    pub fn combine(&mut self, later: &Marking) {
        match (self, later) {
            (Marking::Visible(a), Marking::Visible(b)) => *a |= *b,
            (Marking::Breaks(a), Marking::Breaks(b)) => a.union_with(b),
            (Marking::Reads(a), Marking::Reads(b)) | (Marking::Writes(a), Marking::Writes(b)) => {
                a.combine(b)
            }
            (Marking::IndirectRw(a), Marking::IndirectRw(b)) => a.combine(b),
            (Marking::Scope(a), Marking::Scope(b)) => a.combine(b),
            _ => {}
        }
    }

    /// Folds in the marking of a mutually exclusive alternative path.
    pub fn merge_alternative(&mut self, other: &Marking) {
        match (self, other) {
            (Marking::Reads(a), Marking::Reads(b)) | (Marking::Writes(a), Marking::Writes(b)) => {
                a.merge_alternative(b)
            }
            (this, other) => this.combine(other),
        }
    }
}

/// All markings resolved or stored for one node, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Marking>", from = "Vec<Marking>")]
pub struct Markings(BTreeMap<MarkKind, Marking>);

impl Markings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base values for each of `kinds`.
    pub fn base(kinds: &KindSet) -> Self {
        kinds.iter().map(|kind| Marking::base(*kind)).collect()
    }

    pub fn insert(&mut self, marking: Marking) -> Option<Marking> {
        self.0.insert(marking.kind(), marking)
    }

    pub fn get(&self, kind: MarkKind) -> Option<&Marking> {
        self.0.get(&kind)
    }

    pub fn get_mut(&mut self, kind: MarkKind) -> Option<&mut Marking> {
        self.0.get_mut(&kind)
    }

    pub fn remove(&mut self, kind: MarkKind) -> Option<Marking> {
        self.0.remove(&kind)
    }

    pub fn contains(&self, kind: MarkKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn kinds(&self) -> KindSet {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marking> + '_ {
        self.0.values()
    }

    /// Keeps only the markings whose kind is in `kinds`.
    pub fn restrict(&mut self, kinds: &KindSet) {
        self.0.retain(|kind, _| kinds.contains(kind));
    }

    /// Copies in every marking of `other`, replacing same-kind values.
    pub fn extend_from(&mut self, other: &Markings) {
        for marking in other.iter() {
            self.insert(marking.clone());
        }
    }

    /// Sequentially combines `later` into every kind present here.
    pub fn combine(&mut self, later: &Markings) {
        for (kind, value) in self.0.iter_mut() {
            if let Some(other) = later.get(*kind) {
                value.combine(other);
            }
        }
    }

    /// Alternative-path merge of `other` into every kind present here.
    pub fn merge_alternative(&mut self, other: &Markings) {
        for (kind, value) in self.0.iter_mut() {
            if let Some(other) = other.get(*kind) {
                value.merge_alternative(other);
            }
        }
    }

    pub fn visible(&self) -> Option<bool> {
        match self.get(MarkKind::Visible) {
            Some(Marking::Visible(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn breaks(&self) -> Option<&BreakSet> {
        match self.get(MarkKind::Breaks) {
            Some(Marking::Breaks(v)) => Some(v),
            _ => None,
        }
    }

    pub fn reads(&self) -> Option<&VarMap> {
        match self.get(MarkKind::Reads) {
            Some(Marking::Reads(v)) => Some(v),
            _ => None,
        }
    }

    pub fn writes(&self) -> Option<&VarMap> {
        match self.get(MarkKind::Writes) {
            Some(Marking::Writes(v)) => Some(v),
            _ => None,
        }
    }

    pub fn indirect(&self) -> Option<&IndirectMap> {
        match self.get(MarkKind::IndirectRw) {
            Some(Marking::IndirectRw(v)) => Some(v),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<&ScopeMap> {
        match self.get(MarkKind::Scope) {
            Some(Marking::Scope(v)) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<Marking> for Markings {
    fn from_iter<I: IntoIterator<Item = Marking>>(iter: I) -> Self {
        let mut out = Markings::new();
        for marking in iter {
            out.insert(marking);
        }
        out
    }
}

impl IntoIterator for Markings {
    type Item = Marking;
    type IntoIter = std::collections::btree_map::IntoValues<MarkKind, Marking>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

impl From<Markings> for Vec<Marking> {
    fn from(markings: Markings) -> Self {
        markings.into_iter().collect()
    }
}

impl From<Vec<Marking>> for Markings {
    fn from(list: Vec<Marking>) -> Self {
        list.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reads(pairs: &[(&str, VarScope)]) -> Marking {
        Marking::Reads(pairs.iter().map(|(n, s)| (*n, *s)).collect())
    }

    #[test]
    fn visible_combines_by_or() {
        let mut m = Marking::base(MarkKind::Visible);
        m.combine(&Marking::Visible(false));
        assert_eq!(m, Marking::Visible(false));
        m.combine(&Marking::Visible(true));
        assert_eq!(m, Marking::Visible(true));
    }

    #[test]
    fn later_scope_class_overrides_in_sequence() {
        let mut m = reads(&[("x", VarScope::Local)]);
        m.combine(&reads(&[("x", VarScope::Global), ("y", VarScope::Local)]));
        assert_eq!(m, reads(&[("x", VarScope::Global), ("y", VarScope::Local)]));
    }

    #[test]
    fn conflicting_alternatives_become_unknown() {
        let mut m = reads(&[("x", VarScope::Local), ("z", VarScope::Global)]);
        m.merge_alternative(&reads(&[("x", VarScope::Global), ("z", VarScope::Global)]));
        assert_eq!(m, reads(&[("x", VarScope::Unknown), ("z", VarScope::Global)]));
    }

    #[test]
    fn indirect_or_is_commutative_and_idempotent() {
        let mut a = IndirectMap::new();
        a.update("x", IndirectScope::Free, Some(Some(true)), Some(None));
        let mut b = IndirectMap::new();
        b.update("x", IndirectScope::Free, Some(Some(false)), Some(Some(false)));
        b.mark_write("y", IndirectScope::Global, true);

        let mut ab = a.clone();
        ab.combine(&b);
        let mut ba = b.clone();
        ba.combine(&a);
        assert_eq!(ab, ba);

        let mut abab = ab.clone();
        abab.combine(&ab);
        assert_eq!(abab, ab);

        let x = ab.access("x", IndirectScope::Free);
        assert_eq!(x.read, Some(true));
        assert_eq!(x.write, None);
    }

    #[test]
    fn tri_state_or_table() {
        assert_eq!(tri_or(Some(true), None), Some(true));
        assert_eq!(tri_or(None, Some(false)), None);
        assert_eq!(tri_or(Some(false), Some(false)), Some(false));
        assert_eq!(tri_or(None, None), None);
    }

    #[test]
    fn markings_serialize_as_tagged_list() {
        let mut markings = Markings::new();
        markings.insert(Marking::Visible(true));
        markings.insert(Marking::Breaks([BreakType::Return].into_iter().collect()));
        let json = serde_json::to_value(&markings).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "visible", "value": true},
                {"kind": "breaks", "value": ["return"]},
            ])
        );
        let back: Markings = serde_json::from_value(json).unwrap();
        assert_eq!(back, markings);
    }

    #[test]
    fn kind_names_parse() {
        let kinds = parse_kinds("visible, indirectrw").unwrap();
        assert!(kinds.contains(&MarkKind::IndirectRw));
        assert!(matches!(
            "colour".parse::<MarkKind>(),
            Err(Error::UnknownMarkKind(_))
        ));
    }
}
