//! Statement reordering.
//!
//! A [`Reorderer`] snapshots the markings of a statement sequence and enumerates the orderings
//! that keep its behavior: breaking statements stay where they are, and inside each run between
//! them, statements that touch the same variable (or are both visible) keep their relative
//! order. Candidates are scored by a [`Valuer`].

mod extensions;
mod partition;
pub mod valuers;

pub use extensions::Permutations;
pub use partition::partition;
pub use valuers::Valuer;

use braid_core::marking::{BreakSet, MarkKind, Marking, MarkingStore, Markings};
use braid_core::tree::NodeId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;
use tracing::{debug, warn};

/// Default search budget: every ordering of eight statements.
pub const DEFAULT_LIMIT: usize = 40_320;

/// Kinds every statement must carry before it can be reordered.
pub const REQUIRED_KINDS: [MarkKind; 5] = [
    MarkKind::Breaks,
    MarkKind::Visible,
    MarkKind::Reads,
    MarkKind::Writes,
    MarkKind::Scope,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Maximum number of candidates enumerated per search.
    pub limit: usize,
    /// Enumerate candidates in a shuffled order.
    pub random: bool,
    /// Check every candidate against the partition and dependency constraints.
    pub safe: bool,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            random: false,
            safe: false,
        }
    }
}

/// Markings of one statement, as the reorderer and valuers see them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementFacts {
    pub breaks: BreakSet,
    pub visible: bool,
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    /// Names declared `global` or `nonlocal` by the statement.
    pub declares: BTreeSet<String>,
}

impl StatementFacts {
    /// Facts from stored markings, or `None` if a required kind is missing.
    pub fn from_markings(markings: &Markings) -> Option<Self> {
        Some(Self {
            breaks: markings.breaks()?.clone(),
            visible: markings.visible()?,
            reads: markings.reads()?.names().map(str::to_string).collect(),
            writes: markings.writes()?.names().map(str::to_string).collect(),
            declares: markings.scope()?.iter().map(|(n, _)| n.to_string()).collect(),
        })
    }

    pub fn is_breaking(&self) -> bool {
        !self.breaks.is_empty()
    }

    /// True when `later` may not be moved in front of `self`.
    pub fn conflicts_with(&self, later: &StatementFacts) -> bool {
        if self.visible && later.visible {
            return true;
        }
        let touched = |s: &StatementFacts, name: &String| {
            s.reads.contains(name) || s.writes.contains(name) || s.declares.contains(name)
        };
        self.writes.iter().any(|n| touched(later, n))
            || self.declares.iter().any(|n| touched(later, n))
            || self
                .reads
                .iter()
                .any(|n| later.writes.contains(n) || later.declares.contains(n))
    }
}

/// Orderings of one statement sequence.
#[derive(Debug, Clone)]
pub struct Reorderer {
    statements: Vec<NodeId>,
    facts: Vec<Option<StatementFacts>>,
    config: ReorderConfig,
    seed: u64,
}

impl Reorderer {
    /// Snapshots the markings of `statements`.
    pub fn new(store: &MarkingStore, statements: &[NodeId]) -> Self {
        let facts = statements
            .iter()
            .map(|s| store.get(*s).and_then(StatementFacts::from_markings))
            .collect();
        Self {
            statements: statements.to_vec(),
            facts,
            config: ReorderConfig::default(),
            seed: 0,
        }
    }

    pub fn with_config(mut self, config: ReorderConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed of the shuffled enumeration order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &ReorderConfig {
        &self.config
    }

    pub fn statements(&self) -> &[NodeId] {
        &self.statements
    }

    /// True when every statement carries the kinds in [`REQUIRED_KINDS`].
    pub fn check_markings(&self) -> bool {
        self.facts.iter().all(Option::is_some)
    }

    /// Stores pessimistic defaults for every required kind a statement is missing.
    ///
    /// Returns the number of markings added.
    pub fn fill_markings(store: &mut MarkingStore, statements: &[NodeId]) -> usize {
        let mut filled = 0;
        for statement in statements {
            for kind in REQUIRED_KINDS {
                if !store.is_marked(*statement, kind) {
                    store.set(*statement, Marking::fallback(kind));
                    filled += 1;
                }
            }
        }
        debug!("Filled {} missing markings on {} statements", filled, statements.len());
        filled
    }

    fn complete(&self) -> Option<Vec<&StatementFacts>> {
        self.facts.iter().map(Option::as_ref).collect()
    }

    /// Partitions of the sequence as position ranges.
    pub fn partition(&self) -> Option<Vec<Range<usize>>> {
        Some(partition(&self.complete()?))
    }

    /// Every allowed ordering within the search budget, as positions into the sequence.
    pub fn permutations(&self) -> Option<Candidates<'_>> {
        let facts = self.complete()?;
        let graphs = partition(&facts)
            .into_iter()
            .map(|part| partition::dependencies(&facts, part))
            .collect();
        let rng = self
            .config
            .random
            .then(|| StdRng::seed_from_u64(self.seed));
        Some(Candidates {
            reorderer: self,
            inner: Permutations::new(graphs, rng),
            remaining: self.config.limit,
        })
    }

    /// Number of candidates within the budget.
    pub fn count(&self) -> Option<usize> {
        Some(self.permutations()?.count())
    }

    /// Number of distinct candidates within the budget.
    pub fn unique_count(&self) -> Option<usize> {
        Some(self.permutations()?.collect::<HashSet<_>>().len())
    }

    /// First candidate with the strictly highest score.
    pub fn best_permutation<V: Valuer + ?Sized>(&self, valuer: &mut V) -> Option<Vec<usize>> {
        let facts = self.complete()?;
        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut seen = 0;
        for perm in self.permutations()? {
            seen += 1;
            let ordered: Vec<&StatementFacts> = perm.iter().map(|i| facts[*i]).collect();
            let score = valuer.value(&ordered);
            if best.as_ref().is_none_or(|(_, top)| score > *top) {
                best = Some((perm, score));
            }
        }
        if let Some((perm, score)) = &best {
            debug!(
                "{} picked {:?} (score {:.3}) out of {} candidates",
                valuer.name(),
                perm,
                score,
                seen
            );
        }
        best.map(|(perm, _)| perm)
    }

    /// Statements in the order given by `perm`.
    pub fn permute(&self, perm: &[usize]) -> Vec<NodeId> {
        perm.iter().map(|i| self.statements[*i]).collect()
    }

    /// Checks `perm` against the partitions and pairwise constraints directly.
    pub fn is_valid(&self, perm: &[usize]) -> bool {
        let Some(facts) = self.complete() else {
            return false;
        };
        if perm.len() != facts.len() {
            return false;
        }
        let mut position = vec![usize::MAX; facts.len()];
        for (at, index) in perm.iter().enumerate() {
            match position.get_mut(*index) {
                Some(slot) if *slot == usize::MAX => *slot = at,
                _ => return false,
            }
        }
        partition(&facts).into_iter().all(|part| {
            part.clone().all(|i| part.contains(&position[i]))
                && part.clone().all(|i| {
                    part.clone()
                        .skip_while(|j| *j <= i)
                        .all(|j| !facts[i].conflicts_with(facts[j]) || position[i] < position[j])
                })
        })
    }
}

/// Budgeted candidate stream returned by [`Reorderer::permutations`].
pub struct Candidates<'r> {
    reorderer: &'r Reorderer,
    inner: Permutations,
    remaining: usize,
}

impl Iterator for Candidates<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            let perm = self.inner.next()?;
            self.remaining -= 1;
            if self.reorderer.config.safe && !self.reorderer.is_valid(&perm) {
                warn!("Dropping candidate {:?}: violates ordering constraints", perm);
                continue;
            }
            return Some(perm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::marking::{BreakType, ScopeMap, VarMap, VarScope};

    fn vars(names: &[&str]) -> VarMap {
        names.iter().map(|n| (*n, VarScope::Local)).collect()
    }

    fn mark(store: &mut MarkingStore, node: usize, reads: &[&str], writes: &[&str], brk: bool) {
        let id = NodeId::new(node);
        let mut breaks = BreakSet::new();
        if brk {
            breaks.insert(BreakType::Return);
        }
        store.set(id, Marking::Breaks(breaks));
        store.set(id, Marking::Visible(false));
        store.set(id, Marking::Reads(vars(reads)));
        store.set(id, Marking::Writes(vars(writes)));
        store.set(id, Marking::Scope(ScopeMap::new()));
    }

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(NodeId::new).collect()
    }

    #[test]
    fn unmarked_statements_are_refused() {
        let mut store = MarkingStore::new();
        mark(&mut store, 0, &[], &["a"], false);
        let r = Reorderer::new(&store, &ids(2));
        assert!(!r.check_markings());
        assert!(r.permutations().is_none());
        assert_eq!(r.count(), None);

        assert_eq!(Reorderer::fill_markings(&mut store, &ids(2)), 5);
        assert!(Reorderer::new(&store, &ids(2)).check_markings());
    }

    #[test]
    fn break_splits_partitions() {
        let mut store = MarkingStore::new();
        mark(&mut store, 0, &[], &["a"], false);
        mark(&mut store, 1, &[], &[], true);
        mark(&mut store, 2, &[], &["c"], false);
        mark(&mut store, 3, &[], &["d"], false);
        let r = Reorderer::new(&store, &ids(4));
        assert_eq!(r.partition(), Some(vec![0..1, 1..2, 2..4]));
        let perms: Vec<_> = r.permutations().unwrap().collect();
        assert_eq!(perms, vec![vec![0, 1, 2, 3], vec![0, 1, 3, 2]]);
    }

    #[test]
    fn dependent_statements_keep_their_order() {
        let mut store = MarkingStore::new();
        mark(&mut store, 0, &[], &["x"], false);
        mark(&mut store, 1, &["x"], &["y"], false);
        mark(&mut store, 2, &[], &["z"], false);
        let r = Reorderer::new(&store, &ids(3));
        let perms: Vec<_> = r.permutations().unwrap().collect();
        assert_eq!(perms.len(), 3);
        for perm in &perms {
            let p0 = perm.iter().position(|i| *i == 0).unwrap();
            let p1 = perm.iter().position(|i| *i == 1).unwrap();
            assert!(p0 < p1, "{perm:?}");
            assert!(r.is_valid(perm));
        }
        assert!(!r.is_valid(&[1, 0, 2]));
        assert!(!r.is_valid(&[0, 0, 2]));
    }

    #[test]
    fn limit_bounds_the_search() {
        let mut store = MarkingStore::new();
        for i in 0..4 {
            mark(&mut store, i, &[], &[], false);
        }
        let r = Reorderer::new(&store, &ids(4));
        assert_eq!(r.count(), Some(24));
        let limited = r.clone().with_config(ReorderConfig {
            limit: 5,
            ..ReorderConfig::default()
        });
        assert_eq!(limited.count(), Some(5));
        let shuffled = r.with_config(ReorderConfig {
            random: true,
            safe: true,
            ..ReorderConfig::default()
        });
        assert_eq!(shuffled.unique_count(), Some(24));
    }

    #[test]
    fn permute_maps_positions_to_statements() {
        let mut store = MarkingStore::new();
        mark(&mut store, 4, &[], &[], false);
        mark(&mut store, 7, &[], &[], false);
        let r = Reorderer::new(&store, &[NodeId::new(4), NodeId::new(7)]);
        assert_eq!(r.permute(&[1, 0]), vec![NodeId::new(7), NodeId::new(4)]);
    }
}
