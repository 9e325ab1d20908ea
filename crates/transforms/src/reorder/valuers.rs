//! Scoring functions for candidate orderings.
//!
//! Valuers see the statements in candidate order and use the 0-based position as a time axis.
//! Higher scores are better.

use super::StatementFacts;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};

/// Names accepted by [`by_name`].
pub const NAMES: [&str; 6] = ["random", "first", "wrange", "rwrange", "rwlogrange", "knots"];

pub trait Valuer {
    fn name(&self) -> &'static str;
    fn value(&mut self, ordered: &[&StatementFacts]) -> f64;
}

impl<V: Valuer + ?Sized> Valuer for Box<V> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        (**self).value(ordered)
    }
}

/// Valuer registered under `name`; `random` draws its seed from `rng`.
pub fn by_name(name: &str, rng: &mut StdRng) -> Result<Box<dyn Valuer>> {
    Ok(match name {
        "random" => Box::new(RandomValuer::new(rng.random())),
        "first" => Box::new(FirstValuer),
        "wrange" => Box::new(WriteRange),
        "rwrange" => Box::new(WriteUse),
        "rwlogrange" => Box::new(WriteUseLog),
        "knots" => Box::new(Knot),
        _ => {
            return Err(Error::UnknownName {
                what: "valuer",
                name: name.to_string(),
            })
        }
    })
}

/// Uniform random score, independent of the ordering.
#[derive(Debug, Clone)]
pub struct RandomValuer {
    rng: StdRng,
}

impl RandomValuer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Valuer for RandomValuer {
    fn name(&self) -> &'static str {
        "random"
    }

    fn value(&mut self, _ordered: &[&StatementFacts]) -> f64 {
        self.rng.random_range(0.0..100.0)
    }
}

/// Constant score: the first candidate always wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstValuer;

impl Valuer for FirstValuer {
    fn name(&self) -> &'static str {
        "first"
    }

    fn value(&mut self, _ordered: &[&StatementFacts]) -> f64 {
        1.0
    }
}

/// Negates another valuer.
#[derive(Debug, Clone)]
pub struct Inverted<V>(pub V);

impl<V: Valuer> Valuer for Inverted<V> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        -self.0.value(ordered)
    }
}

/// Sum over variables of the span between their first and last write, negated.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteRange;

impl Valuer for WriteRange {
    fn name(&self) -> &'static str {
        "wrange"
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        let mut spans: HashMap<&str, (usize, usize)> = HashMap::new();
        for (i, statement) in ordered.iter().enumerate() {
            for var in &statement.writes {
                spans
                    .entry(var.as_str())
                    .and_modify(|(_, last)| *last = i)
                    .or_insert((i, i));
            }
        }
        -(spans.values().map(|(first, last)| last - first).sum::<usize>() as f64)
    }
}

/// Sum over writes of the distance to the last read before the next write, negated.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteUse;

impl Valuer for WriteUse {
    fn name(&self) -> &'static str {
        "rwrange"
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        -write_use_total(ordered, |d| d)
    }
}

/// [`WriteUse`] accumulating `ln(distance)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteUseLog;

impl Valuer for WriteUseLog {
    fn name(&self) -> &'static str {
        "rwlogrange"
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        -write_use_total(ordered, f64::ln)
    }
}

/// Live range of one written value.
struct Live {
    write: isize,
    read: Option<isize>,
}

/// Accumulates `weigh(distance)` for every positive write-to-last-use distance.
///
/// Reads before any write count from a virtual write at -1. A value overwritten without being
/// read lives until the overwrite; a value never overwritten or read contributes nothing.
fn write_use_total(ordered: &[&StatementFacts], weigh: impl Fn(f64) -> f64) -> f64 {
    let mut total = 0.0;
    let mut add = |distance: isize| {
        if distance > 0 {
            total += weigh(distance as f64);
        }
    };
    let mut live: HashMap<&str, Live> = HashMap::new();
    for (i, statement) in ordered.iter().enumerate() {
        let i = i as isize;
        for var in &statement.reads {
            live.entry(var.as_str())
                .and_modify(|l| l.read = Some(i))
                .or_insert(Live {
                    write: -1,
                    read: Some(i),
                });
        }
        for var in &statement.writes {
            if let Some(previous) = live.get(var.as_str()) {
                add(previous.read.unwrap_or(i) - previous.write);
            }
            live.insert(var.as_str(), Live { write: i, read: None });
        }
    }
    for l in live.values() {
        if let Some(read) = l.read {
            add(read - l.write);
        }
    }
    total
}

/// Counts how many open read-dependency links each statement is crossed by, negated.
///
/// Scanning backward, every statement closes the links that point at it (each closed link adds
/// its depth in the open list) and opens a link to each statement providing a value it reads.
/// Orderings that finish with one variable before starting the next leave fewer links open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Knot;

impl Valuer for Knot {
    fn name(&self) -> &'static str {
        "knots"
    }

    fn value(&mut self, ordered: &[&StatementFacts]) -> f64 {
        let providers = providing_statements(ordered);
        let mut knots = 0;
        let mut links: Vec<usize> = Vec::new();
        for i in (0..ordered.len()).rev() {
            while let Some(depth) = links.iter().position(|l| *l == i) {
                knots += depth;
                links.remove(depth);
            }
            for provider in &providers[i] {
                links.insert(0, *provider);
            }
        }
        -(knots as f64)
    }
}

/// For each statement, the positions of the last writers of the variables it reads.
fn providing_statements(ordered: &[&StatementFacts]) -> Vec<BTreeSet<usize>> {
    let mut last_writer: HashMap<&str, usize> = HashMap::new();
    let mut providers = Vec::with_capacity(ordered.len());
    for (i, statement) in ordered.iter().enumerate() {
        providers.push(
            statement
                .reads
                .iter()
                .filter_map(|var| last_writer.get(var.as_str()).copied())
                .collect(),
        );
        for var in &statement.writes {
            last_writer.insert(var.as_str(), i);
        }
    }
    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(reads: &[&str], writes: &[&str]) -> StatementFacts {
        StatementFacts {
            reads: reads.iter().map(|s| s.to_string()).collect(),
            writes: writes.iter().map(|s| s.to_string()).collect(),
            ..StatementFacts::default()
        }
    }

    fn score<V: Valuer>(mut valuer: V, statements: &[StatementFacts]) -> f64 {
        let ordered: Vec<&StatementFacts> = statements.iter().collect();
        valuer.value(&ordered)
    }

    #[test]
    fn write_range_and_write_use_agree_without_reads() {
        let s = [stmt(&[], &["x"]), stmt(&[], &[]), stmt(&[], &[]), stmt(&[], &["x"])];
        assert_eq!(score(WriteRange, &s), -3.0);
        assert_eq!(score(WriteUse, &s), -3.0);
    }

    #[test]
    fn intervening_read_shortens_write_use() {
        let s = [stmt(&[], &["x"]), stmt(&["x"], &[]), stmt(&[], &[]), stmt(&[], &["x"])];
        assert_eq!(score(WriteRange, &s), -3.0);
        assert_eq!(score(WriteUse, &s), -1.0);
    }

    #[test]
    fn reads_before_writes_count_from_minus_one() {
        let s = [stmt(&[], &[]), stmt(&["y"], &[])];
        assert_eq!(score(WriteUse, &s), -2.0);
        assert!((score(WriteUseLog, &s) + 2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn log_ignores_unit_distances() {
        let s = [stmt(&[], &["x"]), stmt(&["x"], &[])];
        assert_eq!(score(WriteUseLog, &s), 0.0);
        assert_eq!(score(WriteUse, &s), -1.0);
    }

    #[test]
    fn knot_prefers_one_variable_at_a_time() {
        let grouped = [
            stmt(&[], &["a"]),
            stmt(&["a"], &[]),
            stmt(&[], &["b"]),
            stmt(&["b"], &[]),
        ];
        let interleaved = [
            stmt(&[], &["a"]),
            stmt(&[], &["b"]),
            stmt(&["a"], &[]),
            stmt(&["b"], &[]),
        ];
        assert_eq!(score(Knot, &grouped), 0.0);
        assert_eq!(score(Knot, &interleaved), -1.0);
    }

    #[test]
    fn inverted_and_constant_valuers() {
        let s = [stmt(&[], &["x"]), stmt(&[], &["x"])];
        assert_eq!(score(Inverted(WriteRange), &s), 1.0);
        assert_eq!(score(FirstValuer, &s), 1.0);
        let r = score(RandomValuer::new(3), &s);
        assert!((0.0..100.0).contains(&r));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        for name in NAMES {
            assert_eq!(by_name(name, &mut rng).unwrap().name(), name);
        }
        assert!(by_name("fastest", &mut rng).is_err());
    }
}
