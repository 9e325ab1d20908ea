//! Partitioning around breaking statements and the per-partition dependency graph.

use super::StatementFacts;
use petgraph::graph::{DiGraph, NodeIndex};
use std::ops::Range;

/// Splits a statement sequence into reorderable partitions.
///
/// Every breaking statement is a singleton; maximal runs of non-breaking statements form the
/// remaining partitions. The ranges are contiguous and cover `0..facts.len()` in order.
pub fn partition(facts: &[&StatementFacts]) -> Vec<Range<usize>> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, statement) in facts.iter().enumerate() {
        if statement.is_breaking() {
            if start < i {
                parts.push(start..i);
            }
            parts.push(i..i + 1);
            start = i + 1;
        }
    }
    if start < facts.len() {
        parts.push(start..facts.len());
    }
    parts
}

/// Ordering constraints inside one partition.
///
/// Node weights are statement positions in the whole sequence; an edge `a -> b` means `a` must
/// stay before `b`.
pub(crate) fn dependencies(facts: &[&StatementFacts], part: Range<usize>) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::with_capacity(part.len(), 0);
    let nodes: Vec<NodeIndex> = part.clone().map(|i| graph.add_node(i)).collect();
    for (a, i) in part.clone().enumerate() {
        for (b, j) in part.clone().enumerate().skip(a + 1) {
            if facts[i].conflicts_with(facts[j]) {
                graph.add_edge(nodes[a], nodes[b], ());
            }
        }
    }
    graph
}
