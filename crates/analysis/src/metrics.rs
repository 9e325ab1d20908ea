use crate::{Error, Result};
/// Module for computing structural metrics to evaluate tree obfuscation transforms.
///
/// Implements a minimal set of metrics quantified by tree size, statement-block structure,
/// nesting depth, and marking coverage to assess transform potency (analyst effort). The module
/// provides functions to collect metrics from an `AstBundle` and compare pre- and
/// post-transform states.
///
/// # Usage
/// ```rust,ignore
/// let json = std::fs::read_to_string("module.json").unwrap();
/// let bundle = AstBundle::from_json(Grammar::python(), &json).unwrap();
/// let metrics = metrics::collect_metrics(&bundle).unwrap();
/// println!("{}", serde_json::to_string_pretty(&metrics).unwrap());
/// ```
use braid_core::bundle::AstBundle;
use braid_core::marking::{KindSet, MarkKind};
use braid_core::tree::{NodeId, Tree};
use serde::{Deserialize, Serialize};

/// Kinds a statement needs before the reorderer will consider it.
const REORDER_KINDS: [MarkKind; 5] = [
    MarkKind::Breaks,
    MarkKind::Visible,
    MarkKind::Reads,
    MarkKind::Writes,
    MarkKind::Scope,
];

/// Represents a set of structural metrics for evaluating tree obfuscation.
///
/// Metrics include the number of reachable nodes, statements and statement blocks, the
/// deepest nesting level, how many statements carry enough markings to be reordered, and a
/// composite potency score. Used to compare pre- and post-transform states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Number of nodes reachable from the root.
    pub node_count: usize,
    /// Number of statements across all statement blocks.
    pub statement_count: usize,
    /// Number of statement blocks (lists whose items are all statements).
    pub block_count: usize,
    /// Length of the longest root-to-leaf path, counting the root as depth 1.
    pub max_depth: usize,
    /// Statements carrying every marking the reorderer requires.
    pub marked_statements: usize,
    /// Composite potency score (heuristic based on statements, blocks and depth).
    pub potency: f64,
}

/// Collects metrics from a bundle's tree and marking store.
///
/// Walks every node reachable from the bundle root, counting statements in statement blocks and
/// the statements among them that are fully marked for reordering.
///
/// # Arguments
/// * `bundle` - The tree, root and markings to measure.
///
/// # Returns
/// A `Metrics` struct with computed metrics, or an error if the root is an empty node.
pub fn collect_metrics(bundle: &AstBundle) -> Result<Metrics> {
    let tree = &bundle.tree;
    if !tree.contains(bundle.root) || tree.is_empty(bundle.root) {
        return Err(Error::EmptyTree);
    }

    let blocks = tree.statement_blocks(bundle.root);
    let statements: Vec<NodeId> = blocks
        .iter()
        .filter_map(|block| tree.list_items(*block))
        .flatten()
        .copied()
        .collect();
    let required: KindSet = REORDER_KINDS.into();
    let marked_statements = statements
        .iter()
        .filter(|s| bundle.markings.has_all(**s, &required))
        .count();
    let max_depth = max_depth(tree, bundle.root);

    Ok(Metrics {
        node_count: tree.descendants(bundle.root).len(),
        statement_count: statements.len(),
        block_count: blocks.len(),
        max_depth,
        marked_statements,
        potency: score(statements.len(), blocks.len(), max_depth),
    })
}

/// Computes the nesting depth of the subtree at `root`.
///
/// # Arguments
/// * `tree` - The arena holding the subtree.
/// * `root` - Node at depth 1.
///
/// # Returns
/// The largest depth of any node under `root`.
pub fn max_depth(tree: &Tree, root: NodeId) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(root, 1)];
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(tree.children(node).into_iter().map(|(_, c)| (c, depth + 1)));
    }
    deepest
}

/// Computes a composite potency score for the tree.
///
/// Statement count dominates; splitting code into more blocks and nesting it deeper both make
/// the control structure harder to follow.
fn score(statements: usize, blocks: usize, depth: usize) -> f64 {
    statements as f64 + 2.0 * blocks as f64 + 5.0 * (depth.max(1) as f64).log2()
}

/// Compares two sets of metrics to evaluate a transform.
///
/// # Arguments
/// * `before` - Metrics before the transform.
/// * `after` - Metrics after the transform.
///
/// # Returns
/// The change in potency, discounted for tree growth (positive is better).
pub fn compare(before: &Metrics, after: &Metrics) -> f64 {
    after.potency - before.potency - 0.05 * (after.node_count as f64 - before.node_count as f64)
}
