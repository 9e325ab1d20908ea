use braid_core::bundle::AstBundle;
use braid_core::grammar::Grammar;
use braid_core::tree::NodeId;
use clap::Subcommand;
use std::error::Error;
use std::fs;
use std::path::Path;

pub mod branch;
pub mod edit;
pub mod mark;
pub mod obfuscate;
pub mod reorder;

use thiserror::Error;

/// Errors raised by the command layer itself.
#[derive(Debug, Error)]
pub enum CliError {
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// Invalid transform pass specified.
    #[error("invalid pass: {0}")]
    InvalidPass(String),
    /// The tree has fewer statement blocks than the index asked for.
    #[error("no statement block {index} (the tree has {count})")]
    NoSuchBlock { index: usize, count: usize },
    /// The tree has fewer nodes than the index asked for.
    #[error("no node {index} (the tree has {count})")]
    NoSuchNode { index: usize, count: usize },
    /// None of the edit tokens could be applied.
    #[error("no edit was applied")]
    NothingApplied,
}

/// CLI subcommands for Braid.
#[derive(Subcommand)]
pub enum Cmd {
    /// Resolve markings for every statement of a tree.
    Mark(mark::MarkArgs),
    /// Change the variable markings of one node.
    Edit(edit::EditArgs),
    /// Inspect or apply orderings of one statement block.
    Reorder(reorder::ReorderArgs),
    /// Manage a branch catalog and apply its branchers.
    Branch(branch::BranchArgs),
    /// Mark and run transforms over a whole tree.
    Obfuscate(obfuscate::ObfuscateArgs),
}

/// Trait for executing CLI subcommands.
///
/// Implementors read a tree (or catalog), act on it and print or save the result.
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    fn execute(self) -> Result<(), Box<dyn Error>>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Mark(args) => args.execute(),
            Cmd::Edit(args) => args.execute(),
            Cmd::Reorder(args) => args.execute(),
            Cmd::Branch(args) => args.execute(),
            Cmd::Obfuscate(args) => args.execute(),
        }
    }
}

/// Loads a bare front-end tree or a saved bundle.
pub(crate) fn read_bundle(path: &Path) -> Result<AstBundle, Box<dyn Error>> {
    Ok(braid_core::load_bundle(
        &path.to_string_lossy(),
        true,
        Grammar::python(),
    )?)
}

/// Saves `bundle` to `output`, or to stdout when no path is given.
pub(crate) fn write_bundle(bundle: &AstBundle, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let json = bundle.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json).map_err(CliError::File)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// The `index`-th statement block in preorder.
pub(crate) fn block_at(bundle: &AstBundle, index: usize) -> Result<NodeId, CliError> {
    let blocks = bundle.tree.statement_blocks(bundle.root);
    blocks.get(index).copied().ok_or(CliError::NoSuchBlock {
        index,
        count: blocks.len(),
    })
}

/// The node with canonical id `index`, as numbered in saved bundles.
pub(crate) fn node_at(bundle: &AstBundle, index: usize) -> Result<NodeId, CliError> {
    let nodes = bundle.tree.postorder(bundle.root);
    nodes.get(index).copied().ok_or(CliError::NoSuchNode {
        index,
        count: nodes.len(),
    })
}
