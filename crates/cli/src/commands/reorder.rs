//! Module for the `reorder` subcommand, which inspects or applies orderings of one statement
//! block.

use super::{block_at, read_bundle, write_bundle};
use braid_core::bundle::AstBundle;
use braid_core::seed::Seed;
use braid_core::tree::NodeId;
use braid_transform::reorder::valuers::{self, Inverted, Valuer};
use braid_transform::reorder::{ReorderConfig, Reorderer, DEFAULT_LIMIT};
use clap::{Args, ValueEnum};
use rand::Rng;
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Show the block and whether it is fully marked.
    Current,
    /// Show the partitions.
    Split,
    /// Count the candidates.
    Number,
    /// Count the distinct candidates.
    Unique,
    /// List every candidate.
    Permutations,
    /// Show (and with --edit, apply) the best candidate.
    Best,
}

/// Arguments for the `reorder` subcommand.
#[derive(Args)]
pub struct ReorderArgs {
    /// Saved bundle as JSON.
    pub input: PathBuf,
    /// Index of the statement block, in preorder.
    #[arg(long, default_value_t = 0)]
    block: usize,
    #[arg(value_enum, default_value_t = Action::Best)]
    action: Action,
    /// Valuer used by `best`.
    #[arg(short, long, default_value = "random", value_parser = clap::builder::PossibleValuesParser::new(valuers::NAMES))]
    valuer: String,
    /// Prefer the lowest score.
    #[arg(short, long)]
    invert: bool,
    /// Write the best ordering back to the tree.
    #[arg(short, long)]
    edit: bool,
    /// Check every candidate against the ordering constraints.
    #[arg(short = 't', long)]
    safe: bool,
    /// Enumerate candidates in a shuffled order.
    #[arg(short, long)]
    random: bool,
    /// Maximum number of candidates to enumerate.
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,
    /// Fill missing markings with pessimistic defaults first.
    #[arg(long)]
    fill: bool,
    /// Seed for the random valuer and shuffled enumeration
    #[arg(long)]
    seed: Option<Seed>,
    /// Where to save the bundle after --edit (defaults to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl super::Command for ReorderArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let mut bundle = read_bundle(&self.input)?;
        let block = block_at(&bundle, self.block)?;
        let statements = bundle.tree.list_items(block).unwrap_or_default().to_vec();

        if self.fill {
            let filled = Reorderer::fill_markings(&mut bundle.markings, &statements);
            println!("Filled {filled} missing markings.");
        }

        let seed = self.seed.clone().unwrap_or_else(Seed::generate);
        let mut rng = seed.stream("reorder");
        let config = ReorderConfig {
            limit: self.limit,
            random: self.random,
            safe: self.safe,
        };
        let reorderer = Reorderer::new(&bundle.markings, &statements)
            .with_config(config)
            .with_seed(rng.random());

        if self.action == Action::Current {
            let order: Vec<usize> = (0..statements.len()).collect();
            print_block(&bundle, &statements, &order, true);
            if reorderer.check_markings() {
                println!("The statements can be reordered.");
            } else {
                println!("The statements are not fully marked up, so cannot be reordered.");
            }
            return Ok(());
        }
        if !reorderer.check_markings() {
            println!("The statements are not fully marked up, so cannot be reordered.");
            return Ok(());
        }

        match self.action {
            Action::Current => {}
            Action::Split => {
                for part in reorderer.partition().unwrap_or_default() {
                    print_block(&bundle, &statements, &part.collect::<Vec<_>>(), false);
                    println!("---");
                }
            }
            Action::Number => {
                let total = reorderer.count().unwrap_or_default();
                println!("The total number of permutations for this block is {total}");
            }
            Action::Unique => {
                let total = reorderer.unique_count().unwrap_or_default();
                println!("The total number of unique permutations for this block is {total}");
            }
            Action::Permutations => {
                for perm in reorderer.permutations().into_iter().flatten() {
                    print_block(&bundle, &statements, &perm, false);
                    println!();
                }
                println!("There are no other permutations.");
            }
            Action::Best => {
                let valuer = valuers::by_name(&self.valuer, &mut rng)?;
                let mut valuer: Box<dyn Valuer> = if self.invert {
                    Box::new(Inverted(valuer))
                } else {
                    valuer
                };
                let Some(best) = reorderer.best_permutation(&mut valuer) else {
                    println!("No ordering was found.");
                    return Ok(());
                };
                print_block(&bundle, &statements, &best, false);
                println!();
                if self.edit {
                    bundle.tree.set_list(block, reorderer.permute(&best))?;
                    write_bundle(&bundle, Some(self.output.as_deref().unwrap_or(&self.input)))?;
                    println!("The block has been reordered.");
                } else {
                    println!("This is the chosen rearrangement. To write it to the tree see --edit.");
                }
            }
        }
        Ok(())
    }
}

/// One line per statement: original position and node kind.
fn print_block(bundle: &AstBundle, statements: &[NodeId], order: &[usize], markings: bool) {
    for i in order {
        let statement = statements[*i];
        print!("{}: {}", i, bundle.tree.kind(statement));
        if markings {
            let complete = Reorderer::new(&bundle.markings, &[statement]).check_markings();
            print!(" - {}", if complete { "Completely marked" } else { "Not marked" });
        }
        println!();
    }
}
