//! Module for the `branch` subcommand: edits a brancher catalog saved as JSON and applies its
//! branchers to statement blocks.

use super::{block_at, read_bundle, write_bundle, CliError};
use braid_core::ast::Ast;
use braid_core::grammar::Grammar;
use braid_core::seed::Seed;
use braid_transform::brancher::{
    BranchKind, Brancher, BrancherSet, CollectionKind, ExceptionStatement, Expression, Predicate,
    Region, SimpleStatement,
};
use clap::{Args, Subcommand};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the `branch` subcommand.
#[derive(Args)]
pub struct BranchArgs {
    /// Brancher catalog as JSON; created on first save.
    pub catalog: PathBuf,
    #[command(subcommand)]
    action: BranchAction,
}

#[derive(Subcommand)]
enum BranchAction {
    /// Add a brancher.
    New {
        name: String,
        /// Variable the initial expressions are assigned to.
        state: String,
    },
    /// Delete a brancher.
    Delete { name: String },
    /// Create an empty collection.
    Create {
        name: String,
        collection: CollectionKind,
    },
    /// Insert a fragment read from a JSON file.
    Insert {
        name: String,
        collection: CollectionKind,
        fragment: PathBuf,
        /// Truth of a predicate right after initialisation.
        #[arg(long)]
        truth: bool,
        /// An exception statement raises one of its types.
        #[arg(long)]
        raises: bool,
        /// Comma-separated exception types caught around an exception statement.
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
    },
    /// Remove an entry by id.
    Remove {
        name: String,
        collection: CollectionKind,
        id: usize,
    },
    /// List branchers, or one brancher's collections and what it can build.
    Show { name: Option<String> },
    /// Wrap part of a statement block in a branch.
    Apply {
        name: String,
        kind: BranchKind,
        /// Saved bundle as JSON.
        input: PathBuf,
        /// Index of the statement block, in preorder.
        #[arg(long, default_value_t = 0)]
        block: usize,
        /// First wrapped statement; with --end, an explicit region.
        #[arg(long, requires = "end")]
        start: Option<usize>,
        /// One past the last wrapped statement.
        #[arg(long, requires = "start")]
        end: Option<usize>,
        /// Statement a random region must contain.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        pivot: Option<usize>,
        #[arg(long)]
        seed: Option<Seed>,
        /// Where to save the bundle (defaults to the input).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl super::Command for BranchArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let grammar = Grammar::python();
        let mut set = load(&grammar, &self.catalog)?;

        match self.action {
            BranchAction::New { name, state } => {
                set.add(Brancher::new(&name, &state)?)?;
            }
            BranchAction::Delete { name } => {
                set.remove(&name)?;
            }
            BranchAction::Create { name, collection } => {
                if !set.get_mut(&name)?.create(collection) {
                    println!("{name} already has a {collection} collection.");
                    return Ok(());
                }
            }
            BranchAction::Insert {
                name,
                collection,
                fragment,
                truth,
                raises,
                types,
            } => {
                let ast = Ast::from_json(&fs::read_to_string(&fragment).map_err(CliError::File)?)?;
                let brancher = set.get_mut(&name)?;
                let id = match collection {
                    CollectionKind::Predicates => brancher
                        .predicates_mut()
                        .insert(&grammar, Predicate { expr: ast, truth })?,
                    CollectionKind::Exceptions => brancher.exceptions_mut().insert(
                        &grammar,
                        ExceptionStatement {
                            stmt: ast,
                            raises,
                            types,
                        },
                    )?,
                    CollectionKind::Initial => {
                        brancher.initial_mut().insert(&grammar, Expression(ast))?
                    }
                    CollectionKind::Preserving => brancher
                        .preserving_mut()
                        .insert(&grammar, SimpleStatement(ast))?,
                    CollectionKind::Destroying => brancher
                        .destroying_mut()
                        .insert(&grammar, SimpleStatement(ast))?,
                    CollectionKind::Randomising => brancher
                        .randomising_mut()
                        .insert(&grammar, SimpleStatement(ast))?,
                };
                println!("Inserted {collection} entry {id} into {name}.");
            }
            BranchAction::Remove {
                name,
                collection,
                id,
            } => {
                let brancher = set.get_mut(&name)?;
                let removed = match collection {
                    CollectionKind::Predicates => brancher.predicates_mut().remove(id).is_some(),
                    CollectionKind::Exceptions => brancher.exceptions_mut().remove(id).is_some(),
                    CollectionKind::Initial => brancher.initial_mut().remove(id).is_some(),
                    CollectionKind::Preserving => brancher.preserving_mut().remove(id).is_some(),
                    CollectionKind::Destroying => brancher.destroying_mut().remove(id).is_some(),
                    CollectionKind::Randomising => brancher.randomising_mut().remove(id).is_some(),
                };
                if !removed {
                    println!("{name} has no {collection} entry {id}.");
                    return Ok(());
                }
            }
            BranchAction::Show { name: None } => {
                for brancher in set.iter() {
                    println!("{} (state: {})", brancher.name(), brancher.state());
                }
                return Ok(());
            }
            BranchAction::Show { name: Some(name) } => {
                let brancher = set.get_mut(&name)?;
                show(brancher);
                return Ok(());
            }
            BranchAction::Apply {
                name,
                kind,
                input,
                block,
                start,
                end,
                pivot,
                seed,
                output,
            } => {
                let brancher = set.get_mut(&name)?;
                let mut bundle = read_bundle(&input)?;
                let block = block_at(&bundle, block)?;
                let statements = bundle.tree.list_items(block).unwrap_or_default().to_vec();
                let region = match (start, end) {
                    (Some(start), Some(end)) => Region::Range { start, end },
                    _ => Region::Around { pivot },
                };
                let seed = seed.clone().unwrap_or_else(Seed::generate);
                let mut rng = seed.stream("branch");

                let outcome = brancher.branch(
                    kind,
                    &mut bundle.tree,
                    &bundle.markings,
                    &statements,
                    region,
                    &mut rng,
                )?;
                match outcome {
                    None => println!("{name} cannot build a {kind} branch: {}", missing(brancher, kind)),
                    Some(outcome) if !outcome.success => {
                        println!("The {kind} branch was refused for this region.")
                    }
                    Some(outcome) => {
                        bundle.tree.set_list(block, outcome.statements)?;
                        write_bundle(&bundle, Some(output.as_deref().unwrap_or(&input)))?;
                        println!("Inserted a {kind} branch.");
                    }
                }
                return Ok(());
            }
        }

        fs::write(&self.catalog, set.to_json()?).map_err(CliError::File)?;
        Ok(())
    }
}

/// Catalog at `path`, or an empty one if the file does not exist yet.
fn load(grammar: &Grammar, path: &Path) -> Result<BrancherSet, Box<dyn Error>> {
    if !path.exists() {
        return Ok(BrancherSet::new());
    }
    let json = fs::read_to_string(path).map_err(CliError::File)?;
    Ok(BrancherSet::from_json(grammar, &json)?)
}

fn show(brancher: &Brancher) {
    println!("{} (state: {})", brancher.name(), brancher.state());
    for collection in CollectionKind::ALL {
        match brancher.len(collection) {
            Some(len) => println!("  {collection}: {len} entries"),
            None => println!("  {collection}: -"),
        }
    }
    for kind in BranchKind::ALL {
        let status = match brancher.availability(kind) {
            Some(true) => "available",
            Some(false) => "empty collections",
            None => "missing collections",
        };
        println!("  {kind} branch: {status}");
    }
}

/// Required collections of `kind` that are missing or empty.
fn missing(brancher: &Brancher, kind: BranchKind) -> String {
    kind.requires()
        .iter()
        .filter(|c| brancher.len(**c).unwrap_or_default() == 0)
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
