//! Module for the `mark` subcommand, which resolves markings for every statement of a tree.

use super::{read_bundle, write_bundle, CliError};
use braid_analysis::automarker::RuleTable;
use braid_analysis::{AutoMarker, Interaction, MarkupConfig, NoInteraction};
use braid_core::marking::{parse_kinds, Markings};
use braid_core::tree::{NodeId, Tree};
use clap::Args;
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Arguments for the `mark` subcommand.
#[derive(Args)]
pub struct MarkArgs {
    /// Tree or saved bundle as JSON.
    pub input: PathBuf,
    /// Where to save the marked bundle (stdout if absent).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Resolution settings as JSON.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Comma-separated marking kinds to resolve, overriding the configuration.
    #[arg(long)]
    kinds: Option<String>,
    /// Confirm every resolved node on the terminal.
    #[arg(long)]
    review: bool,
}

impl super::Command for MarkArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let MarkArgs {
            input,
            output,
            config,
            kinds,
            review,
        } = self;

        let mut bundle = read_bundle(&input)?;
        let mut config = match config {
            Some(path) => {
                MarkupConfig::from_json(&fs::read_to_string(path).map_err(CliError::File)?)?
            }
            None => MarkupConfig::default(),
        };
        if let Some(kinds) = kinds {
            config.kinds = parse_kinds(&kinds)?;
        }
        let marker = AutoMarker::new(config, RuleTable::python())?;

        let report = if review {
            marker.mark_bundle(&mut bundle, &mut TerminalReview)?
        } else {
            marker.mark_bundle(&mut bundle, &mut NoInteraction)?
        };
        eprintln!(
            "Marked {} of {} statements in {} blocks ({} aborted)",
            report.resolved, report.statements, report.blocks, report.aborted
        );

        write_bundle(&bundle, output.as_deref())
    }
}

/// Shows each result on stderr and reads a yes/no answer from stdin.
struct TerminalReview;

impl Interaction for TerminalReview {
    fn review(&mut self, tree: &Tree, node: NodeId, result: &Markings) -> bool {
        let shown = serde_json::to_string(result).unwrap_or_default();
        eprint!("{} {}: {} accept? [Y/n] ", tree.kind(node), node, shown);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        !matches!(answer.trim(), "n" | "N" | "no")
    }
}
