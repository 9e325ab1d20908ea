//! Module for the `obfuscate` subcommand, which marks a tree and runs a list of transforms over
//! it.
//!
//! This module reads the input tree and uses the obfuscation pipeline from `braid-transform`
//! to apply transforms and output the rewritten bundle.

use super::{read_bundle, write_bundle, CliError};
use braid_core::grammar::Grammar;
use braid_core::seed::Seed;
use braid_transform::branch_insert::Branch;
use braid_transform::brancher::BrancherSet;
use braid_transform::obfuscator::{obfuscate, ObfuscationConfig};
use braid_transform::reorder::ReorderConfig;
use braid_transform::statement_shuffle::Reorder;
use braid_transform::{PassConfig, Transform};
use clap::Args;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the `obfuscate` subcommand.
#[derive(Args)]
pub struct ObfuscateArgs {
    /// Tree or saved bundle as JSON.
    pub input: PathBuf,
    /// Where to save the result (stdout if absent).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Seed for deterministic obfuscation
    #[arg(long)]
    seed: Option<Seed>,
    /// Comma-separated list of transforms: reorder, branch.
    #[arg(long, default_value = "reorder")]
    passes: String,
    /// Valuer used by the reorder transform.
    #[arg(long, default_value = "rwrange")]
    valuer: String,
    /// Brancher catalog used by the branch transform.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Skip the automatic markup before the transforms.
    #[arg(long)]
    no_mark: bool,
    /// Pass acceptance settings as JSON.
    #[arg(long, value_name = "PATH")]
    pass_config: Option<PathBuf>,
    /// Path to emit the metrics report as JSON (optional).
    #[arg(long)]
    emit: Option<PathBuf>,
}

impl super::Command for ObfuscateArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let ObfuscateArgs {
            input,
            output,
            seed,
            passes,
            valuer,
            catalog,
            no_mark,
            pass_config,
            emit,
        } = self;

        let mut bundle = read_bundle(&input)?;

        let pass = match pass_config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path).map_err(CliError::File)?)?,
            None => PassConfig::default(),
        };
        let transforms = build_passes(&passes, &valuer, catalog.as_deref(), &pass)?;

        let config = ObfuscationConfig {
            transforms,
            mark: !no_mark,
            pass,
            ..seed.map(ObfuscationConfig::with_seed).unwrap_or_default()
        };
        tracing::info!("Seed: {}", config.seed);

        let result = obfuscate(&mut bundle, config)?;
        eprintln!(
            "Applied [{}]: potency {:.2} -> {:.2}, {} -> {} nodes",
            result.transforms_applied.join(", "),
            result.before.potency,
            result.after.potency,
            result.before.node_count,
            result.after.node_count
        );

        if let Some(path) = emit.as_ref() {
            fs::write(path, serde_json::to_string_pretty(&result)?).map_err(CliError::File)?;
            eprintln!("Wrote metrics report to {}", path.display());
        }

        write_bundle(&bundle, output.as_deref())
    }
}

/// Builds a list of transform passes from a comma-separated string.
pub(crate) fn build_passes(
    list: &str,
    valuer: &str,
    catalog: Option<&Path>,
    pass: &PassConfig,
) -> Result<Vec<Box<dyn Transform>>, Box<dyn Error>> {
    list.split(',')
        .filter(|s| !s.is_empty())
        .map(|name| match name.trim() {
            "reorder" => Ok(Box::new(Reorder {
                config: ReorderConfig::default(),
                valuer: valuer.to_string(),
                invert: false,
            }) as Box<dyn Transform>),
            "branch" => {
                let branchers = match catalog {
                    Some(path) => BrancherSet::from_json(
                        &Grammar::python(),
                        &fs::read_to_string(path).map_err(CliError::File)?,
                    )?,
                    None => return Err(CliError::InvalidPass("branch needs --catalog".into()).into()),
                };
                Ok(Box::new(Branch::new(branchers, pass.max_branch_ratio)) as Box<dyn Transform>)
            }
            _ => Err(CliError::InvalidPass(name.to_string()).into()),
        })
        .collect()
}
