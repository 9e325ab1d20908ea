//! Module for the `edit` subcommand, which changes the variable markings of one node.
//!
//! Edits are short tokens whose grammar depends on the marking kind:
//!
//! - reads / writes: `a-x` (unknown scope), `l-x`, `n-x`, `g-x`, `u-x` add; `r-x` removes
//! - scope: `l-x`, `n-x`, `g-x` declare; `r-x` removes
//! - indirectrw: `(r|nr|w|nw|rm)-(f|n|g)-x` sets read / not read / write / not write, or removes

use super::{node_at, read_bundle, write_bundle, CliError};
use braid_core::marking::{EditAction, MarkKind, ScopeCode, VarEdit};
use clap::Args;
use std::error::Error;
use std::path::PathBuf;
use tracing::warn;

/// Arguments for the `edit` subcommand.
#[derive(Args)]
pub struct EditArgs {
    /// Saved bundle as JSON.
    pub input: PathBuf,
    /// Canonical id of the node to edit (its index in a saved bundle).
    #[arg(long)]
    node: usize,
    /// Marking kind: reads, writes, scope or indirectrw.
    #[arg(long)]
    kind: MarkKind,
    /// Edit tokens.
    #[arg(required = true, allow_hyphen_values = true)]
    edits: Vec<String>,
    /// Where to save the bundle (defaults to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl super::Command for EditArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let EditArgs {
            input,
            node,
            kind,
            edits,
            output,
        } = self;

        let mut bundle = read_bundle(&input)?;
        let target = node_at(&bundle, node)?;

        let mut changed = false;
        for token in &edits {
            let edit = match parse_token(kind, token) {
                Ok(edit) => edit,
                Err(reason) => {
                    warn!("Skipping '{}': {}", token, reason);
                    continue;
                }
            };
            match bundle.markings.apply_edit(target, kind, &edit) {
                Ok(true) => changed = true,
                Ok(false) => warn!("'{}' changed nothing", token),
                Err(err) => warn!("Could not apply '{}': {}", token, err),
            }
        }
        if !changed {
            return Err(CliError::NothingApplied.into());
        }

        write_bundle(&bundle, Some(output.as_deref().unwrap_or(&input)))
    }
}

fn scope_code(code: &str) -> Result<ScopeCode, String> {
    match code {
        "l" => Ok(ScopeCode::Local),
        "n" => Ok(ScopeCode::Nonlocal),
        "g" => Ok(ScopeCode::Global),
        "u" => Ok(ScopeCode::Unknown),
        "f" => Ok(ScopeCode::Free),
        other => Err(format!("unrecognised scope '{other}'")),
    }
}

/// Parses one edit token for `kind`. Scope and name validity is left to
/// [`braid_core::marking::MarkingStore::apply_edit`].
pub fn parse_token(kind: MarkKind, token: &str) -> Result<VarEdit, String> {
    match kind {
        MarkKind::IndirectRw => {
            let mut parts = token.splitn(3, '-');
            let (Some(action), Some(scope), Some(name)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err("expected action-scope-name".to_string());
            };
            let action = match action {
                "r" => EditAction::Read,
                "nr" => EditAction::NoRead,
                "w" => EditAction::Write,
                "nw" => EditAction::NoWrite,
                "rm" => EditAction::Remove,
                other => return Err(format!("unrecognised action '{other}'")),
            };
            Ok(VarEdit::new(action, Some(scope_code(scope)?), name))
        }
        MarkKind::Reads | MarkKind::Writes | MarkKind::Scope => {
            let Some((action, name)) = token.split_once('-') else {
                return Err("expected action-name".to_string());
            };
            match action {
                "r" => Ok(VarEdit::new(EditAction::Remove, None, name)),
                "a" if kind != MarkKind::Scope => {
                    Ok(VarEdit::new(EditAction::Add, Some(ScopeCode::Unknown), name))
                }
                "" => Err("missing action".to_string()),
                code => Ok(VarEdit::new(EditAction::Add, Some(scope_code(code)?), name)),
            }
        }
        MarkKind::Visible | MarkKind::Breaks => Err(format!("{kind} has no variable edits")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_tokens() {
        assert_eq!(
            parse_token(MarkKind::Reads, "g-x").unwrap(),
            VarEdit::new(EditAction::Add, Some(ScopeCode::Global), "x")
        );
        assert_eq!(
            parse_token(MarkKind::Writes, "a-x").unwrap(),
            VarEdit::new(EditAction::Add, Some(ScopeCode::Unknown), "x")
        );
        assert_eq!(
            parse_token(MarkKind::Scope, "r-x").unwrap(),
            VarEdit::new(EditAction::Remove, None, "x")
        );
        assert!(parse_token(MarkKind::Scope, "a-x").is_err());
        assert!(parse_token(MarkKind::Reads, "x").is_err());
        assert!(parse_token(MarkKind::Reads, "-x").is_err());
        assert!(parse_token(MarkKind::Reads, "q-x").is_err());
    }

    #[test]
    fn indirect_tokens() {
        assert_eq!(
            parse_token(MarkKind::IndirectRw, "nr-f-x").unwrap(),
            VarEdit::new(EditAction::NoRead, Some(ScopeCode::Free), "x")
        );
        assert_eq!(
            parse_token(MarkKind::IndirectRw, "w-g-a_b").unwrap(),
            VarEdit::new(EditAction::Write, Some(ScopeCode::Global), "a_b")
        );
        assert!(parse_token(MarkKind::IndirectRw, "r-x").is_err());
        assert!(parse_token(MarkKind::IndirectRw, "x-g-y").is_err());
        assert!(parse_token(MarkKind::Visible, "g-x").is_err());
    }
}
