pub mod branch_insert;
pub mod brancher;
pub mod obfuscator;
pub mod pass;
pub mod reorder;
pub mod statement_shuffle;

use braid_core::bundle::AstBundle;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use braid_analysis::Error as MetricsError;
use thiserror::Error;

/// Transform error type encompassing all transform module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Tree or marking operation failed.
    #[error(transparent)]
    Core(#[from] braid_core::Error),

    /// Metrics or resolution failed.
    #[error("analysis failed: {0}")]
    Metrics(#[from] MetricsError),

    /// A brancher with this name is already registered.
    #[error("brancher '{0}' already exists")]
    DuplicateBrancher(String),

    /// No brancher is registered under this name.
    #[error("unknown brancher '{0}'")]
    UnknownBrancher(String),

    /// A collection, branch or valuer name outside the recognised set.
    #[error("unknown {what} '{name}'")]
    UnknownName {
        /// What kind of name was looked up.
        what: &'static str,
        /// The name that was supplied.
        name: String,
    },

    /// An explicit region does not fit the statement sequence.
    #[error("invalid region {start}..{end} for {len} statements")]
    InvalidRegion {
        start: usize,
        end: usize,
        len: usize,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transform result type
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for tree obfuscation transforms.
pub trait Transform: Send + Sync {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to the bundle, returning whether changes were made.
    fn apply(&self, bundle: &mut AstBundle, rng: &mut StdRng) -> Result<bool>;
}

/// Configuration for transform passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Minimum metric delta for keeping a transform's result
    pub accept_threshold: f64,
    /// Keep every result that changed the tree, ignoring the threshold
    pub aggressive: bool,
    /// Maximum ratio of statement blocks to wrap in branches
    pub max_branch_ratio: f32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.0,
            aggressive: true,
            max_branch_ratio: 0.2, // Branch 20% of blocks max
        }
    }
}
