pub mod automarker;
pub mod metrics;
pub use automarker::{AutoMarker, Interaction, MarkupConfig, NoInteraction, Resolution};
pub use metrics::{Metrics, collect_metrics, compare};

use braid_core::marking::MarkKind;
use thiserror::Error;

/// Error type for marking resolution and metrics.
#[derive(Debug, Error)]
pub enum Error {
    /// Tree or marking failure from the core.
    #[error(transparent)]
    Core(#[from] braid_core::Error),
    /// A resolution strategy was listed more than once.
    #[error("strategy {0} is specified more than once")]
    DuplicateStrategy(String),
    /// A configured default does not belong to the kind it is registered for.
    #[error("default registered for {kind} holds a {found} marking")]
    MismatchedDefault { kind: MarkKind, found: MarkKind },
    /// The tree has no nodes to measure.
    #[error("tree is empty")]
    EmptyTree,
    /// Configuration or rule table JSON was malformed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Analysis result type
pub type Result<T> = std::result::Result<T, Error>;
