use crate::pass::{DefaultPass, Pass};
use crate::{PassConfig, Result, Transform};
use braid_analysis::automarker::MarkupReport;
use braid_analysis::{collect_metrics, AutoMarker, Metrics, NoInteraction};
use braid_core::bundle::AstBundle;
use braid_core::seed::Seed;
use serde::{Deserialize, Serialize};

/// Configuration for the obfuscation pipeline
pub struct ObfuscationConfig {
    /// Seed for deterministic obfuscation
    pub seed: Seed,
    /// List of transforms to apply
    pub transforms: Vec<Box<dyn Transform>>,
    /// Auto-mark every statement block before the transforms run
    pub mark: bool,
    /// Acceptance settings for the pass
    pub pass: PassConfig,
}

impl ObfuscationConfig {
    /// Create config with a specific seed
    pub fn with_seed(seed: Seed) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            seed: Seed::generate(),
            transforms: Vec::new(),
            mark: true,
            pass: PassConfig::default(),
        }
    }
}

impl std::fmt::Debug for ObfuscationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObfuscationConfig")
            .field(
                "transforms",
                &format!("{} transforms", self.transforms.len()),
            )
            .field("mark", &self.mark)
            .field("pass", &self.pass)
            .finish()
    }
}

/// Result of the obfuscation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationResult {
    /// Metrics of the input tree
    pub before: Metrics,
    /// Metrics of the output tree
    pub after: Metrics,
    /// Names of the transforms whose results were kept
    pub transforms_applied: Vec<String>,
    /// Summary of the markup run, if one was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<MarkupReport>,
}

/// Main obfuscation pipeline. The bundle is rewritten in place.
pub fn obfuscate(bundle: &mut AstBundle, config: ObfuscationConfig) -> Result<ObfuscationResult> {
    tracing::debug!("Starting obfuscation pipeline:");
    tracing::debug!("  User transforms: {}", config.transforms.len());

    let markup = if config.mark {
        let report = AutoMarker::python().mark_bundle(bundle, &mut NoInteraction)?;
        tracing::debug!(
            "  Marked {} of {} statements",
            report.resolved,
            report.statements
        );
        Some(report)
    } else {
        None
    };

    let before = collect_metrics(bundle)?;
    tracing::debug!(
        "  Input: {} nodes, {} statements, {} blocks",
        before.node_count,
        before.statement_count,
        before.block_count
    );

    let pass = DefaultPass::new(config.pass);
    let transforms_applied = pass.run(bundle, &config.transforms, &config.seed)?;

    let after = collect_metrics(bundle)?;
    tracing::debug!("Transform summary:");
    tracing::debug!("  Applied: {:?}", transforms_applied);
    tracing::debug!(
        "  Output: {} nodes ({:+}), potency {:.2} ({:+.2})",
        after.node_count,
        after.node_count as i64 - before.node_count as i64,
        after.potency,
        after.potency - before.potency
    );

    Ok(ObfuscationResult {
        before,
        after,
        transforms_applied,
        markup,
    })
}
