use crate::Result;
use crate::{PassConfig, Transform};
use braid_analysis::{collect_metrics, compare};
use braid_core::bundle::AstBundle;
use braid_core::seed::Seed;
use tracing::{debug, info};

/// Trait for running a sequence of obfuscation transforms on a bundle.
pub trait Pass {
    fn run(&self, bundle: &mut AstBundle, passes: &[Box<dyn Transform>], seed: &Seed)
        -> Result<Vec<String>>;
}

/// Default implementation of the Pass trait.
///
/// Each transform runs on a snapshot with its own stream of the seed. The snapshot replaces the
/// bundle when the transform reports a change and, unless the configuration is aggressive, the
/// metric delta reaches the acceptance threshold. Returns the names of the transforms that were
/// kept.
#[derive(Debug, Clone, Default)]
pub struct DefaultPass {
    pub config: PassConfig,
}

impl DefaultPass {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }
}

impl Pass for DefaultPass {
    fn run(
        &self,
        bundle: &mut AstBundle,
        passes: &[Box<dyn Transform>],
        seed: &Seed,
    ) -> Result<Vec<String>> {
        let mut applied = Vec::new();

        for (index, pass) in passes.iter().enumerate() {
            let repeat = passes[..index]
                .iter()
                .filter(|p| p.name() == pass.name())
                .count();
            let mut rng = seed.stream(&format!("{}/{}", pass.name(), repeat));
            let before = collect_metrics(bundle)?;
            let mut snapshot = bundle.clone();

            let mutated = pass.apply(&mut snapshot, &mut rng)?;
            if !mutated {
                continue;
            }

            let after = collect_metrics(&snapshot)?;
            let delta = compare(&before, &after);

            info!("{:>14} Δ{:+.2}", pass.name(), delta);
            if !self.config.aggressive && delta < self.config.accept_threshold {
                debug!(
                    "Rejecting {} (Δ{:+.2} below {:.2})",
                    pass.name(),
                    delta,
                    self.config.accept_threshold
                );
                continue;
            }
            *bundle = snapshot;
            applied.push(pass.name().to_string());
        }
        Ok(applied)
    }
}
