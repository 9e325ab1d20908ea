use crate::reorder::{valuers, ReorderConfig, Reorderer};
use crate::reorder::valuers::{Inverted, Valuer};
use crate::{Result, Transform};
use braid_core::bundle::AstBundle;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

/// Rewrites every fully marked statement block into its best-scoring allowed order.
#[derive(Debug, Clone)]
pub struct Reorder {
    pub config: ReorderConfig,
    /// Name of the valuer, see [`valuers::NAMES`].
    pub valuer: String,
    /// Prefer the lowest score instead of the highest.
    pub invert: bool,
}

impl Default for Reorder {
    fn default() -> Self {
        Self {
            config: ReorderConfig::default(),
            valuer: "rwrange".to_string(),
            invert: false,
        }
    }
}

impl Reorder {
    pub fn new(valuer: &str) -> Self {
        Self {
            valuer: valuer.to_string(),
            ..Self::default()
        }
    }

    fn valuer(&self, rng: &mut StdRng) -> Result<Box<dyn Valuer>> {
        let valuer = valuers::by_name(&self.valuer, rng)?;
        Ok(if self.invert {
            Box::new(Inverted(valuer))
        } else {
            valuer
        })
    }
}

impl Transform for Reorder {
    fn name(&self) -> &'static str {
        "Reorder"
    }

    fn apply(&self, bundle: &mut AstBundle, rng: &mut StdRng) -> Result<bool> {
        let mut valuer = self.valuer(rng)?;
        let mut changed = false;
        let mut skipped = 0;

        for block in bundle.tree.statement_blocks(bundle.root) {
            let Some(statements) = bundle.tree.list_items(block).map(<[_]>::to_vec) else {
                continue;
            };
            if statements.len() < 2 {
                continue;
            }
            let reorderer = Reorderer::new(&bundle.markings, &statements)
                .with_config(self.config)
                .with_seed(rng.random());
            if !reorderer.check_markings() {
                skipped += 1;
                continue;
            }
            let Some(best) = reorderer.best_permutation(&mut valuer) else {
                continue;
            };
            let reordered = reorderer.permute(&best);
            if reordered != statements {
                debug!("Reordered block {}: {:?}", block, best);
                bundle.tree.set_list(block, reordered)?;
                changed = true;
            }
        }

        if skipped > 0 {
            debug!("Skipped {} blocks with incomplete markings", skipped);
        }
        Ok(changed)
    }
}
