use crate::brancher::{BranchKind, Brancher, BrancherSet, Region};
use crate::{Result, Transform};
use braid_core::bundle::AstBundle;
use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use tracing::debug;

/// Wraps random regions of random statement blocks in branches from a brancher set.
#[derive(Debug, Clone)]
pub struct Branch {
    pub branchers: BrancherSet,
    /// Share of statement blocks to branch, at least one.
    pub max_ratio: f32,
}

impl Branch {
    pub fn new(branchers: BrancherSet, max_ratio: f32) -> Self {
        Self {
            branchers,
            max_ratio,
        }
    }

    /// A brancher and one of the shapes it can build.
    fn pick<'b>(&'b self, rng: &mut StdRng) -> Option<(&'b Brancher, BranchKind)> {
        let mut options: Vec<(&Brancher, BranchKind)> = self
            .branchers
            .iter()
            .flat_map(|b| {
                BranchKind::ALL
                    .into_iter()
                    .filter(|kind| b.availability(*kind) == Some(true))
                    .map(move |kind| (b, kind))
            })
            .collect();
        options.shuffle(rng);
        options.pop()
    }
}

impl Transform for Branch {
    fn name(&self) -> &'static str {
        "Branch"
    }

    fn apply(&self, bundle: &mut AstBundle, rng: &mut StdRng) -> Result<bool> {
        let blocks = bundle.tree.statement_blocks(bundle.root);
        if blocks.is_empty() {
            debug!("No statement blocks to branch");
            return Ok(false);
        }
        let budget = ((blocks.len() as f32 * self.max_ratio).ceil() as usize).max(1);
        let chosen = blocks.into_iter().choose_multiple(rng, budget);

        let mut changed = false;
        for block in chosen {
            let Some((brancher, kind)) = self.pick(rng) else {
                debug!("No brancher can build any branch");
                return Ok(changed);
            };
            let statements = bundle.tree.list_items(block).map(<[_]>::to_vec).unwrap_or_default();
            let outcome = brancher.branch(
                kind,
                &mut bundle.tree,
                &bundle.markings,
                &statements,
                Region::Around { pivot: None },
                rng,
            )?;
            match outcome {
                Some(outcome) if outcome.success => {
                    debug!("{} {}-branch in block {}", brancher.name(), kind, block);
                    bundle.tree.set_list(block, outcome.statements)?;
                    changed = true;
                }
                _ => debug!("{} declined block {}", brancher.name(), block),
            }
        }
        Ok(changed)
    }
}
