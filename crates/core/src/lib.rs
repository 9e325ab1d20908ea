pub mod ast;
pub mod bundle;
pub mod grammar;
pub mod ident;
pub mod marking;
pub mod result;
pub mod seed;
pub mod tree;

pub use result::{Error, Result};

use bundle::AstBundle;
use grammar::Grammar;

/// High-level convenience function to load a tree (or a saved bundle) into an `AstBundle`.
///
/// # Arguments
/// * `input` - JSON text, or a path to a JSON file when `is_file` is set
/// * `is_file` - Flag indicating if the input is a file path
/// * `grammar` - Grammar the tree is validated against
///
/// # Example
/// ```rust,ignore
/// let bundle = load_bundle("module.json", true, Grammar::python())?;
/// println!("{} nodes", bundle.tree.node_count());
/// ```
pub fn load_bundle(input: &str, is_file: bool, grammar: Grammar) -> Result<AstBundle> {
    let json = if is_file {
        std::fs::read_to_string(input).map_err(|source| Error::FileRead {
            path: input.to_string(),
            source,
        })?
    } else {
        input.to_string()
    };
    let bundle = AstBundle::from_json(grammar, &json)?;
    tracing::debug!(
        "Loaded tree with {} nodes ({} marked)",
        bundle.tree.node_count(),
        bundle.markings.len()
    );
    Ok(bundle)
}
