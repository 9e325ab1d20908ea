//! Identifier checks shared by markings, catalogs and edits.

use crate::result::{Error, Result};

/// Returns true when `name` is a single identifier: a letter or underscore followed by letters,
/// digits or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

/// Returns true when `name` is one or more identifiers joined by dots (`pkg.Error`).
pub fn is_dotted_identifier(name: &str) -> bool {
    name.split('.').all(is_identifier)
}

/// Validates an identifier, returning it owned.
pub fn identifier(name: &str) -> Result<String> {
    if is_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// Validates a dotted identifier, returning it owned.
pub fn dotted_identifier(name: &str) -> Result<String> {
    if is_dotted_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}
