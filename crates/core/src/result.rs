//! Core results and error types

use crate::marking::MarkKind;
use crate::tree::NodeId;
use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read file at the specified path.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path to the file that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode hex string.
    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// A break type outside {except, return, break, continue, yield}.
    #[error("invalid break type: {0}")]
    InvalidBreakType(String),

    /// An interactive edit combined an action and scope the marking kind does not accept.
    #[error("invalid edit for {kind} marking: {reason}")]
    InvalidEdit {
        /// Marking kind the edit was applied to.
        kind: MarkKind,
        /// What was wrong with the edit.
        reason: String,
    },

    /// An identifier was required but the supplied string is not one.
    #[error("invalid identifier: '{0}'")]
    InvalidName(String),

    /// The node id does not belong to this tree.
    #[error("node {0} is not part of the tree")]
    InvalidNode(NodeId),

    /// Invalid hexadecimal in seed.
    #[error("invalid hexadecimal in seed")]
    InvalidSeedHex,

    /// Invalid seed length.
    #[error("invalid seed length: expected 64 hex chars, got {0}")]
    InvalidSeedLength(usize),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The node is not a list.
    #[error("node {0} is not a list")]
    NotAList(NodeId),

    /// A node of the wrong category was supplied where a specific one is required.
    #[error("type violation: expected {expected}, got {found}")]
    TypeViolation {
        /// Category the caller required.
        expected: &'static str,
        /// Kind that was supplied instead.
        found: String,
    },

    /// A structured node carried a field its kind does not declare.
    #[error("unknown field '{field}' on {kind}")]
    UnknownField {
        /// Kind of the offending node.
        kind: String,
        /// The undeclared field name.
        field: String,
    },

    /// A marking kind name outside the recognised set.
    #[error("unknown marking kind: {0}")]
    UnknownMarkKind(String),

    /// The front end supplied a value that is no recognised node.
    #[error("unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// A scope class name outside the domain of the marking kind.
    #[error("unknown scope class: {0}")]
    UnknownScope(String),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
