//! Errors raised while loading or querying a compiled story.

use thiserror::Error;

/// Errors from path resolution and list algebra.
///
/// Every variant means the compiled story violates an invariant the engine
/// relies on; none of them are recoverable mid-story.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("path is empty")]
    EmptyPath,

    #[error("unresolved path: {path}")]
    UnresolvedPath { path: String },

    #[error("path {path} routes through non-container element at index {index}")]
    NotAContainer { path: String, index: usize },

    #[error("invalid list operation: {0}")]
    InvalidListOperation(String),

    #[error("unknown list: {0}")]
    UnknownList(String),

    #[error("list {list} has no item named {item}")]
    UnknownListItem { list: String, item: String },
}

/// Errors from decoding the compiled JSON format.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("invalid content item: {0}")]
    InvalidContent(String),
}
