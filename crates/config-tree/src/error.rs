//! Error types for tree operations.

use crate::level::ConfigLevel;

/// Errors returned by path resolution and tree mutation.
///
/// Every variant is recoverable: a failed call leaves the tree exactly as it
/// was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A write was targeted at a pseudo-level.
    #[error("level {0} is not writable")]
    InvalidLevel(ConfigLevel),

    /// A write path runs through a non-object value at `at`.
    #[error("path {path} conflicts with non-object value at {at}")]
    PathConflict { path: String, at: String },

    /// A read path resolves to nothing.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path string itself is malformed (empty segment).
    #[error("invalid path {0:?}: empty segment")]
    InvalidPath(String),

    /// Only an object can be stored at the root.
    #[error("root value must be an object")]
    RootNotObject,
}

impl TreeError {
    /// Short stable code, used by the CLI and in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLevel(_) => "INVALID_LEVEL",
            Self::PathConflict { .. } => "PATH_CONFLICT",
            Self::PathNotFound(_) => "PATH_NOT_FOUND",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::RootNotObject => "ROOT_NOT_OBJECT",
        }
    }
}
