//! Error types for spanlight-core.

use thiserror::Error;

/// Result type for spanlight-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Ordinary interaction problems (negative offsets, whitespace-only
/// selections, duplicates, unknown spans) are not errors; store operations
/// report them by returning `false`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The host cannot register multi-range highlights.
    #[error("Highlighting unsupported: {0}")]
    Unsupported(String),

    /// The text container for a field does not exist.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unsupported-platform error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a container-not-found error.
    #[must_use]
    pub fn container_not_found(node: impl Into<String>) -> Self {
        Self::ContainerNotFound(node.into())
    }
}
