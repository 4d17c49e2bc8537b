//! Dependency-graph-layer errors.

use thiserror::Error;

/// Errors the graph builder can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation expected a version element but was handed some
    /// other element kind.
    #[error("expected a version element: {message}")]
    NotAVersionElement {
        /// Detail on what was expected and what was found.
        message: String,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
