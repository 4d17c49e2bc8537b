//! Resolver-layer errors.

use thiserror::Error;

/// Errors the resolver can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// The candidate pool emptied before any solution validated clean.
    #[error("no solution satisfies the given requests")]
    NoSolution,

    /// The callback returned `Decision::Abandon`.
    #[error("resolution abandoned by caller")]
    Abandoned,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
