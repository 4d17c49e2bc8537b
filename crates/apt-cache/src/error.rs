//! Cache-layer errors.

use thiserror::Error;

/// Errors the package cache can raise while building or querying the
/// universe.
#[derive(Debug, Error)]
pub enum Error {
    /// A release was rejected: unverified-and-untrusted, or expired
    /// (§4.1 "Release validity").
    #[error("release {label} rejected: {reason}")]
    ReleaseRejected {
        /// The release's human-readable label.
        label: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Propagated from `apt-core` (RFC822/version/relation parsing).
    #[error(transparent)]
    Core(#[from] apt_core::Error),

    /// Propagated I/O error while reading an index file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
