//! Fetcher-layer errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors the metadata updater and archive download manager can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// An HTTP request failed outright (connection, timeout, status).
    #[error("request to {uri} failed: {message}")]
    Request {
        /// The URI that failed.
        uri: String,
        /// Underlying error text.
        message: String,
    },

    /// A downloaded file's hash didn't match the declared digest.
    #[error("hash mismatch for {uri}: expected {expected}, got {actual}")]
    HashMismatch {
        /// The URI the mismatch occurred on.
        uri: String,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// `Release`/`InRelease` could not be GPG-verified and the
    /// repository isn't configured trusted.
    #[error("signature verification failed for {label}: {reason}")]
    SignatureVerificationFailed {
        /// Human-readable repository label.
        label: String,
        /// Reason the verification failed.
        reason: String,
    },

    /// The diff-index patch chain couldn't reach the target hash from
    /// the local state; caller should fall back to a full download.
    #[error("diff chain for {path} cannot reach target hash from local state")]
    DiffChainBroken {
        /// The index path the chain was for.
        path: String,
    },

    /// The `red` ed-script tool isn't available to apply a patch.
    #[error("'red' is not available to apply diff patches")]
    RedUnavailable,

    /// A decompression tool failed or the extension is unrecognised.
    #[error("could not decompress {path}: {message}")]
    Decompress {
        /// File being decompressed.
        path: PathBuf,
        /// Reason.
        message: String,
    },

    /// I/O error with path context.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying message.
        message: String,
    },

    /// The archive worker's client-facing channel closed unexpectedly.
    #[error("archive worker is no longer running")]
    WorkerGone,

    /// A performer reported a download failure for its URI.
    #[error("download of {uri} failed: {message}")]
    DownloadFailed {
        /// The URI that failed.
        uri: String,
        /// Reason reported by the performer.
        message: String,
    },

    /// A performer's reported size diverged from the size declared by
    /// `set-download-size` (§4.5.2 "progress... size-mismatch error").
    #[error("size mismatch for {uri}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// The URI involved.
        uri: String,
        /// Size previously declared.
        expected: u64,
        /// Size actually observed.
        actual: u64,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io { path: path.into(), message: err.to_string() }
    }
}
