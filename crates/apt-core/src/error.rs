//! Base error types shared across the workspace.
//!
//! Each error carries a unique code (e.g. `E0101`) for easy reference,
//! matching the error-kind taxonomy in spec §7: `ParseError`,
//! `VerificationFailure`, `TransportError`, `LockUnavailable`,
//! `ResolutionFailure`, `ScheduleFailure`, `HookFailure`,
//! `InternalInvariant`. Crate-specific errors (`apt_resolver::Error`,
//! `apt_scheduler::Error`, `apt_fetch::Error`) wrap or convert into this
//! one at their boundary; this crate holds only the kinds that are
//! genuinely shared (parse, verification, lock, internal-invariant).

use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, grouped by subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Parse errors (E01xx)
    /// Malformed RFC822 record (index, Release, diff-index).
    E0101,
    /// Malformed version string.
    E0102,
    /// Malformed relation expression.
    E0103,

    // Verification errors (E02xx)
    /// Hash mismatch between declared and computed digest.
    E0201,
    /// GPG signature verification failed.
    E0202,
    /// Release file has expired (`Valid-Until` passed).
    E0203,

    // Transport errors (E03xx)
    /// Download method failed.
    E0301,
    /// Download server socket timed out.
    E0302,

    // Lock errors (E04xx)
    /// Another process holds a mutation lock.
    E0401,

    // Internal invariant errors (E08xx)
    /// A spec-level invariant was violated.
    E0801,
}

impl ErrorCode {
    /// The string representation of this code, e.g. `"E0101"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0401 => "E0401",
            Self::E0801 => "E0801",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared base error type. Parse, verification, lock, and invariant
/// failures that can occur in more than one crate live here; resolver-
/// specific and scheduler-specific failures live in their own crates
/// and convert a `apt_core::Error` via `#[from]` where relevant.
#[derive(Debug, Error)]
pub enum Error {
    /// A record in an index/Release/diff-index file could not be parsed.
    #[error("[{code}] parse error in {file}:{line}: {message}", code = ErrorCode::E0101)]
    Parse {
        /// File the error was found in.
        file: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Human-readable description.
        message: String,
    },

    /// A version string did not conform to Debian version syntax.
    #[error("[{code}] invalid version string: {version:?}", code = ErrorCode::E0102)]
    InvalidVersion {
        /// The offending string.
        version: String,
    },

    /// A relation expression could not be parsed.
    #[error("[{code}] invalid relation expression: {expr:?}", code = ErrorCode::E0103)]
    InvalidRelation {
        /// The offending string.
        expr: String,
    },

    /// A downloaded file's hash did not match the declared digest.
    #[error(
        "[{code}] hash mismatch for {uri}: expected {expected}, got {actual}",
        code = ErrorCode::E0201
    )]
    HashMismatch {
        /// The URI the file was fetched from.
        uri: String,
        /// The declared (expected) hex digest.
        expected: String,
        /// The computed (actual) hex digest.
        actual: String,
    },

    /// GPG verification of a `Release`/`InRelease` file failed.
    #[error("[{code}] signature verification failed for {file}: {message}", code = ErrorCode::E0202)]
    SignatureVerification {
        /// The file that failed verification.
        file: PathBuf,
        /// Underlying reason.
        message: String,
    },

    /// A release's `Valid-Until` timestamp has passed.
    #[error("[{code}] release {label} expired at {valid_until}", code = ErrorCode::E0203)]
    ReleaseExpired {
        /// Human-readable release label (origin/suite/codename).
        label: String,
        /// The `Valid-Until` timestamp, RFC822-formatted.
        valid_until: String,
    },

    /// A file mutation lock (`lists/lock`, `archives/lock`) is held by
    /// another process.
    #[error("[{code}] lock unavailable: {path}", code = ErrorCode::E0401)]
    LockUnavailable {
        /// Path to the lock file.
        path: PathBuf,
    },

    /// An invariant documented in the specification was violated; this
    /// indicates a bug in this implementation, not bad input.
    #[error("[{code}] internal invariant violated: {message}", code = ErrorCode::E0801)]
    InternalInvariant {
        /// Description of the violated invariant.
        message: String,
    },

    /// Wrapped I/O error, annotated with the path it occurred on.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path the operation was attempted on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the workspace's shared types.
pub type Result<T> = std::result::Result<T, Error>;
