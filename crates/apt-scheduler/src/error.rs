//! Scheduler-layer errors.

use thiserror::Error;

/// Errors the scheduler can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// A strongly connected component survived every edge class down to
    /// `Fundamental` without becoming legal (§4.4 step 6).
    #[error("could not break dependency cycle among packages: {packages:?}")]
    UnbreakableCycle {
        /// The packages whose actions remain cyclic.
        packages: Vec<String>,
    },

    /// A single changeset's archive download total exceeds the
    /// configured `archives-space-limit` (§4.4 step 7).
    #[error("changeset requires {required} bytes of archive space but the limit is {limit} bytes")]
    ChangesetTooLarge {
        /// Bytes the changeset would need to download.
        required: u64,
        /// The configured limit.
        limit: u64,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
