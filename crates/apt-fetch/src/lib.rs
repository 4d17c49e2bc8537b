//! Metadata update and archive download (§4.5).

pub mod archive;
pub mod compress;
pub mod diffindex;
pub mod error;
pub mod metadata;
pub mod protocol;
pub mod verify;

pub use archive::{ArchiveDownloadManager, DownloadOutcome, DownloadRequest};
pub use error::{Error, Result};
pub use metadata::{MetadataUpdater, RepositoryEntry, UpdateOutcome};
pub use protocol::Verb;
pub use verify::Keyring;
