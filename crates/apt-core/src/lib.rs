//! Shared primitives for the apt-rs package manager core.
//!
//! This crate provides foundational types used by every other crate in
//! the workspace:
//! - Error codes and the base `Error`/`Result` types (§7)
//! - Debian-style version comparison and relation operators (§3)
//! - Content hashing (MD5/SHA1/SHA256) for archive and index integrity
//! - A streaming RFC822 "tag file" parser shared by the cache and the
//!   fetcher (§6, §9 "Streaming parsers")

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod arch;
pub mod error;
pub mod hash;
pub mod rfc822;
pub mod version;

pub use error::{Error, ErrorCode, Result};
pub use hash::{ContentHash, ContentHasher, HashAlgorithm};
pub use version::{compare_versions, Relation, RelationExpression, RelationLine, RelationOp};
