//! The package cache: parsed repository metadata, installed state, and
//! the read-only `PackageCache` queries built on top of them (§4.1).

pub mod cache;
pub mod error;
pub mod index;
pub mod parse;
pub mod pin;
pub mod release;
pub mod state;
pub mod version;

pub use cache::{pin_then_version_order, validate_release, PackageCache};
pub use error::{Error, Result};
pub use index::{IndexRef, PackageCacheBuilder};
pub use pin::compute_pin;
pub use release::{ReleaseFileEntry, ReleaseInfo};
pub use state::{Flag, Status, StateEntry, SystemState, Want};
pub use version::{
    BinaryVersion, DependencyType, FileHashes, Package, Priority, Provide, SourcePackage,
    SourceVersion, Version, VersionSource,
};
