//! Typed configuration for the apt-rs core.
//!
//! Per spec §9 "Configuration": all tunables named throughout the
//! specification (`cupt::resolver::*`, `cupt::downloader::*`,
//! `cupt::worker::archives-space-limit`, `apt::install-recommends`, …)
//! are consumed as a read-only map from string keys to typed values.
//! This crate owns that map's shape; it never parses configuration
//! *file* syntax itself (out of scope per spec §1) beyond the optional
//! TOML convenience loader in [`load_toml`], which a front-end may use
//! to build a [`Config`] before handing it to the resolver/scheduler/
//! fetcher.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod types;

pub use error::{ConfigError, Result};
pub use types::{
    Config, DownloaderConfig, ResolverConfig, ResolverScoreConfig, SynchronizeMode, WorkerConfig,
};

/// Parse a TOML document into a [`Config`], falling back to
/// [`Config::default`] for any section or field the document omits.
///
/// # Errors
/// Returns [`ConfigError::Toml`] if `text` is not valid TOML, or if it
/// describes fields the schema doesn't recognise in a way `serde`
/// can't tolerate.
pub fn load_toml(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(ConfigError::Toml)
}
