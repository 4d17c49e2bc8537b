//! Index parsing and the cache's "pre-package map" (§4.1).
//!
//! The cache does not keep parsed index files around: for each
//! repository entry it scans `Packages`/`Sources` once to build a map
//! from package name to `(release, file, offset)` triples, then
//! re-reads just the one stanza at that offset the first time a
//! version is actually needed. This keeps peak memory proportional to
//! the largest single stanza, not the whole index file, per §9
//! "Streaming parsers".

use crate::error::Result;
use crate::parse::{parse_binary_stanza, parse_source_stanza};
use crate::release::ReleaseInfo;
use crate::state::SystemState;
use crate::version::{BinaryVersion, Package, SourcePackage, VersionSource};
use ahash::AHashMap;
use apt_config::Config;
use apt_core::rfc822::StanzaReader;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// A `(package name, byte offset)` pair discovered while scanning an
/// index file, before the stanza at that offset has actually been
/// parsed into a `Version`.
#[derive(Debug, Clone)]
struct PrePackageEntry {
    name: String,
    offset: u64,
}

/// Scan `path` for every stanza's `Package:` name and starting offset,
/// without retaining the parsed stanza.
fn scan_index(path: &Path) -> Result<Vec<PrePackageEntry>> {
    let file = File::open(path)?;
    let mut entries = Vec::new();
    for stanza in StanzaReader::new(file) {
        let stanza = stanza?;
        if let Some(name) = stanza.get("Package") {
            entries.push(PrePackageEntry {
                name: name.trim().to_string(),
                offset: stanza.offset,
            });
        } else {
            warn!(file = %path.display(), "stanza with no Package field, skipping");
        }
    }
    Ok(entries)
}

/// Re-parse just the stanza starting at `offset` within `path`.
fn read_stanza_at(path: &Path, offset: u64) -> Result<apt_core::rfc822::Stanza> {
    let mut file = BufReader::new(File::open(path)?);
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = StanzaReader::new(file);
    match reader.next() {
        Some(stanza) => Ok(stanza?),
        None => Err(apt_core::Error::InternalInvariant {
            message: format!("no stanza at offset {offset} in {}", path.display()),
        }
        .into()),
    }
}

/// Incrementally builds a `PackageCache` from repository indexes and
/// installed state.
#[derive(Debug)]
pub struct PackageCacheBuilder {
    binary_packages: AHashMap<String, Package>,
    source_packages: AHashMap<String, SourcePackage>,
    state: SystemState,
    pin_overrides: AHashMap<(String, String), i32>,
    translations: AHashMap<(String, String), String>,
    config: Arc<Config>,
}

impl PackageCacheBuilder {
    /// Start an empty builder.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            binary_packages: AHashMap::new(),
            source_packages: AHashMap::new(),
            state: SystemState::new(),
            pin_overrides: AHashMap::new(),
            translations: AHashMap::new(),
            config,
        }
    }

    /// Scan and merge a `Packages` index file for one `(release,
    /// directory)` pair. Malformed stanzas are dropped with a warning
    /// per §7's parse-and-continue policy.
    ///
    /// # Errors
    /// Returns an error only on I/O failure reading the index file
    /// itself; individual malformed records are silently skipped.
    pub fn add_binary_index(
        &mut self,
        path: &Path,
        release: Arc<ReleaseInfo>,
        directory: &str,
    ) -> Result<()> {
        let entries = scan_index(path)?;
        for entry in entries {
            let stanza = match read_stanza_at(path, entry.offset) {
                Ok(s) => s,
                Err(e) => {
                    warn!(file = %path.display(), offset = entry.offset, error = %e, "failed to re-read stanza");
                    continue;
                }
            };
            let Some(mut version) = parse_binary_stanza(&stanza) else {
                continue;
            };
            version.sources.push(VersionSource {
                release: release.clone(),
                directory: directory.to_string(),
                offset: entry.offset,
            });
            self.merge_binary_version(version);
        }
        Ok(())
    }

    /// Scan and merge a `Sources` index file.
    ///
    /// # Errors
    /// Returns an error only on I/O failure; malformed records are
    /// skipped.
    pub fn add_source_index(
        &mut self,
        path: &Path,
        release: Arc<ReleaseInfo>,
        directory: &str,
    ) -> Result<()> {
        let entries = scan_index(path)?;
        for entry in entries {
            let stanza = match read_stanza_at(path, entry.offset) {
                Ok(s) => s,
                Err(_) => continue,
            };
            let Some(mut version) = parse_source_stanza(&stanza) else {
                continue;
            };
            version.sources.push(VersionSource {
                release: release.clone(),
                directory: directory.to_string(),
                offset: entry.offset,
            });
            let pkg = self
                .source_packages
                .entry(version.package_name.clone())
                .or_insert_with(|| SourcePackage {
                    name: version.package_name.clone(),
                    versions: Vec::new(),
                });
            match pkg.versions.iter_mut().find(|v| v.version == version.version) {
                Some(existing) => {
                    let mut merged = (**existing).clone();
                    merged.sources.extend(version.sources);
                    *existing = Arc::new(merged);
                }
                None => pkg.versions.push(Arc::new(version)),
            }
        }
        Ok(())
    }

    fn merge_binary_version(&mut self, version: BinaryVersion) {
        let pkg = self
            .binary_packages
            .entry(version.package_name.clone())
            .or_insert_with(|| Package {
                name: version.package_name.clone(),
                versions: Vec::new(),
                installed: None,
            });
        match pkg.versions.iter().position(|v| v.version == version.version) {
            Some(idx) => {
                let mut merged = (*pkg.versions[idx]).clone();
                merged.sources.extend(version.sources);
                pkg.versions[idx] = Arc::new(merged);
            }
            None => pkg.versions.push(Arc::new(version)),
        }
    }

    /// Record the installed-package state table. For every
    /// already-installed package with a matching version in the known
    /// set, also sets `Package::installed` (§3 invariant: at most one
    /// installed version per package).
    pub fn set_system_state(&mut self, state: SystemState, installed_versions: &[(String, String)]) {
        self.state = state;
        for (name, version) in installed_versions {
            if let Some(pkg) = self.binary_packages.get_mut(name) {
                pkg.installed = pkg.versions.iter().find(|v| &v.version == version).cloned();
            }
        }
    }

    /// Install an explicit `(package, version) -> priority` pin-table
    /// override (spec §1: pin *file syntax* is out of scope, the
    /// resulting table is not).
    pub fn set_pin_overrides(&mut self, overrides: AHashMap<(String, String), i32>) {
        self.pin_overrides = overrides;
    }

    /// Install localisation lookups: `(description_md5, lang) -> text`.
    pub fn set_translations(&mut self, translations: AHashMap<(String, String), String>) {
        self.translations = translations;
    }

    /// Finish building the immutable `PackageCache`.
    #[must_use]
    pub fn build(self) -> crate::cache::PackageCache {
        crate::cache::PackageCache::new(
            self.binary_packages,
            self.source_packages,
            self.state,
            self.pin_overrides,
            self.translations,
            self.config,
        )
    }
}

/// A single index file reference the builder's caller needs to supply,
/// mirroring the `deb`/`deb-src` source-list lines of §6.
#[derive(Debug, Clone)]
pub struct IndexRef {
    /// Path to the on-disk `Packages`/`Sources` file.
    pub path: PathBuf,
    /// The release this file belongs to.
    pub release: Arc<ReleaseInfo>,
    /// Pool directory component this index's entries resolve against.
    pub directory: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn release() -> Arc<ReleaseInfo> {
        Arc::new(ReleaseInfo {
            vendor: Some("Debian".to_string()),
            label: None,
            archive: Some("stable".to_string()),
            codename: Some("bookworm".to_string()),
            version: None,
            date: None,
            valid_until: None,
            not_automatic: false,
            but_automatic_upgrades: false,
            architectures: vec!["amd64".to_string()],
            component: "main".to_string(),
            base_uri: "http://deb.example.org/debian".to_string(),
            entries: vec![],
            verified: true,
        })
    }

    #[test]
    fn builds_cache_from_scanned_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Packages");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Package: foo\nVersion: 1.0\nArchitecture: amd64\n").unwrap();
        writeln!(f, "Package: bar\nVersion: 2.0\nArchitecture: amd64\n").unwrap();
        drop(f);

        let mut builder = PackageCacheBuilder::new(Arc::new(Config::default()));
        builder.add_binary_index(&path, release(), "pool/main").unwrap();
        let cache = builder.build();

        assert!(cache.get_binary_package("foo").is_some());
        assert!(cache.get_binary_package("bar").is_some());
        let foo = cache.get_binary_package("foo").unwrap();
        assert_eq!(foo.versions[0].version, "1.0");
        assert_eq!(foo.versions[0].sources[0].directory, "pool/main");
    }

    #[test]
    fn installed_version_is_linked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Packages");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Package: foo\nVersion: 1.0\nArchitecture: amd64\n").unwrap();
        drop(f);

        let mut builder = PackageCacheBuilder::new(Arc::new(Config::default()));
        builder.add_binary_index(&path, release(), "pool/main").unwrap();
        builder.set_system_state(SystemState::new(), &[("foo".to_string(), "1.0".to_string())]);
        let cache = builder.build();
        let foo = cache.get_binary_package("foo").unwrap();
        assert!(foo.installed.is_some());
    }
}
