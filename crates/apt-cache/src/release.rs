//! `ReleaseInfo`: parsed `Release`/`InRelease` metadata (§3, §6).

use apt_core::hash::{ContentHash, HashAlgorithm};
use chrono::{DateTime, Utc};

/// One `MD5Sum:`/`SHA1:`/`SHA256:` entry in a `Release` file: hash,
/// size, and the index path it describes, relative to the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFileEntry {
    /// Declared digest.
    pub hash: ContentHash,
    /// Declared size in bytes.
    pub size: u64,
    /// Path relative to the release root, e.g. `main/binary-amd64/Packages.xz`.
    pub path: String,
}

/// Parsed `Release`/`InRelease` metadata for one repository component
/// (§3 "ReleaseInfo").
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    /// `Origin:`.
    pub vendor: Option<String>,
    /// `Label:`.
    pub label: Option<String>,
    /// `Suite:`/`Archive:`.
    pub archive: Option<String>,
    /// `Codename:`.
    pub codename: Option<String>,
    /// `Version:`.
    pub version: Option<String>,
    /// `Date:`, parsed RFC822 timestamp.
    pub date: Option<DateTime<Utc>>,
    /// `Valid-Until:`, parsed RFC822 timestamp.
    pub valid_until: Option<DateTime<Utc>>,
    /// `NotAutomatic: yes`.
    pub not_automatic: bool,
    /// `ButAutomaticUpgrades: yes`.
    pub but_automatic_upgrades: bool,
    /// `Architectures:`.
    pub architectures: Vec<String>,
    /// Which component this `ReleaseInfo` describes (`main`,
    /// `contrib`, …) — one `ReleaseInfo` per component, sharing the
    /// parent `Release`'s other fields.
    pub component: String,
    /// Base URI the index/pool paths are relative to.
    pub base_uri: String,
    /// All declared file entries, by hash algorithm.
    pub entries: Vec<ReleaseFileEntry>,
    /// Set by the fetcher once GPG verification succeeds, or the
    /// repository is configured `trusted=yes` (§3 invariant: only set
    /// under one of those two conditions).
    pub verified: bool,
}

impl ReleaseInfo {
    /// Entries declaring `algorithm` for `path`.
    #[must_use]
    pub fn entry_for(&self, path: &str, algorithm: HashAlgorithm) -> Option<&ReleaseFileEntry> {
        self.entries
            .iter()
            .find(|e| e.path == path && e.hash.algorithm == algorithm)
    }

    /// Whether this release's `Valid-Until` has passed, relative to
    /// `now`. A release with no `Valid-Until` never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|vu| now > vu)
    }

    /// A short human-readable label for error messages and reason
    /// chains, e.g. `"Debian bookworm/main"`.
    #[must_use]
    pub fn label(&self) -> String {
        let vendor = self.vendor.as_deref().unwrap_or("unknown");
        let archive = self.archive.as_deref().unwrap_or("unknown");
        format!("{vendor} {archive}/{component}", component = self.component)
    }
}

/// RFC822 field names for hash sections, in priority order (highest
/// fidelity first) for entry lookups that don't care which algorithm
/// they get.
pub const HASH_FIELDS: [(&str, HashAlgorithm); 3] = [
    ("SHA256", HashAlgorithm::Sha256),
    ("SHA1", HashAlgorithm::Sha1),
    ("MD5Sum", HashAlgorithm::Md5),
];

/// Parse the indented `<hex> <size> <path>` lines under a hash-section
/// field's value (continuation lines already joined by the RFC822
/// parser with `\n`).
#[must_use]
pub fn parse_hash_section(value: &str, algorithm: HashAlgorithm) -> Vec<ReleaseFileEntry> {
    value
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let hex = parts.next()?;
            let size: u64 = parts.next()?.parse().ok()?;
            let path = parts.next()?.to_string();
            Some(ReleaseFileEntry {
                hash: ContentHash {
                    algorithm,
                    hex: hex.to_ascii_lowercase(),
                },
                size,
                path,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hash_section_lines() {
        let value = "\nd41d8cd98f00b204e9800998ecf8427e 0 main/binary-amd64/Packages\nabc 123 main/source/Sources";
        let entries = parse_hash_section(value, HashAlgorithm::Md5);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "main/binary-amd64/Packages");
        assert_eq!(entries[0].size, 0);
        assert_eq!(entries[1].hash.hex, "abc");
    }
}
