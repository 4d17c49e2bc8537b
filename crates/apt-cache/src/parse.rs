//! Converting RFC822 stanzas into `ReleaseInfo`/`BinaryVersion`/`SourceVersion`.

use crate::release::{parse_hash_section, ReleaseInfo, HASH_FIELDS};
use crate::version::{BinaryVersion, DependencyType, FileHashes, Priority, Provide, SourceVersion};
use apt_core::hash::{ContentHash, HashAlgorithm};
use apt_core::rfc822::Stanza;
use apt_core::version::RelationLine;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Parse a `Release`/`InRelease` top-level stanza. `component` names
/// which component this `ReleaseInfo` view is for (one is produced per
/// component the caller cares about, sharing the other fields).
#[must_use]
pub fn parse_release(stanza: &Stanza, base_uri: &str, component: &str) -> ReleaseInfo {
    let mut entries = Vec::new();
    for (field, algorithm) in HASH_FIELDS {
        if let Some(value) = stanza.get(field) {
            entries.extend(parse_hash_section(value, algorithm));
        }
    }

    ReleaseInfo {
        vendor: stanza.get("Origin").map(str::to_string),
        label: stanza.get("Label").map(str::to_string),
        archive: stanza
            .get("Suite")
            .or_else(|| stanza.get("Archive"))
            .map(str::to_string),
        codename: stanza.get("Codename").map(str::to_string),
        version: stanza.get("Version").map(str::to_string),
        date: stanza.get("Date").and_then(parse_rfc822_date),
        valid_until: stanza.get("Valid-Until").and_then(parse_rfc822_date),
        not_automatic: parse_yes(stanza.get("NotAutomatic")),
        but_automatic_upgrades: parse_yes(stanza.get("ButAutomaticUpgrades")),
        architectures: stanza
            .get("Architectures")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        component: component.to_string(),
        base_uri: base_uri.to_string(),
        entries,
        verified: false,
    }
}

fn parse_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
}

/// Parse an RFC822-style date (`Wed, 01 Jan 2025 00:00:00 UTC`) as used
/// by `Release` files' `Date:`/`Valid-Until:` fields.
fn parse_rfc822_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse one `Packages` stanza into a `BinaryVersion`. Architecture
/// defaults to `all` with a warning if absent, matching §6. Returns
/// `None` if `Package` or `Version` is missing/malformed (dropped per
/// §7 "parse-and-continue").
#[must_use]
pub fn parse_binary_stanza(stanza: &Stanza) -> Option<BinaryVersion> {
    let package_name = stanza.get("Package")?.trim().to_string();
    let version = stanza.get("Version")?.trim().to_string();
    if package_name.is_empty() || version.is_empty() {
        warn!("dropping package record with empty name or version");
        return None;
    }

    let architecture = match stanza.get("Architecture") {
        Some(a) if !a.trim().is_empty() => a.trim().to_string(),
        _ => {
            warn!(package = %package_name, "missing Architecture, defaulting to 'all'");
            "all".to_string()
        }
    };

    let mut relations = ahash::AHashMap::new();
    for dep_type in DependencyType::default_active() {
        if let Some(value) = stanza.get(dep_type.field_name()) {
            relations.insert(*dep_type, RelationLine::parse(value));
        }
    }

    let provides = stanza
        .get("Provides")
        .map(parse_provides)
        .unwrap_or_default();

    let (source_package_name, source_version) = match stanza.get("Source") {
        Some(source) => parse_source_field(source, &version),
        None => (package_name.clone(), version.clone()),
    };

    let hashes = parse_file_hashes(stanza, "MD5sum", "SHA1", "SHA256");
    let size = stanza
        .get("Size")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);

    Some(BinaryVersion {
        package_name,
        version,
        architecture,
        priority: stanza.get("Priority").map_or(Priority::Optional, Priority::parse),
        essential: parse_yes(stanza.get("Essential")),
        source_package_name,
        source_version,
        relations,
        provides,
        hashes,
        size,
        filename: stanza.get("Filename").map(str::to_string),
        sources: Vec::new(),
        description_md5: stanza.get("Description-md5").map(str::to_string),
        description: stanza.get("Description").map(str::to_string),
        multiarch: stanza.get("Multi-Arch").map(str::to_string),
    })
}

/// Parse one `Sources` stanza into a `SourceVersion`.
#[must_use]
pub fn parse_source_stanza(stanza: &Stanza) -> Option<SourceVersion> {
    let package_name = stanza.get("Package")?.trim().to_string();
    let version = stanza.get("Version")?.trim().to_string();
    if package_name.is_empty() || version.is_empty() {
        return None;
    }

    let mut build_relations = ahash::AHashMap::new();
    for (field, dep_type) in [
        ("Build-Depends", DependencyType::Depends),
        ("Build-Depends-Indep", DependencyType::Depends),
        ("Build-Conflicts", DependencyType::Conflicts),
    ] {
        if let Some(value) = stanza.get(field) {
            build_relations
                .entry(dep_type)
                .and_modify(|existing: &mut RelationLine| {
                    existing.expressions.extend(RelationLine::parse(value).expressions);
                })
                .or_insert_with(|| RelationLine::parse(value));
        }
    }

    Some(SourceVersion {
        package_name,
        version,
        build_relations,
        files: Vec::new(),
        sources: Vec::new(),
    })
}

fn parse_provides(value: &str) -> Vec<Provide> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            if let (Some(open), Some(close)) = (entry.find('('), entry.find(')')) {
                let name = entry[..open].trim().to_string();
                let inner = entry[open + 1..close].trim();
                let version = inner.strip_prefix('=').map(|v| v.trim().to_string());
                Provide {
                    package_name: name,
                    version,
                }
            } else {
                Provide {
                    package_name: entry.to_string(),
                    version: None,
                }
            }
        })
        .collect()
}

/// Parse a `Source: name (version)` field, defaulting the version to
/// the binary's own version when not present.
fn parse_source_field(value: &str, binary_version: &str) -> (String, String) {
    let value = value.trim();
    if let (Some(open), Some(close)) = (value.find('('), value.find(')')) {
        let name = value[..open].trim().to_string();
        let version = value[open + 1..close].trim().to_string();
        (name, version)
    } else {
        (value.to_string(), binary_version.to_string())
    }
}

fn parse_file_hashes(stanza: &Stanza, md5_field: &str, sha1_field: &str, sha256_field: &str) -> FileHashes {
    FileHashes {
        md5: stanza.get(md5_field).map(|h| ContentHash {
            algorithm: HashAlgorithm::Md5,
            hex: h.trim().to_ascii_lowercase(),
        }),
        sha1: stanza.get(sha1_field).map(|h| ContentHash {
            algorithm: HashAlgorithm::Sha1,
            hex: h.trim().to_ascii_lowercase(),
        }),
        sha256: stanza.get(sha256_field).map(|h| ContentHash {
            algorithm: HashAlgorithm::Sha256,
            hex: h.trim().to_ascii_lowercase(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::rfc822::parse_all;

    #[test]
    fn parses_binary_stanza_with_provides_and_deps() {
        let text = b"Package: foo\nVersion: 1.0-1\nArchitecture: amd64\nDepends: libc6 (>= 2.17), libssl3 | libssl1.1\nProvides: foo-virtual, bar (= 1.0-1)\nPriority: optional\nSize: 1024\nMD5sum: d41d8cd98f00b204e9800998ecf8427e\n";
        let stanza = &parse_all(text.as_slice()).unwrap()[0];
        let version = parse_binary_stanza(stanza).unwrap();
        assert_eq!(version.package_name, "foo");
        assert_eq!(version.architecture, "amd64");
        assert_eq!(version.provides.len(), 2);
        assert_eq!(version.provides[1].version.as_deref(), Some("1.0-1"));
        assert!(version.relations.contains_key(&DependencyType::Depends));
    }

    #[test]
    fn missing_architecture_defaults_to_all() {
        let text = b"Package: foo\nVersion: 1.0\n";
        let stanza = &parse_all(text.as_slice()).unwrap()[0];
        let version = parse_binary_stanza(stanza).unwrap();
        assert_eq!(version.architecture, "all");
    }

    #[test]
    fn source_field_with_explicit_version() {
        let text = b"Package: foo-bin\nVersion: 1.0-1+b1\nSource: foo (1.0-1)\n";
        let stanza = &parse_all(text.as_slice()).unwrap()[0];
        let version = parse_binary_stanza(stanza).unwrap();
        assert_eq!(version.source_package_name, "foo");
        assert_eq!(version.source_version, "1.0-1");
    }
}
