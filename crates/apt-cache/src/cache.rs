//! `PackageCache`: the read-only in-memory model of the package universe (§4.1).

use crate::error::{Error, Result};
use crate::pin::compute_pin;
use crate::release::ReleaseInfo;
use crate::state::{SystemState, Want};
use crate::version::{BinaryVersion, Package, SourcePackage};
use ahash::AHashMap;
use apt_config::Config;
use apt_core::version::{compare_versions, RelationExpression};
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Check a release for validity per §4.1 "Release validity": rejected
/// if it can't be GPG-verified and the repository isn't declared
/// trusted, or if `Valid-Until` has passed and expiration isn't
/// configured to be ignored.
///
/// # Errors
/// Returns [`Error::ReleaseRejected`] with the specific reason.
pub fn validate_release(release: &ReleaseInfo, trusted: bool, config: &Config) -> Result<()> {
    if !release.verified && !trusted {
        return Err(Error::ReleaseRejected {
            label: release.label(),
            reason: "GPG signature could not be verified and repository is not trusted".into(),
        });
    }
    if !config.worker.ignore_release_file_expiration && release.is_expired(Utc::now()) {
        return Err(Error::ReleaseRejected {
            label: release.label(),
            reason: "Valid-Until has passed".into(),
        });
    }
    Ok(())
}

/// The read-only in-memory package universe (§4.1). Built once per
/// command invocation from parsed repository indexes plus installed
/// state; immutable afterwards except for its internal memoisation
/// tables, which only ever grow (§5 "Memoisation tables... read-only
/// after initial fill").
#[derive(Debug)]
pub struct PackageCache {
    binary_packages: AHashMap<String, Package>,
    source_packages: AHashMap<String, SourcePackage>,
    state: SystemState,
    pin_overrides: AHashMap<(String, String), i32>,
    translations: AHashMap<(String, String), String>,
    config: Arc<Config>,

    satisfying_versions_memo: DashMap<String, Arc<Vec<Arc<BinaryVersion>>>>,
    pin_memo: DashMap<(String, String), i32>,
}

impl PackageCache {
    /// Build a cache from already-parsed packages and installed state.
    /// Index *parsing* (the seek-scan pre-package map) lives in
    /// `PackageCacheBuilder`; this constructor takes the result.
    #[must_use]
    pub fn new(
        binary_packages: AHashMap<String, Package>,
        source_packages: AHashMap<String, SourcePackage>,
        state: SystemState,
        pin_overrides: AHashMap<(String, String), i32>,
        translations: AHashMap<(String, String), String>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            binary_packages,
            source_packages,
            state,
            pin_overrides,
            translations,
            config,
            satisfying_versions_memo: DashMap::new(),
            pin_memo: DashMap::new(),
        }
    }

    /// The installed-state table.
    #[must_use]
    pub fn system_state(&self) -> &SystemState {
        &self.state
    }

    /// Look up a binary package by name.
    #[must_use]
    pub fn get_binary_package(&self, name: &str) -> Option<&Package> {
        self.binary_packages.get(name)
    }

    /// Look up a source package by name.
    #[must_use]
    pub fn get_source_package(&self, name: &str) -> Option<&SourcePackage> {
        self.source_packages.get(name)
    }

    /// Iterate all binary packages.
    pub fn binary_packages(&self) -> impl Iterator<Item = &Package> {
        self.binary_packages.values()
    }

    /// Iterate all source packages.
    pub fn source_packages(&self) -> impl Iterator<Item = &SourcePackage> {
        self.source_packages.values()
    }

    /// Every version that satisfies `expr`, in `(package_name asc,
    /// version_string desc)` order, including versions reached only
    /// via `Provides` (§4.1 `get_satisfying_versions`). Memoised by
    /// `expr.hash_key()` (§8 invariant 2 round-trip, §5 "Memoisation
    /// tables").
    #[must_use]
    pub fn get_satisfying_versions(&self, expr: &RelationExpression) -> Arc<Vec<Arc<BinaryVersion>>> {
        let key = expr.hash_key();
        if let Some(cached) = self.satisfying_versions_memo.get(&key) {
            return cached.clone();
        }

        let mut matches: Vec<Arc<BinaryVersion>> = Vec::new();
        for relation in &expr.alternatives {
            if let Some(pkg) = self.binary_packages.get(&relation.package_name) {
                for version in &pkg.versions {
                    if relation.matches_version(&version.version) {
                        matches.push(version.clone());
                    }
                }
            }
            // Provides-based matches: an unversioned relation is satisfied
            // by any Provides of the target name; a versioned relation
            // only by a Provides that declares a version satisfying it
            // under an implicit `=` comparison (Debian Provides syntax
            // never carries any operator but `=`).
            for pkg in self.binary_packages.values() {
                for version in &pkg.versions {
                    for provide in &version.provides {
                        if provide.package_name != relation.package_name {
                            continue;
                        }
                        let satisfied = match (&relation.op, &provide.version) {
                            (apt_core::version::RelationOp::None, _) => true,
                            (op, Some(pv)) => op.matches(pv, &relation.version),
                            (_, None) => false,
                        };
                        if satisfied {
                            matches.push(version.clone());
                        }
                    }
                }
            }
        }

        matches.sort_by(|a, b| {
            a.package_name
                .cmp(&b.package_name)
                .then_with(|| compare_versions(&b.version, &a.version))
        });
        matches.dedup_by(|a, b| Arc::ptr_eq(a, b));

        let result = Arc::new(matches);
        self.satisfying_versions_memo.insert(key, result.clone());
        result
    }

    /// Pin priority for `version`, memoised by `(package_name,
    /// version_string)` (§4.1 `get_pin`).
    #[must_use]
    pub fn get_pin(&self, version: &Arc<BinaryVersion>) -> i32 {
        let key = (version.package_name.clone(), version.version.clone());
        if let Some(cached) = self.pin_memo.get(&key) {
            return *cached;
        }

        let installed = self
            .binary_packages
            .get(&version.package_name)
            .and_then(|p| p.installed.as_ref())
            .map(std::convert::AsRef::as_ref);
        let override_priority = self.pin_overrides.get(&key).copied();
        let held = self.state.get(&version.package_name).is_some_and(|e| e.want == Want::Hold);
        let pin = compute_pin(version, installed, override_priority, held, &self.config.resolver.pin);

        self.pin_memo.insert(key, pin);
        pin
    }

    /// All versions of `package`, sorted by descending pin priority
    /// (ties broken by descending version, §4.1).
    #[must_use]
    pub fn get_sorted_pinned_versions(&self, package: &Package) -> Vec<(i32, Arc<BinaryVersion>)> {
        let mut pinned: Vec<(i32, Arc<BinaryVersion>)> = package
            .versions
            .iter()
            .map(|v| (self.get_pin(v), v.clone()))
            .collect();
        pinned.sort_by(|(pa, va), (pb, vb)| {
            pb.cmp(pa).then_with(|| compare_versions(&vb.version, &va.version))
        });
        pinned
    }

    /// The highest-pin candidate for `package`, if any versions exist.
    #[must_use]
    pub fn get_preferred_version(&self, package: &Package) -> Option<Arc<BinaryVersion>> {
        self.get_sorted_pinned_versions(package)
            .into_iter()
            .max_by(|(pa, va), (pb, vb)| {
                pa.cmp(pb).then_with(|| compare_versions(&va.version, &vb.version))
            })
            .map(|(_, v)| v)
    }

    /// Localised description for `version` in `lang`, falling back to
    /// the inline English `Description:` field, then to an empty
    /// string if neither is available.
    #[must_use]
    pub fn get_localized_description(&self, version: &BinaryVersion, lang: &str) -> String {
        if let Some(md5) = &version.description_md5 {
            if let Some(text) = self.translations.get(&(md5.clone(), lang.to_string())) {
                return text.clone();
            }
        }
        version.description.clone().unwrap_or_default()
    }
}

/// Compare two pin priorities the way APT breaks ties: higher wins,
/// then the numerically/lexically higher version wins. Exposed for
/// scheduler/resolver code that needs the same ordering outside a full
/// `PackageCache` (e.g. ordering candidate actions).
#[must_use]
pub fn pin_then_version_order(pa: i32, va: &str, pb: i32, vb: &str) -> Ordering {
    pa.cmp(&pb).then_with(|| compare_versions(va, vb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{FileHashes, Priority};
    use apt_core::version::{Relation, RelationOp};

    fn make_version(name: &str, ver: &str, provides: Vec<crate::version::Provide>) -> Arc<BinaryVersion> {
        Arc::new(BinaryVersion {
            package_name: name.to_string(),
            version: ver.to_string(),
            architecture: "amd64".to_string(),
            priority: Priority::Optional,
            essential: false,
            source_package_name: name.to_string(),
            source_version: ver.to_string(),
            relations: ahash::AHashMap::new(),
            provides,
            hashes: FileHashes::default(),
            size: 0,
            filename: None,
            sources: vec![],
            description_md5: None,
            description: None,
            multiarch: None,
        })
    }

    fn cache_with(packages: Vec<(&str, Vec<Arc<BinaryVersion>>)>) -> PackageCache {
        let mut binary_packages = AHashMap::new();
        for (name, versions) in packages {
            binary_packages.insert(
                name.to_string(),
                Package {
                    name: name.to_string(),
                    versions,
                    installed: None,
                },
            );
        }
        PackageCache::new(
            binary_packages,
            AHashMap::new(),
            SystemState::new(),
            AHashMap::new(),
            AHashMap::new(),
            Arc::new(Config::default()),
        )
    }

    #[test]
    fn satisfying_versions_direct_match() {
        let v = make_version("libc6", "2.31", vec![]);
        let cache = cache_with(vec![("libc6", vec![v.clone()])]);
        let expr = RelationExpression::new(vec![Relation {
            package_name: "libc6".to_string(),
            architecture_qualifier: None,
            op: RelationOp::Ge,
            version: "2.17".to_string(),
        }]);
        let matches = cache.get_satisfying_versions(&expr);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].version, "2.31");
    }

    #[test]
    fn satisfying_versions_via_provides() {
        let provider = make_version(
            "libssl1.1",
            "1.1.1",
            vec![crate::version::Provide {
                package_name: "libssl".to_string(),
                version: None,
            }],
        );
        let cache = cache_with(vec![("libssl1.1", vec![provider])]);
        let expr = RelationExpression::new(vec![Relation {
            package_name: "libssl".to_string(),
            architecture_qualifier: None,
            op: RelationOp::None,
            version: String::new(),
        }]);
        let matches = cache.get_satisfying_versions(&expr);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].package_name, "libssl1.1");
    }

    #[test]
    fn versioned_relation_not_satisfied_by_unversioned_provides() {
        let provider = make_version(
            "libssl1.1",
            "1.1.1",
            vec![crate::version::Provide {
                package_name: "libssl".to_string(),
                version: None,
            }],
        );
        let cache = cache_with(vec![("libssl1.1", vec![provider])]);
        let expr = RelationExpression::new(vec![Relation {
            package_name: "libssl".to_string(),
            architecture_qualifier: None,
            op: RelationOp::Ge,
            version: "1.0".to_string(),
        }]);
        assert!(cache.get_satisfying_versions(&expr).is_empty());
    }

    #[test]
    fn memoisation_returns_same_allocation() {
        let v = make_version("foo", "1.0", vec![]);
        let cache = cache_with(vec![("foo", vec![v])]);
        let expr = RelationExpression::new(vec![Relation {
            package_name: "foo".to_string(),
            architecture_qualifier: None,
            op: RelationOp::None,
            version: String::new(),
        }]);
        let first = cache.get_satisfying_versions(&expr);
        let second = cache.get_satisfying_versions(&expr);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn preferred_version_is_highest_pin_then_version() {
        let low = make_version("foo", "1.0", vec![]);
        let high = make_version("foo", "2.0", vec![]);
        let pkg = Package {
            name: "foo".to_string(),
            versions: vec![low, high.clone()],
            installed: None,
        };
        let cache = cache_with(vec![]);
        let preferred = cache.get_preferred_version(&pkg).unwrap();
        assert_eq!(preferred.version, high.version);
    }

    #[test]
    fn localized_description_falls_back_to_inline() {
        let mut v = make_version("foo", "1.0", vec![]);
        Arc::get_mut(&mut v).unwrap().description = Some("english text".to_string());
        let cache = cache_with(vec![]);
        assert_eq!(cache.get_localized_description(&v, "de"), "english text");
    }
}
