//! Pin-priority computation (§4.1 `get_pin`).

use crate::version::BinaryVersion;
use apt_config::PinConfig;
use apt_core::version::compare_versions;
use std::cmp::Ordering;

/// Compute the pin priority for `candidate`, optionally compared
/// against the `installed` version of the same package (for the
/// downgrade penalty) and an explicit `override_priority` from a
/// pre-computed `(package, version) -> priority` pin table (spec §1:
/// preference-file *syntax* is out of scope, but the resulting table is
/// consumed here). `held` is whether the package is currently under a
/// `dpkg --set-selections hold` (§4.1 `SystemState.want == hold`).
///
/// Per §4.1: base priority is computed per Debian APT rules from the
/// best-available release this version was found in (`NotAutomatic`/
/// `ButAutomaticUpgrades`-aware), bumped `+1` if that release was
/// GPG-verified, and penalised on downgrade. A held package's
/// non-installed candidates are forced down to `hold_priority` so the
/// resolver never picks them over the installed version. An explicit
/// pin-table entry overrides the computed value entirely.
#[must_use]
pub fn compute_pin(
    candidate: &BinaryVersion,
    installed: Option<&BinaryVersion>,
    override_priority: Option<i32>,
    held: bool,
    config: &PinConfig,
) -> i32 {
    if let Some(p) = override_priority {
        return p;
    }

    let is_installed_version = installed.is_some_and(|i| i.version == candidate.version);

    if held && !is_installed_version {
        return config.hold_priority;
    }

    let mut base = if is_installed_version {
        config.installed_priority
    } else if candidate.sources.is_empty() {
        // No source release recorded (e.g. synthetic/test version):
        // fall back to the default archive priority.
        config.default_priority
    } else {
        candidate
            .sources
            .iter()
            .map(|s| {
                if s.release.not_automatic && !s.release.but_automatic_upgrades {
                    config.not_automatic_priority
                } else if s.release.not_automatic && s.release.but_automatic_upgrades {
                    config.but_automatic_upgrades_priority
                } else {
                    config.default_priority
                }
            })
            .max()
            .unwrap_or(config.default_priority)
    };

    if candidate.sources.iter().any(|s| s.release.verified) {
        base += config.verified_bonus;
    }

    if let Some(installed) = installed {
        if compare_versions(&candidate.version, &installed.version) == Ordering::Less {
            base += config.downgrade_penalty;
        }
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseInfo;
    use crate::version::{FileHashes, Priority, VersionSource};
    use ahash::AHashMap;
    use std::sync::Arc;

    fn version(name: &str, ver: &str, sources: Vec<VersionSource>) -> BinaryVersion {
        BinaryVersion {
            package_name: name.to_string(),
            version: ver.to_string(),
            architecture: "amd64".to_string(),
            priority: Priority::Optional,
            essential: false,
            source_package_name: name.to_string(),
            source_version: ver.to_string(),
            relations: AHashMap::new(),
            provides: vec![],
            hashes: FileHashes::default(),
            size: 0,
            filename: None,
            sources,
            description_md5: None,
            description: None,
            multiarch: None,
        }
    }

    fn release(not_automatic: bool, but_auto: bool, verified: bool) -> Arc<ReleaseInfo> {
        Arc::new(ReleaseInfo {
            vendor: None,
            label: None,
            archive: None,
            codename: None,
            version: None,
            date: None,
            valid_until: None,
            not_automatic,
            but_automatic_upgrades: but_auto,
            architectures: vec![],
            component: "main".to_string(),
            base_uri: String::new(),
            entries: vec![],
            verified,
        })
    }

    #[test]
    fn default_release_gets_default_priority() {
        let cfg = PinConfig::default();
        let v = version(
            "foo",
            "1.0",
            vec![VersionSource {
                release: release(false, false, false),
                directory: String::new(),
                offset: 0,
            }],
        );
        assert_eq!(compute_pin(&v, None, None, false, &cfg), cfg.default_priority);
    }

    #[test]
    fn not_automatic_without_but_auto_gets_low_priority() {
        let cfg = PinConfig::default();
        let v = version(
            "foo",
            "1.0",
            vec![VersionSource {
                release: release(true, false, false),
                directory: String::new(),
                offset: 0,
            }],
        );
        assert_eq!(compute_pin(&v, None, None, false, &cfg), cfg.not_automatic_priority);
    }

    #[test]
    fn verified_release_gets_bonus() {
        let cfg = PinConfig::default();
        let v = version(
            "foo",
            "1.0",
            vec![VersionSource {
                release: release(false, false, true),
                directory: String::new(),
                offset: 0,
            }],
        );
        assert_eq!(
            compute_pin(&v, None, None, false, &cfg),
            cfg.default_priority + cfg.verified_bonus
        );
    }

    #[test]
    fn downgrade_is_penalised() {
        let cfg = PinConfig::default();
        let installed = version("foo", "2.0", vec![]);
        let candidate = version(
            "foo",
            "1.0",
            vec![VersionSource {
                release: release(false, false, false),
                directory: String::new(),
                offset: 0,
            }],
        );
        let pin = compute_pin(&candidate, Some(&installed), None, false, &cfg);
        assert_eq!(pin, cfg.default_priority + cfg.downgrade_penalty);
    }

    #[test]
    fn override_wins_over_computed() {
        let cfg = PinConfig::default();
        let v = version("foo", "1.0", vec![]);
        assert_eq!(compute_pin(&v, None, Some(999), false, &cfg), 999);
    }

    #[test]
    fn held_package_pins_non_installed_candidates_low() {
        let cfg = PinConfig::default();
        let installed = version("foo", "1.0", vec![]);
        let candidate = version(
            "foo",
            "2.0",
            vec![VersionSource {
                release: release(false, false, true),
                directory: String::new(),
                offset: 0,
            }],
        );
        assert_eq!(compute_pin(&candidate, Some(&installed), None, true, &cfg), cfg.hold_priority);
    }

    #[test]
    fn held_package_keeps_installed_version_priority() {
        let cfg = PinConfig::default();
        let installed = version("foo", "1.0", vec![]);
        assert_eq!(compute_pin(&installed, Some(&installed), None, true, &cfg), cfg.installed_priority);
    }
}
