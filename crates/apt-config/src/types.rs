//! Configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Synchronisation mode for binaries sharing a source package (§4.2,
/// §4.3 "Synchronisation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynchronizeMode {
    /// Do not synchronise sibling binaries at all.
    #[default]
    Never,
    /// Synchronise as a soft constraint (score penalty on violation).
    Soft,
    /// Synchronise as a hard constraint.
    Hard,
}

/// `cupt::resolver::score::*` — every weight the `ScoreManager` applies
/// (§4.3 "Scoring").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverScoreConfig {
    /// Flat penalty subtracted for every action generated, used only
    /// to stabilise sort order between equally-scored actions.
    pub position_penalty: i64,
    /// Cost of leaving a Recommends unsatisfied.
    pub unsatisfied_recommends_penalty: i64,
    /// Cost of leaving a Suggests unsatisfied.
    pub unsatisfied_suggests_penalty: i64,
    /// Cost of a soft synchronisation violation.
    pub unsatisfied_synchronization_penalty: i64,
    /// Cost of accepting a `wish`-importance user request unsatisfied.
    pub unsatisfied_wish_penalty: i64,
    /// Cost of accepting a `try`-importance user request unsatisfied;
    /// much larger than `unsatisfied_wish_penalty` per spec §4.3.
    pub unsatisfied_try_penalty: i64,
    /// Extra negative score applied to any package removal.
    pub removal_penalty: i64,
    /// Extra negative score applied to a version downgrade.
    pub downgrade_penalty: i64,
    /// Penalty applied when a candidate version is not present in the
    /// previously-installed set (discourages pulling in brand-new
    /// packages over keeping the status quo).
    pub new_package_penalty: i64,
    /// Bonus added to a version's weight if it (or the package) is
    /// flagged essential.
    pub essential_bonus: i64,
    /// Per-priority-level bonus, highest first:
    /// `[required, important, standard, optional, extra]`.
    pub priority_bonus: [i64; 5],
    /// Divisor applied to a version's weight when the package is
    /// marked automatically-installed (prefers keeping manually
    /// installed packages around).
    pub auto_installed_divisor: i64,
}

impl Default for ResolverScoreConfig {
    fn default() -> Self {
        Self {
            position_penalty: 1,
            unsatisfied_recommends_penalty: 100,
            unsatisfied_suggests_penalty: 1,
            unsatisfied_synchronization_penalty: 200,
            unsatisfied_wish_penalty: 50,
            unsatisfied_try_penalty: 2_000,
            removal_penalty: 500,
            downgrade_penalty: 100,
            new_package_penalty: 20,
            essential_bonus: 50,
            priority_bonus: [500, 400, 300, 100, 0],
            auto_installed_divisor: 2,
        }
    }
}

/// Pin-priority addenda per Debian APT preference rules (§4.1
/// "get_pin").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Base priority for a version already installed.
    pub installed_priority: i32,
    /// Base priority for a version available from a "normal" target
    /// release / the default archive.
    pub default_priority: i32,
    /// Priority for a release marked `NotAutomatic: yes` without
    /// `ButAutomaticUpgrades: yes`.
    pub not_automatic_priority: i32,
    /// Priority for a release marked both `NotAutomatic: yes` and
    /// `ButAutomaticUpgrades: yes`.
    pub but_automatic_upgrades_priority: i32,
    /// Priority for a version held (`dpkg --set-selections hold`).
    pub hold_priority: i32,
    /// Extra priority added when the containing release was
    /// GPG-verified.
    pub verified_bonus: i32,
    /// Extra (negative) priority applied to a downgrade candidate.
    pub downgrade_penalty: i32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            installed_priority: 100,
            default_priority: 500,
            not_automatic_priority: 1,
            but_automatic_upgrades_priority: 100,
            hold_priority: -1,
            verified_bonus: 1,
            downgrade_penalty: -1000,
        }
    }
}

/// `cupt::resolver::*` — resolver behaviour (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of live candidate solutions kept in the pool
    /// before the lowest-scoring one is discarded (§4.3 "Pool cap").
    pub max_solution_count: usize,
    /// `apt::install-recommends`.
    pub install_recommends: bool,
    /// `apt::install-suggests`.
    pub install_suggests: bool,
    /// Whether removing installed packages is permitted at all
    /// (`cupt::resolver::no-remove`).
    pub no_remove: bool,
    /// Source-version synchronisation mode across sibling binaries.
    pub synchronize_source_versions: SynchronizeMode,
    /// Scoring weights.
    pub score: ResolverScoreConfig,
    /// Pin-priority addenda.
    pub pin: PinConfig,
    /// Whether reason chains are recorded for the final solution
    /// (costs memory; needed only for "why" displays).
    pub track_reasons: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_solution_count: 2_000,
            install_recommends: true,
            install_suggests: false,
            no_remove: false,
            synchronize_source_versions: SynchronizeMode::Soft,
            score: ResolverScoreConfig::default(),
            pin: PinConfig::default(),
            track_reasons: true,
        }
    }
}

/// `cupt::downloader::*` — archive download manager tunables (§4.5.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// `cupt::downloader::max-simultaneous-downloads`.
    pub max_simultaneous_downloads: usize,
    /// Per-protocol, per-method priority:
    /// `cupt::downloader::protocols::<proto>::methods::*::priority`.
    pub protocol_method_priority: BTreeMap<String, BTreeMap<String, i32>>,
    /// Per-protocol transport timeout.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// How often the worker's SIGALRM-equivalent ping timer fires.
    #[serde(with = "duration_secs")]
    pub ping_interval: Duration,
    /// Poll timeout for a client waiting on the worker socket; expiry
    /// is fatal (§5 "Cancellation and timeouts").
    #[serde(with = "duration_secs")]
    pub client_poll_timeout: Duration,
    /// Whether the `debdelta` local-patch shortcut is attempted before
    /// a full download.
    pub enable_debdelta: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        let mut protocol_method_priority = BTreeMap::new();
        let mut http_methods = BTreeMap::new();
        http_methods.insert("curl".to_string(), 1);
        http_methods.insert("wget".to_string(), 2);
        protocol_method_priority.insert("http".to_string(), http_methods.clone());
        protocol_method_priority.insert("https".to_string(), http_methods);

        Self {
            max_simultaneous_downloads: 4,
            protocol_method_priority,
            timeout: Duration::from_secs(30),
            ping_interval: Duration::from_secs(5),
            client_poll_timeout: Duration::from_secs(2),
            enable_debdelta: false,
        }
    }
}

/// `cupt::worker::*` and compression priorities (§4.4 changeset
/// partitioning, §4.5.1 index download).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// `cupt::worker::archives-space-limit`, in bytes. `0` means
    /// unbounded.
    pub archives_space_limit: u64,
    /// Whether to delete stale files from the lists directory after an
    /// update (`cupt::update::list-cleanup`-equivalent).
    pub list_cleanup: bool,
    /// Whether an expired `Valid-Until` is tolerated
    /// (`cupt::cache::release-file-expiration::ignore`).
    pub ignore_release_file_expiration: bool,
    /// `compression::<ext>::priority`, higher wins.
    pub compression_priority: BTreeMap<String, i32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let mut compression_priority = BTreeMap::new();
        compression_priority.insert("xz".to_string(), 100);
        compression_priority.insert("lzma".to_string(), 90);
        compression_priority.insert("bz2".to_string(), 80);
        compression_priority.insert("gz".to_string(), 70);
        compression_priority.insert("".to_string(), 10);

        Self {
            archives_space_limit: 0,
            list_cleanup: true,
            ignore_release_file_expiration: false,
            compression_priority,
        }
    }
}

/// The full, read-only configuration map consumed across the
/// workspace. Built once per command invocation (§5 lifecycle).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolver tunables.
    pub resolver: ResolverConfig,
    /// Downloader tunables.
    pub downloader: DownloaderConfig,
    /// Worker (scheduler + fetcher) tunables.
    pub worker: WorkerConfig,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = Config::default();
        assert!(cfg.resolver.max_solution_count > 0);
        assert!(cfg.downloader.max_simultaneous_downloads > 0);
        assert_eq!(cfg.resolver.score.priority_bonus.len(), 5);
    }

    #[test]
    fn toml_roundtrip_overrides_only_named_fields() {
        let text = r#"
            [resolver]
            max_solution_count = 10
        "#;
        let cfg = crate::load_toml(text).unwrap();
        assert_eq!(cfg.resolver.max_solution_count, 10);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.resolver.install_recommends, true);
    }
}
