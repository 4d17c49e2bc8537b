//! `ScoreManager`: every weight the resolver's search loop applies
//! (§4.3 "Scoring").

use apt_cache::BinaryVersion;
use apt_config::ResolverScoreConfig;
use apt_depgraph::PenaltyKind;

/// Computes version weights and action score deltas from the
/// configured `cupt::resolver::score::*`-equivalent weights.
#[derive(Debug, Clone, Copy)]
pub struct ScoreManager<'a> {
    config: &'a ResolverScoreConfig,
}

impl<'a> ScoreManager<'a> {
    /// Wrap a score configuration.
    #[must_use]
    pub const fn new(config: &'a ResolverScoreConfig) -> Self {
        Self { config }
    }

    /// The standalone weight of installing `version`, combining pin,
    /// essential bonus, priority bonus, a new-package penalty, and the
    /// automatically-installed divisor.
    #[must_use]
    pub fn version_weight(&self, pin: i32, version: &BinaryVersion, is_new_package: bool, is_auto_installed: bool) -> i64 {
        let mut weight = i64::from(pin);
        if version.essential {
            weight += self.config.essential_bonus;
        }
        weight += self.config.priority_bonus[version.priority.bonus_index()];
        if is_new_package {
            weight -= self.config.new_package_penalty;
        }
        if is_auto_installed && self.config.auto_installed_divisor != 0 {
            weight /= self.config.auto_installed_divisor;
        }
        weight
    }

    /// The weight of a package's `absent` variant: a flat, large
    /// penalty (removals are discouraged relative to keeping anything
    /// installed).
    #[must_use]
    pub const fn absent_weight(&self) -> i64 {
        -self.config.removal_penalty
    }

    /// The score delta for changing one package from `old_weight` to
    /// `new_weight`, stabilised by a small per-solution-level position
    /// penalty and, if this is a downgrade, the configured downgrade
    /// penalty.
    #[must_use]
    pub const fn change_score(&self, old_weight: i64, new_weight: i64, is_downgrade: bool, level: i64) -> i64 {
        let mut delta = new_weight - old_weight - self.config.position_penalty * level;
        if is_downgrade {
            delta -= self.config.downgrade_penalty;
        }
        delta
    }

    /// The (negative) score delta for accepting an `UnsatisfiedElement`
    /// of the given kind.
    #[must_use]
    pub const fn unsatisfied_penalty(&self, kind: PenaltyKind) -> i64 {
        match kind {
            PenaltyKind::Recommends => -self.config.unsatisfied_recommends_penalty,
            PenaltyKind::Suggests => -self.config.unsatisfied_suggests_penalty,
            PenaltyKind::Synchronisation => -self.config.unsatisfied_synchronization_penalty,
            PenaltyKind::Wish => -self.config.unsatisfied_wish_penalty,
            PenaltyKind::Try => -self.config.unsatisfied_try_penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_installed_divides_weight() {
        let cfg = ResolverScoreConfig {
            auto_installed_divisor: 2,
            ..ResolverScoreConfig::default()
        };
        let manager = ScoreManager::new(&cfg);
        let version = make_version();
        let manual = manager.version_weight(500, &version, false, false);
        let auto = manager.version_weight(500, &version, false, true);
        assert_eq!(auto, manual / 2);
    }

    #[test]
    fn downgrade_is_subtracted_from_change_score() {
        let cfg = ResolverScoreConfig::default();
        let manager = ScoreManager::new(&cfg);
        let plain = manager.change_score(100, 50, false, 0);
        let downgrade = manager.change_score(100, 50, true, 0);
        assert_eq!(downgrade, plain - cfg.downgrade_penalty);
    }

    fn make_version() -> BinaryVersion {
        BinaryVersion {
            package_name: "foo".to_string(),
            version: "1.0".to_string(),
            architecture: "amd64".to_string(),
            priority: apt_cache::Priority::Optional,
            essential: false,
            source_package_name: "foo".to_string(),
            source_version: "1.0".to_string(),
            relations: ahash::AHashMap::new(),
            provides: vec![],
            hashes: apt_cache::FileHashes::default(),
            size: 0,
            filename: None,
            sources: vec![],
            description_md5: None,
            description: None,
            multiarch: None,
        }
    }
}
