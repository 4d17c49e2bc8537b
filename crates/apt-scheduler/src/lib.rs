//! The action-graph scheduler: expands a resolver result into ordered
//! unpack/configure/remove actions and partitions them into changesets
//! bounded by the configured archive-cache budget (§4.4).

pub mod builder;
pub mod error;
pub mod linearize;
pub mod partition;
pub mod types;

pub use builder::{OrderingGraph, SchedulerBuilder};
pub use error::{Error, Result};
pub use linearize::linearize;
pub use partition::partition;
pub use types::{
    ActionId, ActionKind, ActionsPreview, ChangeKind, Changeset, EdgeAttribute, EdgeClass, InnerAction,
    InnerActionGroup, PackageChange,
};

use apt_cache::{PackageCache, SystemState};

/// Run the full §4.4 pipeline: build the ordering graph, linearise it
/// into groups, and partition the result into changesets.
pub fn schedule(
    cache: &PackageCache,
    preview: &ActionsPreview,
    state: &SystemState,
    archives_space_limit: u64,
) -> Result<Vec<Changeset>> {
    let mut graph = SchedulerBuilder::new(cache).build(preview);
    let groups = linearize(&mut graph)?;
    partition(&graph, groups, state, archives_space_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_cache::{BinaryVersion, DependencyType, FileHashes, Priority};
    use apt_core::version::{Relation, RelationExpression, RelationLine, RelationOp};
    use std::sync::Arc;

    fn make_version(name: &str, version: &str, depends: Vec<(&str, RelationOp, &str)>) -> Arc<BinaryVersion> {
        let mut relations = ahash::AHashMap::new();
        if !depends.is_empty() {
            let alternatives = depends
                .into_iter()
                .map(|(pkg, op, ver)| Relation {
                    package_name: pkg.to_string(),
                    architecture_qualifier: None,
                    op,
                    version: ver.to_string(),
                })
                .collect();
            relations.insert(
                DependencyType::Depends,
                RelationLine { expressions: vec![RelationExpression::new(alternatives)] },
            );
        }
        Arc::new(BinaryVersion {
            package_name: name.to_string(),
            version: version.to_string(),
            architecture: "amd64".to_string(),
            priority: Priority::Optional,
            essential: false,
            source_package_name: name.to_string(),
            source_version: version.to_string(),
            relations,
            provides: vec![],
            hashes: FileHashes::default(),
            size: 1000,
            filename: None,
            sources: vec![],
            description_md5: None,
            description: None,
            multiarch: None,
        })
    }

    /// S1 — simple install: A depends on B, nothing installed,
    /// requesting A should unpack+configure both with B first.
    #[test]
    fn simple_install_orders_dependency_first() {
        let b = make_version("b", "1.0", vec![]);
        let a = make_version("a", "1.0", vec![("b", RelationOp::Ge, "1")]);

        let preview = vec![
            PackageChange::infer("a", None, Some(a)),
            PackageChange::infer("b", None, Some(b)),
        ];

        let mut graph = StandaloneCache.build(&preview);
        let groups = linearize(&mut graph).expect("acyclic install should linearise");

        let configure_order: Vec<String> = groups
            .iter()
            .flat_map(|g| &g.actions)
            .map(|&id| &graph[id])
            .filter(|action| action.kind == ActionKind::Configure)
            .map(|action| action.package_name.clone())
            .collect();

        let b_pos = configure_order.iter().position(|p| p == "b").unwrap();
        let a_pos = configure_order.iter().position(|p| p == "a").unwrap();
        assert!(b_pos < a_pos, "b must configure before a");
    }

    struct StandaloneCache;
    impl StandaloneCache {
        fn build(self, preview: &ActionsPreview) -> OrderingGraph {
            // No pseudo-essential lookups are needed for this preview
            // since neither version is essential, so an empty cache
            // suffices.
            let cache = PackageCache::new(
                ahash::AHashMap::new(),
                ahash::AHashMap::new(),
                SystemState::new(),
                ahash::AHashMap::new(),
                ahash::AHashMap::new(),
                Arc::new(apt_config::Config::default()),
            );
            SchedulerBuilder::new(&cache).build(preview)
        }
    }
}
