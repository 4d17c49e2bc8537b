//! `DependencyGraphBuilder`: turns a `PackageCache` plus the installed
//! snapshot and user requests into an `ElementGraph` (§4.2).

use crate::element::{
    AntiRelationElement, Element, ElementId, Importance, PenaltyKind, RelationElement,
    SynchronisationElement, UnsatisfiedElement, UserRequestElement, VersionChoice, VersionElement,
};
use crate::error::{Error, Result};
use crate::graph::ElementGraph;
use apt_cache::{BinaryVersion, DependencyType, PackageCache};
use apt_config::{ResolverConfig, SynchronizeMode};
use apt_core::version::RelationExpression;
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;
use tracing::debug;

/// Which initial-assignment bucket a seeded element belongs to, mirroring
/// the two sources `fill` draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    /// Seeded from the currently installed package set.
    Installed,
    /// The synthetic root that anchors explicit user requests.
    Requests,
}

/// A single explicit ask from the command line or a front-end
/// (`apt install foo`, `apt remove bar (>= 1.0)`, …), fed to
/// `add_user_relation_expression`.
#[derive(Debug, Clone)]
pub struct UserRequestSpec {
    /// The package named by the request.
    pub package_name: String,
    /// The relation the request must satisfy; `None` means "any version".
    pub expression: Option<RelationExpression>,
    /// Whether this is a removal/conflict-style (inverted) request.
    pub inverted: bool,
    /// How strongly this request binds.
    pub importance: Importance,
}

/// Builds the dependency graph incrementally: seeds the installed set,
/// accepts user requests, and unfolds version elements into their
/// dependency/conflict/synchronisation successors on demand.
pub struct DependencyGraphBuilder<'a> {
    cache: &'a PackageCache,
    config: &'a ResolverConfig,
    graph: ElementGraph,
    present_elements: AHashMap<(String, String), ElementId>,
    absent_elements: AHashMap<String, ElementId>,
    unfolded: AHashSet<ElementId>,
    old_packages: AHashMap<String, Arc<BinaryVersion>>,
    auto_installed: AHashSet<String>,
}

impl<'a> DependencyGraphBuilder<'a> {
    /// Start a builder over `cache`, configured by `config`.
    #[must_use]
    pub fn new(cache: &'a PackageCache, config: &'a ResolverConfig) -> Self {
        Self {
            cache,
            config,
            graph: ElementGraph::new(),
            present_elements: AHashMap::new(),
            absent_elements: AHashMap::new(),
            unfolded: AHashSet::new(),
            old_packages: AHashMap::new(),
            auto_installed: AHashSet::new(),
        }
    }

    /// Access the underlying graph (e.g. for the resolver to read
    /// successors of elements it already has handles to).
    #[must_use]
    pub fn graph(&self) -> &ElementGraph {
        &self.graph
    }

    /// Consume the builder, returning the finished graph.
    #[must_use]
    pub fn into_graph(self) -> ElementGraph {
        self.graph
    }

    /// Seed one version element per currently installed package plus
    /// one synthetic "user requests" root, returning each with the
    /// bucket it came from (§4.2 `fill`).
    pub fn fill(
        &mut self,
        installed: &[Arc<BinaryVersion>],
        auto_installed: &AHashSet<String>,
    ) -> Vec<(ElementId, InitialState)> {
        self.auto_installed = auto_installed.clone();
        self.old_packages = installed
            .iter()
            .map(|v| (v.package_name.clone(), v.clone()))
            .collect();

        let mut seeded = Vec::with_capacity(installed.len() + 1);
        for version in installed {
            let id = self.version_element_for(version);
            seeded.push((id, InitialState::Installed));
        }

        let root = self.graph.insert(Element::UserRequest(UserRequestElement {
            package_name: String::new(),
            expression: None,
            inverted: false,
            importance: Importance::Must,
        }));
        seeded.push((root, InitialState::Requests));
        seeded
    }

    /// Create one `UserRequestElement` for an explicit ask (§4.2
    /// `add_user_relation_expression`). If not inverted, edges run from
    /// the request to every version satisfying it. If inverted, one
    /// sub-element per targeted package is created the same way a
    /// `Conflicts` anti-dependency would be, and if `importance` is
    /// below `Must` an `UnsatisfiedElement` sibling is also attached.
    pub fn add_user_relation_expression(&mut self, request: UserRequestSpec) -> ElementId {
        let request_id = self.graph.insert(Element::UserRequest(UserRequestElement {
            package_name: request.package_name.clone(),
            expression: request.expression.clone(),
            inverted: request.inverted,
            importance: request.importance,
        }));

        if request.inverted {
            let targets = self.conflict_targets(&request.package_name, request.expression.as_ref());
            for target in targets {
                let anti_id = self.graph.insert(Element::AntiRelation(AntiRelationElement {
                    owner: request_id,
                    dependency_type: DependencyType::Conflicts,
                    target_package: target.clone(),
                }));
                self.graph.add_edge(request_id, anti_id);
                self.wire_anti_relation_successors(anti_id, &target, request.expression.as_ref());
            }
        } else if let Some(expr) = &request.expression {
            for version in self.cache.get_satisfying_versions(expr).iter() {
                let version_id = self.version_element_for(version);
                self.graph.add_edge(request_id, version_id);
            }
        } else if let Some(package) = self.cache.get_binary_package(&request.package_name) {
            if let Some(preferred) = self.cache.get_preferred_version(package) {
                let version_id = self.version_element_for(&preferred);
                self.graph.add_edge(request_id, version_id);
            }
        }

        if !request.inverted && request.importance != Importance::Must {
            let penalty_kind = match request.importance {
                Importance::Wish => PenaltyKind::Wish,
                Importance::Try => PenaltyKind::Try,
                Importance::Must => unreachable!(),
            };
            let unsatisfied_id = self.graph.insert(Element::Unsatisfied(UnsatisfiedElement {
                parent: request_id,
                penalty_kind,
            }));
            self.graph.add_edge(request_id, unsatisfied_id);
        }

        request_id
    }

    /// Unfold a version element into its dependency/conflict/
    /// synchronisation successors (§4.2 `unfold_element`). Idempotent:
    /// repeated calls are no-ops after the first.
    pub fn unfold_element(&mut self, id: ElementId) {
        if self.unfolded.contains(&id) {
            return;
        }
        self.unfolded.insert(id);

        let version = match self.graph.get(id) {
            Element::Version(VersionElement { choice: VersionChoice::Present(v) }) => v.clone(),
            _ => return,
        };

        for dep_type in DependencyType::default_active() {
            let line = version.relation_line(*dep_type);
            for expr in &line.expressions {
                if dep_type.is_anti() {
                    self.unfold_anti_relation(id, &version, *dep_type, expr);
                } else {
                    self.unfold_forward_relation(id, &version, *dep_type, expr);
                }
            }
        }

        self.unfold_synchronisation(id, &version);
    }

    fn unfold_forward_relation(
        &mut self,
        owner: ElementId,
        version: &Arc<BinaryVersion>,
        dep_type: DependencyType,
        expr: &RelationExpression,
    ) {
        if dep_type.is_soft() {
            let install_flag = match dep_type {
                DependencyType::Recommends => self.config.install_recommends,
                DependencyType::Suggests => self.config.install_suggests,
                _ => true,
            };
            if self.should_drop_soft_relation(&version.package_name, dep_type, expr, install_flag) {
                debug!(
                    package = %version.package_name,
                    dep_type = ?dep_type,
                    "suppressing soft relation per old-packages rule"
                );
                return;
            }
        }

        let relation_id = self.graph.insert(Element::Relation(RelationElement {
            owner,
            dependency_type: dep_type,
            expression: expr.clone(),
        }));
        self.graph.add_edge(owner, relation_id);

        for satisfying in self.cache.get_satisfying_versions(expr).iter() {
            let version_id = self.version_element_for(satisfying);
            self.graph.add_edge(relation_id, version_id);
        }

        if dep_type.is_soft() {
            let penalty_kind = match dep_type {
                DependencyType::Recommends => PenaltyKind::Recommends,
                DependencyType::Suggests => PenaltyKind::Suggests,
                _ => unreachable!(),
            };
            let unsatisfied_id = self.graph.insert(Element::Unsatisfied(UnsatisfiedElement {
                parent: relation_id,
                penalty_kind,
            }));
            self.graph.add_edge(relation_id, unsatisfied_id);
        }
    }

    fn unfold_anti_relation(
        &mut self,
        owner: ElementId,
        version: &Arc<BinaryVersion>,
        dep_type: DependencyType,
        expr: &RelationExpression,
    ) {
        for alternative in &expr.alternatives {
            if alternative.package_name == version.package_name {
                continue;
            }
            let anti_id = self.graph.insert(Element::AntiRelation(AntiRelationElement {
                owner,
                dependency_type: dep_type,
                target_package: alternative.package_name.clone(),
            }));
            self.graph.add_edge(owner, anti_id);

            let single_alternative = RelationExpression::new(vec![alternative.clone()]);
            self.wire_anti_relation_successors(anti_id, &alternative.package_name, Some(&single_alternative));
        }
    }

    /// Wire an anti-relation element to every *non*-satisfying version
    /// of the target package (plus the target's `absent` element, if
    /// removal is permitted).
    fn wire_anti_relation_successors(
        &mut self,
        anti_id: ElementId,
        target_package: &str,
        expr: Option<&RelationExpression>,
    ) {
        let Some(package) = self.cache.get_binary_package(target_package) else {
            return;
        };
        let satisfying: AHashSet<(String, String)> = expr
            .map(|e| {
                self.cache
                    .get_satisfying_versions(e)
                    .iter()
                    .map(|v| (v.package_name.clone(), v.version.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let non_satisfying: Vec<Arc<BinaryVersion>> = package
            .versions
            .iter()
            .filter(|v| !satisfying.contains(&(v.package_name.clone(), v.version.clone())))
            .cloned()
            .collect();

        for version in &non_satisfying {
            let version_id = self.version_element_for(version);
            self.graph.add_edge(anti_id, version_id);
        }

        if let Some(absent_id) = self.absent_element_for(target_package) {
            self.graph.add_edge(anti_id, absent_id);
        }
    }

    fn unfold_synchronisation(&mut self, owner: ElementId, version: &Arc<BinaryVersion>) {
        if self.config.synchronize_source_versions == SynchronizeMode::Never {
            return;
        }
        let already_installed = self
            .old_packages
            .get(&version.package_name)
            .is_some_and(|old| old.version == version.version);
        if already_installed {
            return;
        }

        let hard = self.config.synchronize_source_versions == SynchronizeMode::Hard;
        let siblings: Vec<String> = self
            .cache
            .binary_packages()
            .filter(|p| {
                p.name != version.package_name
                    && p.versions
                        .iter()
                        .any(|v| v.source_package_name == version.source_package_name)
            })
            .map(|p| p.name.clone())
            .collect();

        for sibling_name in siblings {
            let sync_id = self.graph.insert(Element::Synchronisation(SynchronisationElement {
                owner,
                source_version: version.source_version.clone(),
                hard,
            }));
            self.graph.add_edge(owner, sync_id);

            if let Some(sibling) = self.cache.get_binary_package(&sibling_name) {
                for sibling_version in &sibling.versions {
                    if sibling_version.source_version == version.source_version {
                        let version_id = self.version_element_for(sibling_version);
                        self.graph.add_edge(sync_id, version_id);
                    }
                }
            }
            if let Some(absent_id) = self.absent_element_for(&sibling_name) {
                self.graph.add_edge(sync_id, absent_id);
            }
        }
    }

    /// The `absent` variant corresponding to a version element, or
    /// `Err` if `id` is not a version element at all (§4.2
    /// `get_corresponding_empty_element`). Returns `Ok(None)` if
    /// removal is not permitted for this package.
    pub fn get_corresponding_empty_element(&mut self, id: ElementId) -> Result<Option<ElementId>> {
        let package_name = match self.graph.get(id) {
            Element::Version(v) => v.choice.package_name().to_string(),
            other => {
                return Err(Error::NotAVersionElement {
                    message: format!("{other:?}"),
                })
            }
        };
        Ok(self.absent_element_for(&package_name))
    }

    /// Every version-choice element for `package_name`: each known
    /// present candidate plus the `absent` variant if removal is
    /// permitted. Used by action generation, which needs every
    /// alternative for a package, not only the ones a relation has
    /// already reached.
    pub fn all_choices_for_package(&mut self, package_name: &str) -> Vec<ElementId> {
        let mut ids = Vec::new();
        if let Some(package) = self.cache.get_binary_package(package_name) {
            let versions = package.versions.clone();
            for version in &versions {
                ids.push(self.version_element_for(version));
            }
        }
        if let Some(absent) = self.absent_element_for(package_name) {
            ids.push(absent);
        }
        ids
    }

    fn version_element_for(&mut self, version: &Arc<BinaryVersion>) -> ElementId {
        let key = (version.package_name.clone(), version.version.clone());
        if let Some(id) = self.present_elements.get(&key) {
            return *id;
        }
        let id = self.graph.insert(Element::Version(VersionElement {
            choice: VersionChoice::Present(version.clone()),
        }));
        self.present_elements.insert(key, id);
        id
    }

    fn absent_element_for(&mut self, package_name: &str) -> Option<ElementId> {
        if let Some(id) = self.absent_elements.get(package_name) {
            return Some(*id);
        }
        if !self.removal_permitted(package_name) {
            return None;
        }
        let id = self.graph.insert(Element::Version(VersionElement {
            choice: VersionChoice::Absent(package_name.to_string()),
        }));
        self.absent_elements.insert(package_name.to_string(), id);
        Some(id)
    }

    fn removal_permitted(&self, package_name: &str) -> bool {
        !self.config.no_remove
            || !self.old_packages.contains_key(package_name)
            || self.auto_installed.contains(package_name)
    }

    fn conflict_targets(&self, package_name: &str, expr: Option<&RelationExpression>) -> Vec<String> {
        expr.map(|e| e.alternatives.iter().map(|r| r.package_name.clone()).collect())
            .unwrap_or_else(|| vec![package_name.to_string()])
    }

    fn relation_existed_on_old_version(
        &self,
        package_name: &str,
        dep_type: DependencyType,
        expr: &RelationExpression,
    ) -> bool {
        self.old_packages.get(package_name).is_some_and(|old| {
            old.relation_line(dep_type)
                .expressions
                .iter()
                .any(|e| e.hash_key() == expr.hash_key())
        })
    }

    fn relation_is_satisfied_by_old_packages(&self, expr: &RelationExpression) -> bool {
        expr.alternatives
            .iter()
            .any(|rel| self.old_packages.get(&rel.package_name).is_some_and(|v| rel.matches_version(&v.version)))
    }

    fn should_drop_soft_relation(
        &self,
        package_name: &str,
        dep_type: DependencyType,
        expr: &RelationExpression,
        install_flag: bool,
    ) -> bool {
        let existed = self.relation_existed_on_old_version(package_name, dep_type, expr);
        let satisfied_before = self.relation_is_satisfied_by_old_packages(expr);
        if existed && !satisfied_before {
            return true;
        }
        !install_flag && !satisfied_before
    }
}
