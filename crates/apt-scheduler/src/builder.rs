//! Ordering graph construction: inner actions, the pseudo-essential
//! closure, inter-package dependency edges, and virtual unchanged-
//! package injection (§4.4 steps 1-4).

use crate::types::{
    ActionId, ActionKind, ActionsPreview, ChangeKind, EdgeAttribute, EdgeClass, InnerAction, PackageChange,
};
use ahash::{AHashMap, AHashSet};
use apt_cache::{BinaryVersion, DependencyType, PackageCache};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::sync::Arc;
use tracing::debug;

/// The ordering graph: one node per `InnerAction`, one edge per
/// "predecessor must complete before successor" constraint.
pub type OrderingGraph = StableDiGraph<InnerAction, EdgeAttribute>;

/// Builds the ordering graph from a previewed change set (§4.4 steps
/// 1-4).
pub struct SchedulerBuilder<'a> {
    cache: &'a PackageCache,
    graph: OrderingGraph,
    by_package: AHashMap<String, AHashMap<ActionKind, ActionId>>,
}

impl<'a> SchedulerBuilder<'a> {
    /// Start a builder over `cache`.
    #[must_use]
    pub fn new(cache: &'a PackageCache) -> Self {
        Self {
            cache,
            graph: StableDiGraph::new(),
            by_package: AHashMap::new(),
        }
    }

    /// Run steps 1-4 and return the finished ordering graph.
    #[must_use]
    pub fn build(mut self, preview: &ActionsPreview) -> OrderingGraph {
        self.step1_inner_actions(preview);
        let pseudo_essential = self.step2_pseudo_essential_closure(preview);
        self.colocate_pseudo_essential(&pseudo_essential);
        self.step3_inter_package_edges(preview);
        self.step4_virtual_injection(preview);
        self.graph
    }

    /// Step 1 — for each previewed change, emit 1-3 inner actions in
    /// canonical order `Remove -> Unpack -> Configure`, with base
    /// priorities and the "unpack-after-removal" bonus, linked so they
    /// stay adjacent.
    fn step1_inner_actions(&mut self, preview: &ActionsPreview) {
        for change in preview {
            if !change.kind.produces_actions() {
                continue;
            }
            let (remove_version, unpack_version) = match change.kind {
                ChangeKind::Remove | ChangeKind::Purge => (change.old_version.clone(), None),
                ChangeKind::Install | ChangeKind::Reinstall => (None, change.new_version.clone()),
                ChangeKind::Upgrade | ChangeKind::Downgrade => {
                    (change.old_version.clone(), change.new_version.clone())
                }
                ChangeKind::Configure => (None, change.new_version.clone()),
                ChangeKind::Deconfigure | ChangeKind::ProcessTriggers => (None, None),
                ChangeKind::Markauto | ChangeKind::Unmarkauto => unreachable!("filtered above"),
            };

            let mut remove_id = None;
            if let Some(version) = remove_version.filter(|_| matches!(change.kind, ChangeKind::Remove | ChangeKind::Purge | ChangeKind::Upgrade | ChangeKind::Downgrade))
            {
                remove_id = Some(self.push_action(&change.package_name, version, ActionKind::Remove, ActionKind::Remove.base_priority()));
            }

            if matches!(change.kind, ChangeKind::Configure) {
                if let Some(version) = change.new_version.clone() {
                    self.push_action(&change.package_name, version, ActionKind::Configure, ActionKind::Configure.base_priority());
                }
                continue;
            }

            let Some(unpack_version) = unpack_version else { continue };

            let unpack_priority = if remove_id.is_some() {
                ActionKind::Unpack.base_priority() + 6
            } else {
                ActionKind::Unpack.base_priority()
            };
            let unpack_id = self.push_action(&change.package_name, unpack_version.clone(), ActionKind::Unpack, unpack_priority);
            let configure_id = self.push_action(&change.package_name, unpack_version, ActionKind::Configure, ActionKind::Configure.base_priority());

            if let Some(remove_id) = remove_id {
                self.link(remove_id, unpack_id);
            }
            self.link(unpack_id, configure_id);
        }
    }

    /// Step 2 — the transitive set of packages reachable from
    /// `essential=true` installed versions via Pre-Depends/Depends.
    fn step2_pseudo_essential_closure(&self, preview: &ActionsPreview) -> AHashSet<String> {
        let mut closure = AHashSet::new();
        let mut stack: Vec<String> = preview
            .iter()
            .filter_map(|c| c.old_version.as_ref().or(c.new_version.as_ref()))
            .filter(|v| v.essential)
            .map(|v| v.package_name.clone())
            .collect();

        while let Some(package_name) = stack.pop() {
            if !closure.insert(package_name.clone()) {
                continue;
            }
            let Some(package) = self.cache.get_binary_package(&package_name) else { continue };
            for version in &package.versions {
                for dep_type in [DependencyType::PreDepends, DependencyType::Depends] {
                    for expression in version.relation_line(dep_type).expressions {
                        for relation in expression.alternatives {
                            if !closure.contains(&relation.package_name) {
                                stack.push(relation.package_name);
                            }
                        }
                    }
                }
            }
        }
        closure
    }

    /// For every pseudo-essential package present in this change set,
    /// force its Remove/Unpack and Unpack/Configure edges to merge the
    /// three actions into one inseparable group.
    fn colocate_pseudo_essential(&mut self, pseudo_essential: &AHashSet<String>) {
        for package_name in pseudo_essential {
            let Some(actions) = self.by_package.get(package_name).cloned() else { continue };
            if let (Some(&remove), Some(&unpack)) = (actions.get(&ActionKind::Remove), actions.get(&ActionKind::Unpack)) {
                self.link(remove, unpack);
                self.link(unpack, remove);
                debug!(package = %package_name, "co-located Remove/Unpack of pseudo-essential package");
            }
            if let (Some(&unpack), Some(&configure)) = (actions.get(&ActionKind::Unpack), actions.get(&ActionKind::Configure)) {
                self.link(unpack, configure);
                self.link(configure, unpack);
                debug!(package = %package_name, "co-located Unpack/Configure of pseudo-essential package");
            }
        }
    }

    /// Step 3 — inter-package dependency edges derived from each
    /// version's relation lines.
    fn step3_inter_package_edges(&mut self, preview: &ActionsPreview) {
        for change in preview {
            let Some(version) = change.new_version.clone() else { continue };
            let unpack_id = self.by_package.get(&change.package_name).and_then(|m| m.get(&ActionKind::Unpack)).copied();
            let configure_id = self.by_package.get(&change.package_name).and_then(|m| m.get(&ActionKind::Configure)).copied();

            if let Some(unpack_id) = unpack_id {
                for expression in version.relation_line(DependencyType::PreDepends).expressions {
                    let description = expression.to_string();
                    for relation in &expression.alternatives {
                        if let Some(&configure_of) = self.configure_action_of(&relation.package_name) {
                            self.add_edge(configure_of, unpack_id, EdgeAttribute::relation(DependencyType::PreDepends, description.clone(), false, EdgeClass::Hard));
                        }
                    }
                }
                for dep_type in [DependencyType::Conflicts, DependencyType::Breaks] {
                    for expression in version.relation_line(dep_type).expressions {
                        let description = expression.to_string();
                        for relation in &expression.alternatives {
                            if let Some(&remove_of) = self.remove_action_of(&relation.package_name) {
                                let class = if dep_type == DependencyType::Breaks { EdgeClass::Medium } else { EdgeClass::Hard };
                                self.add_edge(remove_of, unpack_id, EdgeAttribute::relation(dep_type, description.clone(), false, class));
                            }
                        }
                    }
                }
            }

            if let Some(configure_id) = configure_id {
                for expression in version.relation_line(DependencyType::Depends).expressions {
                    let description = expression.to_string();
                    for relation in &expression.alternatives {
                        if let Some(&configure_of) = self.configure_action_of(&relation.package_name) {
                            if configure_of != configure_id {
                                self.add_edge(configure_of, configure_id, EdgeAttribute::relation(DependencyType::Depends, description.clone(), false, EdgeClass::Hard));
                            }
                        }
                    }
                }
            }

            if let Some(&remove_id) = self.by_package.get(&change.package_name).and_then(|m| m.get(&ActionKind::Remove)) {
                for dep_type in [DependencyType::PreDepends, DependencyType::Depends] {
                    for expression in version.relation_line(dep_type).expressions {
                        let description = expression.to_string();
                        for relation in &expression.alternatives {
                            if let Some(&remove_of) = self.remove_action_of(&relation.package_name) {
                                self.add_edge(remove_id, remove_of, EdgeAttribute::relation(dep_type, description.clone(), true, EdgeClass::Hard));
                            }
                        }
                    }
                }
                for dep_type in [DependencyType::Conflicts, DependencyType::Breaks] {
                    for expression in version.relation_line(dep_type).expressions {
                        let description = expression.to_string();
                        for relation in &expression.alternatives {
                            if let Some(&unpack_of) = self.unpack_action_of(&relation.package_name) {
                                let class = if dep_type == DependencyType::Breaks { EdgeClass::Medium } else { EdgeClass::Hard };
                                self.add_edge(remove_id, unpack_of, EdgeAttribute::relation(dep_type, description.clone(), true, class));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Step 4 — synthesise a fake Configure -> fake Remove vertex pair
    /// for every installed package untouched by the preview, multiply
    /// edges through it, then delete the fake nodes. Exposes chains
    /// like "installing Y implies removing X because Y Conflicts-
    /// replaces X".
    fn step4_virtual_injection(&mut self, preview: &ActionsPreview) {
        let touched: AHashSet<&str> = preview.iter().map(|c| c.package_name.as_str()).collect();
        let untouched_installed: Vec<Arc<BinaryVersion>> = preview
            .iter()
            .filter_map(|c| c.old_version.clone())
            .filter(|v| !touched.contains(v.package_name.as_str()))
            .collect();

        for version in untouched_installed {
            let fake_configure = self.graph.add_node(InnerAction {
                package_name: version.package_name.clone(),
                version: version.clone(),
                kind: ActionKind::Configure,
                fake: true,
                priority: 0,
                linked_from: None,
                linked_to: None,
            });
            let fake_remove = self.graph.add_node(InnerAction {
                package_name: version.package_name.clone(),
                version,
                kind: ActionKind::Remove,
                fake: true,
                priority: 0,
                linked_from: None,
                linked_to: None,
            });
            self.graph.add_edge(fake_configure, fake_remove, EdgeAttribute::fundamental());

            let predecessors: Vec<(ActionId, EdgeAttribute)> = self
                .graph
                .edges_directed(fake_configure, Direction::Incoming)
                .map(|e| (e.source(), e.weight().clone()))
                .collect();
            let successors: Vec<(ActionId, EdgeAttribute)> = self
                .graph
                .edges_directed(fake_remove, Direction::Outgoing)
                .map(|e| (e.target(), e.weight().clone()))
                .collect();

            for (pred, pred_attr) in &predecessors {
                for (succ, succ_attr) in &successors {
                    if pred == succ {
                        continue;
                    }
                    let merged = if pred_attr.class <= succ_attr.class { pred_attr.through_virtual() } else { succ_attr.through_virtual() };
                    self.graph.add_edge(*pred, *succ, merged);
                }
            }

            self.graph.remove_node(fake_configure);
            self.graph.remove_node(fake_remove);
        }
    }

    fn push_action(&mut self, package_name: &str, version: Arc<BinaryVersion>, kind: ActionKind, priority: i32) -> ActionId {
        let id = self.graph.add_node(InnerAction {
            package_name: package_name.to_string(),
            version,
            kind,
            fake: false,
            priority,
            linked_from: None,
            linked_to: None,
        });
        self.by_package.entry(package_name.to_string()).or_default().insert(kind, id);
        id
    }

    fn link(&mut self, from: ActionId, to: ActionId) {
        self.graph.add_edge(from, to, EdgeAttribute::fundamental());
        self.graph[from].linked_to = Some(to);
        self.graph[to].linked_from = Some(from);
    }

    fn add_edge(&mut self, from: ActionId, to: ActionId, attr: EdgeAttribute) {
        if from != to {
            self.graph.add_edge(from, to, attr);
        }
    }

    fn configure_action_of(&self, package_name: &str) -> Option<&ActionId> {
        self.by_package.get(package_name).and_then(|m| m.get(&ActionKind::Configure))
    }

    fn remove_action_of(&self, package_name: &str) -> Option<&ActionId> {
        self.by_package.get(package_name).and_then(|m| m.get(&ActionKind::Remove))
    }

    fn unpack_action_of(&self, package_name: &str) -> Option<&ActionId> {
        self.by_package.get(package_name).and_then(|m| m.get(&ActionKind::Unpack))
    }
}

#[cfg(test)]
impl<'a> SchedulerBuilder<'a> {
    pub(crate) fn graph_ref(&self) -> &OrderingGraph {
        &self.graph
    }
}

impl PackageChange {
    /// Construct a simple install/upgrade/downgrade/remove change,
    /// inferring the `ChangeKind` from old/new versions when not given
    /// explicitly. Convenience used by callers assembling a preview
    /// from a resolver `Solution`.
    #[must_use]
    pub fn infer(package_name: impl Into<String>, old_version: Option<Arc<BinaryVersion>>, new_version: Option<Arc<BinaryVersion>>) -> Self {
        use apt_core::version::compare_versions;
        let kind = match (&old_version, &new_version) {
            (None, Some(_)) => ChangeKind::Install,
            (Some(_), None) => ChangeKind::Remove,
            (Some(old), Some(new)) => match compare_versions(&new.version, &old.version) {
                std::cmp::Ordering::Greater => ChangeKind::Upgrade,
                std::cmp::Ordering::Less => ChangeKind::Downgrade,
                std::cmp::Ordering::Equal => ChangeKind::Reinstall,
            },
            (None, None) => ChangeKind::ProcessTriggers,
        };
        Self { package_name: package_name.into(), kind, old_version, new_version }
    }
}
