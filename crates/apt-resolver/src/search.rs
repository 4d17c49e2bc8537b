//! The best-first search loop (§4.3 "Search model").

use crate::error::{Error, Result};
use crate::score::ScoreManager;
use crate::solution::Solution;
use crate::types::{Action, Decision, Reason};
use ahash::{AHashMap, AHashSet};
use apt_cache::{BinaryVersion, DependencyType, PackageCache};
use apt_config::ResolverConfig;
use apt_core::version::compare_versions;
use apt_depgraph::{
    DependencyGraphBuilder, Element, ElementGraph, ElementId, Importance, InitialState,
    UserRequestSpec, VersionChoice, VersionElement,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// One broken (version, relation) pair found during validation (§4.3
/// step 2).
#[derive(Debug, Clone, Copy)]
pub struct Broken {
    /// The version element that owns the broken relation.
    pub owner: ElementId,
    /// The `RelationElement`/`AntiRelationElement`/`SynchronisationElement`
    /// that isn't satisfied.
    pub relation: ElementId,
}

/// Drives the best-first search described in §4.3: pick the
/// highest-scoring candidate solution, validate it, generate and apply
/// actions for the first broken constraint found, and repeat until a
/// clean solution is proposed to the caller's callback.
pub struct Resolver<'a> {
    builder: DependencyGraphBuilder<'a>,
    cache: &'a PackageCache,
    config: &'a ResolverConfig,
    old_packages: AHashMap<String, Arc<BinaryVersion>>,
    auto_installed: AHashSet<String>,
    user_request_roots: Vec<ElementId>,
    next_id: u64,
}

impl<'a> Resolver<'a> {
    /// Start a resolver over `cache`, configured by `config`.
    #[must_use]
    pub fn new(cache: &'a PackageCache, config: &'a ResolverConfig) -> Self {
        Self {
            builder: DependencyGraphBuilder::new(cache, config),
            cache,
            config,
            old_packages: AHashMap::new(),
            auto_installed: AHashSet::new(),
            user_request_roots: Vec::new(),
            next_id: 0,
        }
    }

    /// Seed the search from the installed package set (§4.2 `fill`),
    /// returning the initial solution.
    pub fn seed(&mut self, installed: &[Arc<BinaryVersion>], auto_installed: &AHashSet<String>) -> Solution {
        self.auto_installed = auto_installed.clone();
        self.old_packages = installed.iter().map(|v| (v.package_name.clone(), v.clone())).collect();

        let seeded = self.builder.fill(installed, auto_installed);
        let mut assignment = im::HashMap::new();
        for (id, state) in seeded {
            match state {
                InitialState::Installed => {
                    if let Element::Version(v) = self.builder.graph().get(id) {
                        assignment.insert(v.choice.package_name().to_string(), id);
                    }
                }
                InitialState::Requests => self.user_request_roots.push(id),
            }
        }
        Solution::seed(assignment, self.next_id)
    }

    /// Register an explicit user request and fold it into the initial
    /// assignment (install requests that resolve unambiguously are
    /// applied immediately so the first validation pass already sees
    /// them).
    pub fn add_request(&mut self, solution: &mut Solution, request: UserRequestSpec) {
        let inverted = request.inverted;
        let package_name = request.package_name.clone();
        let request_id = self.builder.add_user_relation_expression(request);
        self.user_request_roots.push(request_id);

        if !inverted {
            for succ in self.builder.graph().successors(request_id).to_vec() {
                if let Element::Version(v) = self.builder.graph().get(succ) {
                    if v.choice.package_name() == package_name {
                        solution.assignment.insert(package_name.clone(), succ);
                        solution.record_reason(succ, Reason::ManuallyRequested, self.config.track_reasons);
                        break;
                    }
                }
            }
        }
    }

    /// Run the search to completion, invoking `callback` on each
    /// clean-validating candidate until it returns
    /// [`Decision::Accept`] or [`Decision::Abandon`] (§4.3 steps 5-6).
    pub fn resolve(
        &mut self,
        initial: Solution,
        mut callback: impl FnMut(&Solution, &ElementGraph) -> Decision,
    ) -> Result<Solution> {
        let mut pool = vec![initial];

        'outer: loop {
            let Some(mut current) = Self::pop_best(&mut pool) else {
                return Err(Error::NoSolution);
            };

            loop {
                let Some(broken) = self.validate(&current) else {
                    break;
                };
                let actions = self.generate_actions(&current, broken);
                if actions.is_empty() {
                    debug!("dead end, no actions available for broken constraint");
                    continue 'outer;
                }
                if actions.len() == 1 {
                    current = self.apply(&current, &actions[0], broken);
                    continue;
                }
                for action in &actions {
                    pool.push(self.apply(&current, action, broken));
                }
                Self::trim(&mut pool, self.config.max_solution_count);
                continue 'outer;
            }

            // Final from-scratch re-check before handing the solution
            // to the caller (§4.3 step 5).
            debug_assert!(self.validate(&current).is_none());
            let finished = self.auto_remove(&current);

            match callback(&finished, self.builder.graph()) {
                Decision::Accept => return Ok(finished),
                Decision::Decline => continue,
                Decision::Abandon => return Err(Error::Abandoned),
            }
        }
    }

    /// Validate `solution` against every active dependency group, in a
    /// fixed order, returning the first broken constraint found (§4.3
    /// step 2).
    #[must_use]
    pub fn validate(&mut self, solution: &Solution) -> Option<Broken> {
        let mut packages: Vec<(String, ElementId)> =
            solution.assignment.iter().map(|(k, v)| (k.clone(), *v)).collect();
        packages.sort_by(|a, b| a.0.cmp(&b.0));

        for dep_type in DependencyType::default_active() {
            for (_, owner) in &packages {
                if !matches!(
                    self.builder.graph().get(*owner),
                    Element::Version(VersionElement { choice: VersionChoice::Present(_) })
                ) {
                    continue;
                }
                self.builder.unfold_element(*owner);
                for succ in self.builder.graph().successors(*owner).to_vec() {
                    let matches_dep_type = match self.builder.graph().get(succ) {
                        Element::Relation(r) => r.dependency_type == *dep_type,
                        Element::AntiRelation(a) => a.dependency_type == *dep_type,
                        _ => false,
                    };
                    if matches_dep_type && !relation_satisfied(solution, self.builder.graph(), succ) {
                        return Some(Broken { owner: *owner, relation: succ });
                    }
                }
            }
        }

        for (_, owner) in &packages {
            if !matches!(
                self.builder.graph().get(*owner),
                Element::Version(VersionElement { choice: VersionChoice::Present(_) })
            ) {
                continue;
            }
            for succ in self.builder.graph().successors(*owner).to_vec() {
                if matches!(self.builder.graph().get(succ), Element::Synchronisation(_))
                    && !relation_satisfied(solution, self.builder.graph(), succ)
                {
                    return Some(Broken { owner: *owner, relation: succ });
                }
            }
        }

        for root in self.user_request_roots.clone() {
            if let Element::UserRequest(_) = self.builder.graph().get(root) {
                for succ in self.builder.graph().successors(root).to_vec() {
                    // A direct `Version` successor *is* the candidate, not a
                    // relation wrapping candidates, so satisfaction is
                    // checked against `root`'s whole successor set (matching
                    // any alternative), not against this one candidate.
                    if matches!(self.builder.graph().get(succ), Element::Version(_))
                        && !relation_satisfied(solution, self.builder.graph(), root)
                    {
                        return Some(Broken { owner: root, relation: root });
                    }
                    // An `AntiRelation` successor wraps its own non-conflicting
                    // candidates, so it's checked the same way a package's own
                    // anti-dependency edges are in the loop above.
                    if matches!(self.builder.graph().get(succ), Element::AntiRelation(_))
                        && !relation_satisfied(solution, self.builder.graph(), succ)
                    {
                        return Some(Broken { owner: root, relation: succ });
                    }
                    if matches!(self.builder.graph().get(succ), Element::Unsatisfied(_))
                        && !relation_satisfied(solution, self.builder.graph(), root)
                    {
                        return Some(Broken { owner: root, relation: root });
                    }
                }
            }
        }

        None
    }

    /// Propose actions for `broken` (§4.3 "Action generation").
    #[must_use]
    pub fn generate_actions(&mut self, solution: &Solution, broken: Broken) -> Vec<Action> {
        let mut actions = Vec::new();

        let (owner_package, is_anti) = match self.builder.graph().get(broken.owner) {
            Element::Version(v) => (v.choice.package_name().to_string(), false),
            Element::UserRequest(r) => (r.package_name.clone(), false),
            _ => return actions,
        };
        let is_anti = is_anti || matches!(self.builder.graph().get(broken.relation), Element::AntiRelation(_));

        for succ in self.builder.graph().successors(broken.relation).to_vec() {
            match self.builder.graph().get(succ) {
                Element::Version(_) => actions.push(Action::InstallVersion { element: succ }),
                Element::Unsatisfied(_) => actions.push(Action::AcceptUnsatisfied { element: succ }),
                _ => {}
            }
        }

        if !owner_package.is_empty() {
            let current = solution.assignment.get(&owner_package).copied();
            for alt in self.builder.all_choices_for_package(&owner_package) {
                if Some(alt) == current {
                    continue;
                }
                match self.builder.graph().get(alt) {
                    Element::Version(VersionElement { choice: VersionChoice::Present(_) }) => {
                        actions.push(Action::InstallVersion { element: alt });
                    }
                    Element::Version(VersionElement { choice: VersionChoice::Absent(_) }) => {
                        actions.push(Action::Remove { element: alt });
                    }
                    _ => {}
                }
            }
        }

        if is_anti {
            if let Element::AntiRelation(a) = self.builder.graph().get(broken.relation) {
                let target = a.target_package.clone();
                for alt in self.builder.all_choices_for_package(&target) {
                    match self.builder.graph().get(alt) {
                        Element::Version(VersionElement { choice: VersionChoice::Present(_) }) => {
                            actions.push(Action::InstallVersion { element: alt });
                        }
                        Element::Version(VersionElement { choice: VersionChoice::Absent(_) }) => {
                            actions.push(Action::Remove { element: alt });
                        }
                        _ => {}
                    }
                }
            }
        }

        actions.dedup_by_key(|a| a.element());
        actions
    }

    /// Apply one action to `solution`, returning the derived clone with
    /// its score and assignment updated (§4.3 step 4).
    #[must_use]
    pub fn apply(&mut self, solution: &Solution, action: &Action, broken: Broken) -> Solution {
        let mut next = solution.clone();
        next.level += 1;
        self.next_id += 1;
        next.id = self.next_id;

        match action {
            Action::AcceptUnsatisfied { element } => {
                if let Element::Unsatisfied(u) = self.builder.graph().get(*element) {
                    let score = ScoreManager::new(&self.config.score);
                    next.score += score.unsatisfied_penalty(u.penalty_kind);
                    next.accepted_unsatisfied.insert(*element);
                    next.record_reason(*element, Reason::UnsatisfiedAccepted, self.config.track_reasons);
                }
            }
            Action::InstallVersion { element } | Action::Remove { element } => {
                if let Element::Version(v) = self.builder.graph().get(*element) {
                    let package_name = v.choice.package_name().to_string();
                    let old_id = next.assignment.get(&package_name).copied();
                    let old_weight = old_id.map_or(0, |id| self.weight_of(id));
                    let new_weight = self.weight_of(*element);
                    let is_downgrade = self.is_downgrade(old_id, *element);

                    let score = ScoreManager::new(&self.config.score);
                    next.score += score.change_score(old_weight, new_weight, is_downgrade, next.level);
                    next.assignment.insert(package_name, *element);

                    let reason = match self.builder.graph().get(broken.relation) {
                        Element::Relation(r) => Reason::Depends {
                            from_package: self
                                .builder
                                .graph()
                                .get(broken.owner)
                                .package_name()
                                .unwrap_or_default()
                                .to_string(),
                            dependency_type: r.dependency_type,
                        },
                        Element::AntiRelation(a) => Reason::Conflicts {
                            from_package: self
                                .builder
                                .graph()
                                .get(broken.owner)
                                .package_name()
                                .unwrap_or_default()
                                .to_string(),
                            dependency_type: a.dependency_type,
                        },
                        Element::Synchronisation(s) => Reason::Synchronise { with_package: s.source_version.clone() },
                        _ => Reason::ManuallyRequested,
                    };
                    next.record_reason(*element, reason, self.config.track_reasons);
                }
            }
        }

        next
    }

    /// Reachability-based auto-removal pass (§4.3 "Auto-removal
    /// pass"): anything not reached from an explicit request or a
    /// manually-installed package, and eligible for removal, is flipped
    /// to its `absent` element.
    #[must_use]
    pub fn auto_remove(&mut self, solution: &Solution) -> Solution {
        let mut reachable: AHashSet<String> = AHashSet::new();
        let mut stack: Vec<ElementId> = self.user_request_roots.clone();
        for (package_name, id) in &solution.assignment {
            if !self.auto_installed.contains(package_name) {
                stack.push(*id);
            }
        }

        while let Some(id) = stack.pop() {
            match self.builder.graph().get(id) {
                Element::Version(v) => {
                    let package_name = v.choice.package_name().to_string();
                    if reachable.insert(package_name) {
                        for succ in self.builder.graph().successors(id).to_vec() {
                            if matches!(
                                self.builder.graph().get(succ),
                                Element::Relation(_) | Element::Synchronisation(_)
                            ) {
                                stack.push(succ);
                            }
                        }
                    }
                }
                Element::Relation(_) | Element::Synchronisation(_) => {
                    for succ in self.builder.graph().successors(id).to_vec() {
                        if let Element::Version(v) = self.builder.graph().get(succ) {
                            if solution.assignment.get(v.choice.package_name()) == Some(&succ) {
                                stack.push(succ);
                            }
                        }
                    }
                }
                Element::UserRequest(_) => {
                    for succ in self.builder.graph().successors(id).to_vec() {
                        stack.push(succ);
                    }
                }
                _ => {}
            }
        }

        let mut next = solution.clone();
        let package_names: Vec<String> = next.assignment.keys().cloned().collect();
        for package_name in package_names {
            if reachable.contains(&package_name) {
                continue;
            }
            let Some(current_id) = next.assignment.get(&package_name).copied() else {
                continue;
            };
            if !matches!(
                self.builder.graph().get(current_id),
                Element::Version(VersionElement { choice: VersionChoice::Present(_) })
            ) {
                continue;
            }
            if let Ok(Some(absent_id)) = self.builder.get_corresponding_empty_element(current_id) {
                next.assignment.insert(package_name.clone(), absent_id);
                next.record_reason(absent_id, Reason::AutomaticRemoval, self.config.track_reasons);
            }
        }
        next
    }

    fn weight_of(&self, element: ElementId) -> i64 {
        let score = ScoreManager::new(&self.config.score);
        match self.builder.graph().get(element) {
            Element::Version(VersionElement { choice: VersionChoice::Present(v) }) => {
                let pin = self.cache.get_pin(v);
                let is_new = !self.old_packages.contains_key(&v.package_name);
                let is_auto = self.auto_installed.contains(&v.package_name);
                score.version_weight(pin, v, is_new, is_auto)
            }
            Element::Version(VersionElement { choice: VersionChoice::Absent(_) }) => score.absent_weight(),
            _ => 0,
        }
    }

    fn is_downgrade(&self, old_id: Option<ElementId>, new_id: ElementId) -> bool {
        let (Some(old_id), Element::Version(VersionElement { choice: VersionChoice::Present(new_v) })) =
            (old_id, self.builder.graph().get(new_id))
        else {
            return false;
        };
        if let Element::Version(VersionElement { choice: VersionChoice::Present(old_v) }) = self.builder.graph().get(old_id) {
            compare_versions(&new_v.version, &old_v.version) == Ordering::Less
        } else {
            false
        }
    }

    fn pop_best(pool: &mut Vec<Solution>) -> Option<Solution> {
        let idx = pool.iter().enumerate().max_by(|(_, a), (_, b)| a.cmp(b)).map(|(i, _)| i)?;
        Some(pool.swap_remove(idx))
    }

    fn trim(pool: &mut Vec<Solution>, cap: usize) {
        while pool.len() > cap {
            let Some(idx) = pool.iter().enumerate().min_by(|(_, a), (_, b)| a.cmp(b)).map(|(i, _)| i) else {
                break;
            };
            pool.swap_remove(idx);
        }
    }
}

fn relation_satisfied(solution: &Solution, graph: &ElementGraph, relation_id: ElementId) -> bool {
    for succ in graph.successors(relation_id) {
        match graph.get(*succ) {
            Element::Version(v) => {
                let package_name = v.choice.package_name();
                if solution.assignment.get(package_name) == Some(succ) {
                    return true;
                }
            }
            Element::Unsatisfied(_) => {
                if solution.accepted_unsatisfied.contains(succ) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
