//! Shared resolve-then-schedule plumbing for `install`/`remove`
//! (§4.3, §4.4): turns a list of package requests into a resolved
//! solution, builds the scheduler's ordering graph over the result,
//! and prints the resulting changesets.

use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use apt_cache::PackageCache;
use apt_config::Config;
use apt_core::version::RelationLine;
use apt_depgraph::{Element, ElementGraph, Importance, UserRequestSpec, VersionChoice};
use apt_resolver::{Decision, Resolver};
use apt_scheduler::{linearize, partition, ActionKind, ActionsPreview, Changeset, PackageChange, SchedulerBuilder};
use std::sync::Arc;
use tracing::info;

/// One package named on the command line, with its optional version
/// constraint and whether the request removes it (`Remove`) or wants
/// it present (`Install`).
pub struct Request {
    pub token: String,
    pub inverted: bool,
}

/// Parse `token` (`name`, `name (>= 1.0)`, …) into a `UserRequestSpec`.
fn parse_request(token: &str, inverted: bool) -> Result<UserRequestSpec> {
    let line = RelationLine::parse(token);
    let expression = line.expressions.into_iter().next();
    let package_name = match &expression {
        Some(expr) => expr
            .alternatives
            .first()
            .map(|r| r.package_name.clone())
            .unwrap_or_else(|| token.trim().to_string()),
        None => token.trim().to_string(),
    };
    if package_name.is_empty() {
        bail!("empty package name in request {token:?}");
    }
    Ok(UserRequestSpec { package_name, expression, inverted, importance: Importance::Must })
}

/// Resolve `requests` against `cache`, then schedule the result,
/// returning the changesets the scheduler produced.
pub fn resolve_and_schedule(cache: &PackageCache, config: &Config, requests: &[Request]) -> Result<Vec<Changeset>> {
    let mut resolver = Resolver::new(cache, &config.resolver);

    let installed: Vec<_> = cache.binary_packages().filter_map(|p| p.installed.clone()).collect();
    let auto_installed: AHashSet<String> = cache
        .binary_packages()
        .filter(|p| p.installed.is_some())
        .filter(|p| cache.system_state().get(&p.name).is_some_and(|e| e.automatically_installed))
        .map(|p| p.name.clone())
        .collect();

    let mut solution = resolver.seed(&installed, &auto_installed);

    for request in requests {
        let spec = parse_request(&request.token, request.inverted)?;
        resolver.add_request(&mut solution, spec);
    }

    let mut preview: ActionsPreview = Vec::new();
    let outcome = resolver.resolve(solution, |solution, graph| {
        preview = build_preview(solution, graph, cache);
        Decision::Accept
    });
    outcome.context("no solution satisfies the given requests")?;

    info!(changes = preview.len(), "resolved solution");

    let mut graph = SchedulerBuilder::new(cache).build(&preview);
    let groups = linearize(&mut graph).context("linearising the ordering graph")?;
    let changesets =
        partition(&graph, groups, cache.system_state(), config.worker.archives_space_limit).context("partitioning changesets")?;

    for (i, changeset) in changesets.iter().enumerate() {
        println!("changeset {}:", i + 1);
        for group in &changeset.groups {
            for &action_id in &group.actions {
                let action = &graph[action_id];
                if action.fake {
                    continue;
                }
                let verb = match action.kind {
                    ActionKind::Remove => "remove",
                    ActionKind::Unpack => "unpack",
                    ActionKind::Configure => "configure",
                };
                println!("  {verb} {} {}", action.package_name, action.version.version);
            }
            if !group.dpkg_flags.is_empty() {
                println!("    (requires: {})", group.dpkg_flags.join(" "));
            }
        }
        if !changeset.downloads.is_empty() {
            let total: u64 = changeset.downloads.iter().map(|v| v.size).sum();
            println!("  downloads: {} package(s), {total} bytes", changeset.downloads.len());
        }
    }

    Ok(changesets)
}

/// Turn the resolver's final assignment into the scheduler's
/// per-package change preview, comparing each element's chosen version
/// against what's installed now.
fn build_preview(solution: &apt_resolver::Solution, graph: &ElementGraph, cache: &PackageCache) -> ActionsPreview {
    let mut preview = Vec::new();
    for (package_name, &element_id) in &solution.assignment {
        let Element::Version(version_element) = graph.get(element_id) else { continue };
        let new_version = match &version_element.choice {
            VersionChoice::Present(v) => Some(Arc::clone(v)),
            VersionChoice::Absent(_) => None,
        };
        let old_version = cache.get_binary_package(package_name).and_then(|p| p.installed.clone());
        if old_version.as_ref().map(|v| &v.version) == new_version.as_ref().map(|v| &v.version) {
            continue;
        }
        preview.push(PackageChange::infer(package_name.clone(), old_version, new_version));
    }
    preview
}
