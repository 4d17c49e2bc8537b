//! Changeset partitioning and removal force flags (§4.4 steps 7-8).

use crate::builder::OrderingGraph;
use crate::error::{Error, Result};
use crate::types::{ActionKind, Changeset, InnerActionGroup};
use ahash::AHashSet;
use apt_cache::{Flag, SystemState};
use std::sync::Arc;

/// Walk the linearised groups, closing a changeset whenever the
/// "unpacked-but-not-yet-configured" set empties and the last group
/// wasn't `continued`; then greedily merge adjacent changesets while
/// the combined archive-download size stays within `archives_space_limit`
/// (`0` meaning unbounded). Also applies step 8's removal force flags.
pub fn partition(
    graph: &OrderingGraph,
    mut groups: Vec<InnerActionGroup>,
    state: &SystemState,
    archives_space_limit: u64,
) -> Result<Vec<Changeset>> {
    for group in &mut groups {
        apply_removal_force_flags(graph, group, state);
    }

    let raw = split_into_changesets(graph, groups);
    merge_changesets(raw, archives_space_limit)
}

fn apply_removal_force_flags(graph: &OrderingGraph, group: &mut InnerActionGroup, state: &SystemState) {
    let mut flags: AHashSet<&'static str> = group.dpkg_flags.iter().copied().collect();
    for &action_id in &group.actions {
        let action = &graph[action_id];
        if action.kind != ActionKind::Remove || action.fake {
            continue;
        }
        if let Some(entry) = state.get(&action.package_name) {
            if entry.flag == Flag::Reinstreq {
                flags.insert("--force-remove-reinstreq");
            }
        }
        if action.version.essential {
            flags.insert("--force-remove-essential");
        }
    }
    group.dpkg_flags = flags.into_iter().collect();
}

fn split_into_changesets(graph: &OrderingGraph, groups: Vec<InnerActionGroup>) -> Vec<Changeset> {
    let mut changesets = Vec::new();
    let mut current_groups = Vec::new();
    let mut unpacked_not_configured: AHashSet<String> = AHashSet::new();
    let mut downloads: Vec<Arc<apt_cache::BinaryVersion>> = Vec::new();
    let mut seen_downloads: AHashSet<String> = AHashSet::new();

    for group in groups {
        let was_continued = group.continued;
        for &action_id in &group.actions {
            let action = &graph[action_id];
            match action.kind {
                ActionKind::Unpack => {
                    unpacked_not_configured.insert(action.package_name.clone());
                    let key = format!("{}={}", action.package_name, action.version.version);
                    if seen_downloads.insert(key) {
                        downloads.push(action.version.clone());
                    }
                }
                ActionKind::Configure => {
                    unpacked_not_configured.remove(&action.package_name);
                }
                ActionKind::Remove => {}
            }
        }

        current_groups.push(group);

        if unpacked_not_configured.is_empty() && !was_continued {
            changesets.push(Changeset {
                groups: std::mem::take(&mut current_groups),
                downloads: std::mem::take(&mut downloads),
            });
            seen_downloads.clear();
        }
    }

    if !current_groups.is_empty() {
        changesets.push(Changeset { groups: current_groups, downloads });
    }

    changesets
}

fn merge_changesets(changesets: Vec<Changeset>, limit: u64) -> Result<Vec<Changeset>> {
    let mut merged: Vec<Changeset> = Vec::new();

    for changeset in changesets {
        let size: u64 = changeset.downloads.iter().map(|v| v.size).sum();
        if limit != 0 && size > limit {
            return Err(Error::ChangesetTooLarge { required: size, limit });
        }

        if let Some(last) = merged.last_mut() {
            let combined: u64 = last.downloads.iter().chain(changeset.downloads.iter()).map(|v| v.size).sum();
            if limit == 0 || combined <= limit {
                last.groups.extend(changeset.groups);
                last.downloads.extend(changeset.downloads);
                continue;
            }
        }
        merged.push(changeset);
    }

    Ok(merged)
}
