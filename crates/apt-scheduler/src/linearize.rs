//! Link expansion and cycle splitting: turns the ordering graph into a
//! linear sequence of `InnerActionGroup`s (§4.4 steps 5-6).

use crate::builder::OrderingGraph;
use crate::error::{Error, Result};
use crate::types::{ActionId, ActionKind, EdgeClass, InnerActionGroup};
use ahash::AHashMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Repeatedly topologically sort the graph's SCCs, merging consecutive
/// same-package canonical-order pairs into single groups, until no more
/// merges happen (§4.4 step 5), then break any remaining illegal cycle
/// by progressively dropping the weakest edge class present (§4.4 step
/// 6). Returns the linear group sequence.
pub fn linearize(graph: &mut OrderingGraph) -> Result<Vec<InnerActionGroup>> {
    let mut linked: AHashMap<ActionId, ActionId> = AHashMap::new();

    loop {
        let mut changed = false;
        let sccs = tarjan_scc(&*graph);

        for window in sccs.windows(2) {
            let (earlier, later) = (&window[0], &window[1]);
            if earlier.len() != 1 || later.len() != 1 {
                continue;
            }
            let (a, b) = (earlier[0], later[0]);
            if should_link(graph, a, b) {
                graph.add_edge(a, b, crate::types::EdgeAttribute::fundamental());
                graph.add_edge(b, a, crate::types::EdgeAttribute::fundamental());
                linked.insert(a, b);
                changed = true;
                debug!("linked consecutive same-package actions into one group");
            }
        }

        if !changed {
            break;
        }
    }

    let order = break_cycles(graph)?;
    Ok(group_order(graph, &order, &linked))
}

fn should_link(graph: &OrderingGraph, a: ActionId, b: ActionId) -> bool {
    let (na, nb) = (&graph[a], &graph[b]);
    if na.package_name != nb.package_name {
        return false;
    }
    matches!(
        (na.kind, nb.kind),
        (ActionKind::Remove, ActionKind::Unpack) | (ActionKind::Unpack, ActionKind::Configure)
    )
}

/// Produce a legal topological order, dropping the weakest edge class
/// present in any illegal SCC until the graph becomes acyclic or
/// `Fundamental` edges would have to be dropped (a hard failure).
fn break_cycles(graph: &mut OrderingGraph) -> Result<Vec<ActionId>> {
    loop {
        match toposort(&*graph, None) {
            Ok(order) => return Ok(order),
            Err(cycle) => {
                let sccs = tarjan_scc(&*graph);
                let illegal = sccs
                    .into_iter()
                    .find(|scc| scc.contains(&cycle.node_id()) && is_illegal(graph, scc));
                let Some(illegal) = illegal else {
                    // The reported cycle is all-Configure (legal, tolerated
                    // with --force-depends at group-formation time); drop
                    // the weakest edge among the cycle's nodes anyway so
                    // toposort can proceed, without failing.
                    drop_weakest_among(graph, &[cycle.node_id()])?;
                    continue;
                };
                drop_weakest_among(graph, &illegal)?;
            }
        }
    }
}

fn is_illegal(graph: &OrderingGraph, scc: &[ActionId]) -> bool {
    scc.len() > 1 && scc.iter().any(|&id| graph[id].kind != ActionKind::Configure)
}

fn drop_weakest_among(graph: &mut OrderingGraph, nodes: &[ActionId]) -> Result<()> {
    let node_set: BTreeSet<ActionId> = nodes.iter().copied().collect();
    let mut weakest: Option<EdgeClass> = None;

    for &node in nodes {
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            if node_set.contains(&edge.target()) {
                let class = edge.weight().class;
                weakest = Some(weakest.map_or(class, |w| w.min(class)));
            }
        }
    }

    let Some(weakest) = weakest else { return Ok(()) };
    if weakest == EdgeClass::Fundamental {
        let packages: Vec<String> = nodes.iter().map(|&id| graph[id].package_name.clone()).collect();
        return Err(Error::UnbreakableCycle { packages });
    }

    let to_remove: Vec<_> = graph
        .edge_indices()
        .filter(|&e| {
            let (src, dst) = graph.edge_endpoints(e).unwrap();
            node_set.contains(&src) && node_set.contains(&dst) && graph[e].class == weakest
        })
        .collect();

    warn!(class = ?weakest, count = to_remove.len(), "dropping edge class to break illegal cycle");
    for e in to_remove {
        graph.remove_edge(e);
    }
    Ok(())
}

/// Fold the linear node order plus the linked pairs from step 5 into
/// `InnerActionGroup`s, carrying forward any dpkg force flags the
/// dropped edge classes implied.
fn group_order(graph: &OrderingGraph, order: &[ActionId], linked: &AHashMap<ActionId, ActionId>) -> Vec<InnerActionGroup> {
    let mut groups = Vec::new();
    let mut visited = BTreeSet::new();

    for &id in order {
        if !visited.insert(id) {
            continue;
        }
        if graph[id].fake {
            continue;
        }

        let mut actions = vec![id];
        let mut flags = BTreeSet::new();
        let mut cursor = id;
        while let Some(&next) = linked.get(&cursor) {
            if !visited.insert(next) {
                break;
            }
            actions.push(next);
            cursor = next;
        }

        for &action in &actions {
            for edge in graph.edges_directed(action, Direction::Outgoing) {
                if let Some(flag) = edge.weight().class.force_flag(edge.weight().dependency_type) {
                    flags.insert(flag);
                }
            }
        }

        groups.push(InnerActionGroup {
            actions,
            dpkg_flags: flags.into_iter().collect(),
            continued: false,
        });
    }

    // Mark every group but the last as a continuation of a linked
    // chain when its final action was actually step-5-linked to the
    // next group's first action (kept together for the changeset
    // partitioner).
    for i in 0..groups.len().saturating_sub(1) {
        if let Some(&last) = groups[i].actions.last() {
            if let Some(&next) = linked.get(&last) {
                if groups[i + 1].actions.first() == Some(&next) {
                    groups[i].continued = true;
                }
            }
        }
    }

    groups
}
