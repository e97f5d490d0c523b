//! Strict-link ordering, the reverse dependency index, and frozen marking.

use std::collections::VecDeque;

use hs_core::{CompId, SimError, SimResult};
use hs_model::LinkMode;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::component::Component;

/// Integration order of the live components.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    /// Topology version this order was computed for.
    pub version: u64,
    /// Live components, every strict-link target before its readers.
    pub order: Vec<CompId>,
}

impl Topology {
    /// Order the live components by their strict links and input
    /// connections.
    ///
    /// Only components whose active state has flows contribute edges: they
    /// are the ones read during integration. A null strict link adds no
    /// edge; it fails when a flow actually reads it.
    pub fn build(comps: &[Component], version: u64) -> SimResult<Self> {
        let mut graph: DiGraph<CompId, ()> = DiGraph::new();
        let nodes: Vec<Option<NodeIndex>> = comps
            .iter()
            .map(|c| (!c.is_exited()).then(|| graph.add_node(c.id)))
            .collect();

        for comp in comps.iter().filter(|c| !c.is_exited()) {
            if comp.kind.state(comp.state).flows().is_empty() {
                continue;
            }
            let reader = nodes[comp.id.slot()];
            let strict_targets = comp
                .kind
                .links()
                .iter()
                .zip(&comp.links)
                .filter(|(def, _)| def.mode == LinkMode::Strict)
                .filter_map(|(_, target)| *target);
            let sources = comp.inputs.iter().flatten().map(|(src, _)| *src);
            for target in strict_targets.chain(sources) {
                if let (Some(from), Some(to)) = (nodes[target.slot()], reader) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| {
            let id = graph[cycle.node_id()];
            let comp = &comps[id.slot()];
            let links = comp
                .kind
                .links()
                .iter()
                .filter(|l| l.mode == LinkMode::Strict)
                .map(|l| l.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            SimError::StrictLinkCycle {
                origin: comp.origin(),
                links,
            }
        })?;

        Ok(Self {
            version,
            order: sorted.into_iter().map(|n| graph[n]).collect(),
        })
    }
}

/// Components some live component reads through a lazy link, together with
/// the sources of their input variables, in id order.
pub(crate) fn lazy_targets(comps: &[Component]) -> Vec<CompId> {
    let mut marked = vec![false; comps.len()];
    let mut pending: Vec<CompId> = comps
        .iter()
        .filter(|c| !c.is_exited())
        .flat_map(|c| {
            c.kind
                .links()
                .iter()
                .zip(&c.links)
                .filter(|(def, _)| def.mode == LinkMode::Lazy)
                .filter_map(|(_, target)| *target)
        })
        .collect();
    while let Some(id) = pending.pop() {
        let Some(seen) = marked.get_mut(id.slot()) else {
            continue;
        };
        if *seen {
            continue;
        }
        *seen = true;
        pending.extend(comps[id.slot()].inputs.iter().flatten().map(|(src, _)| *src));
    }
    comps
        .iter()
        .zip(marked)
        .filter(|(_, marked)| *marked)
        .map(|(c, _)| c.id)
        .collect()
}

/// For every component, the components that read it through any link or
/// input connection.
pub(crate) fn dependents(comps: &[Component]) -> Vec<Vec<CompId>> {
    let mut out = vec![Vec::new(); comps.len()];
    for comp in comps {
        for dep in comp.dependencies() {
            if let Some(list) = out.get_mut(dep.slot()) {
                if !list.contains(&comp.id) {
                    list.push(comp.id);
                }
            }
        }
    }
    out
}

/// Everything reachable from `seeds` through the dependents index,
/// seeds included.
pub(crate) fn reachable(
    dependents: &[Vec<CompId>],
    count: usize,
    seeds: impl IntoIterator<Item = CompId>,
) -> Vec<bool> {
    let mut seen = vec![false; count];
    let mut queue: VecDeque<CompId> = VecDeque::new();
    for id in seeds {
        if let Some(s) = seen.get_mut(id.slot()) {
            if !*s {
                *s = true;
                queue.push_back(id);
            }
        }
    }
    while let Some(id) = queue.pop_front() {
        for &d in dependents.get(id.slot()).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(s) = seen.get_mut(d.slot()) {
                if !*s {
                    *s = true;
                    queue.push_back(d);
                }
            }
        }
    }
    seen
}

/// Mark components whose values cannot change during the coming step.
///
/// A component is frozen when no flow of its active state is stepped by the
/// integrator, it reads nothing through a lazy link, and nothing it depends
/// on can change.
pub(crate) fn mark_frozen(comps: &mut [Component], dependents: &[Vec<CompId>]) {
    let seeds: Vec<CompId> = comps
        .iter()
        .filter(|c| {
            !c.is_exited()
                && (c.kind.state(c.state).flows().has_stepped()
                    || c
                        .kind
                        .links()
                        .iter()
                        .zip(&c.links)
                        .any(|(def, target)| def.mode == LinkMode::Lazy && target.is_some()))
        })
        .map(|c| c.id)
        .collect();
    let thawed = reachable(dependents, comps.len(), seeds);
    for (comp, thawed) in comps.iter_mut().zip(thawed) {
        comp.frozen = !thawed;
    }
}
