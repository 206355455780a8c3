//! Batching topological sort (Kahn's algorithm, one level at a time).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use fleet_core::package::PackageId;

use crate::error::GraphError;
use crate::graph::DependencyGraph;

/// One topological level: packages whose dependencies all lie in earlier levels.
pub type Batch = BTreeSet<PackageId>;

/// Compute topological levels from a `children` adjacency map.
///
/// Every node appears in exactly one batch. If some nodes never reach an
/// in-degree of zero the graph has a cycle, reported with its members.
pub fn batches(children: &BTreeMap<PackageId, BTreeSet<PackageId>>) -> Result<Vec<Batch>, GraphError> {
    let mut in_degree: BTreeMap<&str, usize> =
        children.keys().map(|k| (k.as_str(), 0)).collect();
    for kids in children.values() {
        for kid in kids {
            *in_degree.entry(kid.as_str()).or_insert(0) += 1;
        }
    }

    let mut levels = Vec::new();
    let mut current: Batch = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(k, _)| k.to_string())
        .collect();

    while !current.is_empty() {
        let mut next = Batch::new();
        for node in &current {
            for child in children.get(node).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(child.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        next.insert(child.clone());
                    }
                }
            }
        }
        levels.push(current);
        current = next;
    }

    let stuck: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d > 0)
        .map(|(k, _)| *k)
        .collect();
    if !stuck.is_empty() {
        let members = cycle_members(children, &stuck);
        tracing::debug!(?members, stuck = stuck.len(), "topological sort found a cycle");
        return Err(GraphError::Cycle { members });
    }

    Ok(levels)
}

/// Narrow the nodes left over by Kahn's algorithm to those actually on a
/// cycle; the rest merely sit downstream of one.
fn cycle_members(
    children: &BTreeMap<PackageId, BTreeSet<PackageId>>,
    stuck: &BTreeSet<&str>,
) -> Vec<String> {
    let mut g: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for &node in stuck {
        index.insert(node, g.add_node(node));
    }
    for &node in stuck {
        for child in children.get(node).into_iter().flatten() {
            if let Some(&to) = index.get(child.as_str()) {
                g.add_edge(index[node], to, ());
            }
        }
    }

    let mut members: Vec<String> = tarjan_scc(&g)
        .into_iter()
        .filter(|scc| scc.len() > 1 || g.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(|idx| g[idx].to_string())
        .collect();

    if members.is_empty() {
        members = stuck.iter().map(|s| s.to_string()).collect();
    }
    members.sort();
    members
}

impl DependencyGraph {
    /// Topological levels of this graph.
    pub fn batches(&self) -> Result<Vec<Batch>, GraphError> {
        batches(self.children())
    }
}
