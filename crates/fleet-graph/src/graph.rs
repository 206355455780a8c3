//! Dependency graph construction restricted to a working set.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use fleet_core::manifest::Manifest;
use fleet_core::package::PackageId;

use crate::working_set::WorkingSet;

type Adjacency = BTreeMap<PackageId, BTreeSet<PackageId>>;

/// Children and parents adjacency views over a working set.
///
/// `p` is a child of `q` (and `q` a parent of `p`) iff `p` declares a
/// dependency on `q` and both are in the working set. Every working-set
/// package has an entry in both maps, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    children: Adjacency,
    parents: Adjacency,
}

impl DependencyGraph {
    /// Build the graph for `working_set` from the manifest's declarations.
    ///
    /// Dependencies on packages outside the working set are assumed to be
    /// satisfied by an earlier run and are dropped.
    pub fn build(manifest: &Manifest, working_set: &WorkingSet) -> Self {
        let declared = manifest
            .packages
            .iter()
            .filter(|p| working_set.contains(&p.name))
            .map(|p| {
                let deps = p.dependency_names().map(str::to_string).collect::<Vec<_>>();
                (p.name.clone(), deps)
            });
        let graph = Self::from_dependencies(declared);
        tracing::debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    /// Build the graph from `(package, dependencies)` pairs; the working set
    /// is exactly the set of packages listed. A self-dependency is kept as a
    /// self-edge so the sorter rejects it as a cycle.
    pub fn from_dependencies<I>(declared: I) -> Self
    where
        I: IntoIterator<Item = (PackageId, Vec<PackageId>)>,
    {
        let declared: Vec<(PackageId, Vec<PackageId>)> = declared.into_iter().collect();

        let mut graph = Self::default();
        for (id, _) in &declared {
            graph.children.entry(id.clone()).or_default();
            graph.parents.entry(id.clone()).or_default();
        }

        for (id, deps) in &declared {
            for dep in deps {
                if !graph.children.contains_key(dep) {
                    continue;
                }
                graph
                    .children
                    .entry(dep.clone())
                    .or_default()
                    .insert(id.clone());
                graph
                    .parents
                    .entry(id.clone())
                    .or_default()
                    .insert(dep.clone());
            }
        }
        graph
    }

    /// All packages in the graph, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &PackageId> {
        self.children.keys()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(BTreeSet::len).sum()
    }

    /// The `children` view: package -> packages that depend on it.
    pub fn children(&self) -> &BTreeMap<PackageId, BTreeSet<PackageId>> {
        &self.children
    }

    /// The `parents` view: package -> packages it depends on.
    pub fn parents(&self) -> &BTreeMap<PackageId, BTreeSet<PackageId>> {
        &self.parents
    }

    /// Direct dependents of `id` within the working set.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &PackageId> {
        self.children.get(id).into_iter().flatten()
    }

    /// Direct dependencies of `id` within the working set.
    pub fn parents_of(&self, id: &str) -> impl Iterator<Item = &PackageId> {
        self.parents.get(id).into_iter().flatten()
    }

    pub fn has_dependents(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// Every package reachable from `id` through the children relation,
    /// excluding `id` itself.
    pub fn descendants(&self, id: &str) -> BTreeSet<PackageId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&PackageId> = self.children_of(id).collect();
        while let Some(next) = queue.pop_front() {
            if next != id && seen.insert(next.clone()) {
                queue.extend(self.children_of(next));
            }
        }
        seen
    }

    /// Convert to a petgraph graph with edges pointing from dependency to
    /// dependent.
    pub fn to_petgraph(&self) -> DiGraph<PackageId, ()> {
        let mut g = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();
        for id in self.nodes() {
            index.insert(id.as_str(), g.add_node(id.clone()));
        }
        for (from, children) in &self.children {
            for to in children {
                if let (Some(&a), Some(&b)) = (index.get(from.as_str()), index.get(to.as_str())) {
                    g.add_edge(a, b, ());
                }
            }
        }
        g
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let g = self.to_petgraph();
        format!("{:?}", Dot::with_config(&g, &[Config::EdgeNoLabel]))
    }
}
