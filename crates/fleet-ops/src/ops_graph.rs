//! Operation: inspect the dependency graph of the working set.

use serde::Serialize;

use fleet_core::package::PackageId;
use fleet_graph::DependencyGraph;

use crate::RepoContext;

/// A package with both adjacency views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub package: PackageId,
    /// Packages that depend on this one.
    pub children: Vec<PackageId>,
    /// Packages this one depends on.
    pub parents: Vec<PackageId>,
}

/// Build the dependency graph for the packages matching `patterns`.
pub fn graph(ctx: &RepoContext, patterns: &[String], all: bool) -> miette::Result<DependencyGraph> {
    let working_set = ctx.working_set(patterns, all)?;
    Ok(DependencyGraph::build(&ctx.manifest, &working_set))
}

pub fn nodes(graph: &DependencyGraph) -> Vec<GraphNode> {
    graph
        .nodes()
        .map(|id| GraphNode {
            package: id.clone(),
            children: graph.children_of(id).cloned().collect(),
            parents: graph.parents_of(id).cloned().collect(),
        })
        .collect()
}

pub fn print_graph(graph: &DependencyGraph) {
    for node in nodes(graph) {
        println!("{}", node.package);
        println!("  depends on:     {}", list(&node.parents));
        println!("  depended on by: {}", list(&node.children));
    }
}

fn list(ids: &[PackageId]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}
