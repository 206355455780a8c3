//! Immutable per-run inputs to the scheduler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fleet_core::dependency::DependencyDecl;
use fleet_core::manifest::Manifest;
use fleet_core::package::{PackageId, PackageKind};
use fleet_core::version::VersionTemplate;
use fleet_graph::{DependencyGraph, WorkingSet};

use crate::error::SchedulerError;
use crate::priority::Priority;
use crate::unit::BuildRequest;

/// Per-package snapshot taken from the manifest before scheduling starts.
#[derive(Debug, Clone)]
pub struct PackagePlan {
    pub kind: PackageKind,
    pub path: PathBuf,
    pub version: VersionTemplate,
    pub command: Option<String>,
    pub dependencies: Vec<DependencyDecl>,
}

impl PackagePlan {
    /// A plan with default metadata, depending on `dependencies` at `LATEST`.
    pub fn with_dependencies<I, S>(dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: PackageKind::Unlocked,
            path: PathBuf::new(),
            version: VersionTemplate::default(),
            command: None,
            dependencies: dependencies
                .into_iter()
                .map(DependencyDecl::latest)
                .collect(),
        }
    }
}

/// The working set, its dependency graph and every package's build inputs.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    graph: DependencyGraph,
    packages: BTreeMap<PackageId, PackagePlan>,
}

impl BuildPlan {
    /// Pair a graph with package plans; every graph node needs a plan.
    pub fn new(
        graph: DependencyGraph,
        packages: BTreeMap<PackageId, PackagePlan>,
    ) -> Result<Self, SchedulerError> {
        if let Some(missing) = graph.nodes().find(|id| !packages.contains_key(*id)) {
            return Err(SchedulerError::MissingPlan {
                package: missing.clone(),
            });
        }
        let mut packages = packages;
        packages.retain(|id, _| graph.contains(id));
        Ok(Self { graph, packages })
    }

    /// Build the plan for an (already expanded) working set.
    pub fn from_manifest(
        manifest: &Manifest,
        working_set: &WorkingSet,
        root: &Path,
    ) -> Result<Self, SchedulerError> {
        let graph = DependencyGraph::build(manifest, working_set);
        let packages = manifest
            .packages
            .iter()
            .filter(|p| working_set.contains(&p.name))
            .map(|p| {
                let plan = PackagePlan {
                    kind: p.kind,
                    path: fleet_util::fs::resolve_under(root, p.path()),
                    version: p.version.clone(),
                    command: p.command.clone(),
                    dependencies: p.dependency_decls(),
                };
                (p.name.clone(), plan)
            })
            .collect();
        Self::new(graph, packages)
    }

    /// Plan from `(package, dependencies)` pairs with default metadata.
    pub fn from_dependencies<I, D>(declared: I) -> Self
    where
        I: IntoIterator<Item = (PackageId, D)>,
        D: IntoIterator<Item = PackageId>,
    {
        let mut packages = BTreeMap::new();
        let mut edges = Vec::new();
        for (id, deps) in declared {
            let deps: Vec<PackageId> = deps.into_iter().collect();
            packages.insert(id.clone(), PackagePlan::with_dependencies(deps.clone()));
            edges.push((id, deps));
        }
        Self {
            graph: DependencyGraph::from_dependencies(edges),
            packages,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn package(&self, id: &str) -> Option<&PackagePlan> {
        self.packages.get(id)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Pair a graph with plans without checking coverage.
    #[cfg(test)]
    pub(crate) fn unchecked(graph: DependencyGraph, packages: BTreeMap<PackageId, PackagePlan>) -> Self {
        Self { graph, packages }
    }

    /// Dispatch tier for `id`.
    pub fn priority(&self, id: &str) -> Priority {
        let kind = self.packages.get(id).map(|p| p.kind).unwrap_or_default();
        Priority::for_package(kind, self.graph.has_dependents(id))
    }

    /// Assemble the request for `id`, substituting versions from `resolved`
    /// into `LATEST` placeholders.
    pub(crate) fn request_for(
        &self,
        id: &str,
        resolved: &BTreeMap<PackageId, String>,
    ) -> Option<BuildRequest> {
        let plan = self.packages.get(id)?;
        let dependencies = plan
            .dependencies
            .iter()
            .map(|decl| match resolved.get(&decl.package) {
                Some(version) if decl.constraint.is_placeholder() => decl.resolved_to(version),
                _ => decl.clone(),
            })
            .collect();
        Some(BuildRequest {
            package: id.to_string(),
            kind: plan.kind,
            path: plan.path.clone(),
            version: plan.version.clone(),
            command: plan.command.clone(),
            dependencies,
        })
    }
}
