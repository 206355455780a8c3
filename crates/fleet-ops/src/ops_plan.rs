//! Operation: show what a build would do without building anything.

use serde::Serialize;

use fleet_core::package::{PackageId, PackageKind};
use fleet_graph::Rationale;
use fleet_scheduler::{BuildPlan, Priority};

use crate::RepoContext;

/// One package in a dry-run plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedPackage {
    pub package: PackageId,
    #[serde(rename = "type")]
    pub kind: PackageKind,
    pub version: String,
    pub rationale: Rationale,
    pub priority: Priority,
    /// Dependencies inside the working set.
    pub dependencies: Vec<PackageId>,
}

/// Working set plus the topological batches it would be built in.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub packages: Vec<PlannedPackage>,
    pub batches: Vec<Vec<PackageId>>,
}

/// Compute the plan for the packages matching `patterns`.
///
/// Fails on the same fatal conditions a build would: unknown packages,
/// broken collections or a dependency cycle.
pub fn plan(ctx: &RepoContext, patterns: &[String], all: bool) -> miette::Result<PlanSummary> {
    let working_set = ctx.working_set(patterns, all)?;
    let plan = BuildPlan::from_manifest(&ctx.manifest, &working_set, &ctx.root)?;
    let batches = plan.graph().batches()?;

    let packages = working_set
        .iter()
        .filter_map(|(id, rationale)| {
            let pkg = plan.package(id)?;
            Some(PlannedPackage {
                package: id.clone(),
                kind: pkg.kind,
                version: pkg.version.to_string(),
                rationale: rationale.clone(),
                priority: plan.priority(id),
                dependencies: plan.graph().parents_of(id).cloned().collect(),
            })
        })
        .collect();

    Ok(PlanSummary {
        packages,
        batches: batches
            .into_iter()
            .map(|batch| batch.into_iter().collect())
            .collect(),
    })
}

pub fn print_plan(summary: &PlanSummary) {
    println!("Working set ({} package(s)):", summary.packages.len());
    for p in &summary.packages {
        println!(
            "  {} {} [{}, {} priority] {}",
            p.package, p.version, p.kind, p.priority, p.rationale
        );
    }
    println!("Batches:");
    for (i, batch) in summary.batches.iter().enumerate() {
        println!("  {}: {}", i + 1, batch.join(", "));
    }
}
