//! Operation: build every package in the working set.
//!
//! Pipeline: select -> expand build collections -> graph -> scheduler.
//! Packages are built with [`ShellBuildUnit`] unless the caller supplies its
//! own build unit through [`build_with`].

use std::time::Duration;

use fleet_core::config::{BuildOverrides, EffectiveBuildConfig};
use fleet_graph::WorkingSet;
use fleet_scheduler::{BuildPlan, BuildReport, BuildUnit, FailureReason, Scheduler, ShellBuildUnit};
use fleet_util::progress::{status, status_error};

use crate::progress::ConsoleObserver;
use crate::RepoContext;

/// Options for a build invocation.
#[derive(Debug, Default, Clone)]
pub struct BuildOptions {
    /// Glob patterns over package names; empty selects every package.
    pub patterns: Vec<String>,
    pub all: bool,
    pub overrides: BuildOverrides,
    /// Suppress status lines and the progress bar (used with `--json`).
    pub quiet: bool,
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    pub working_set: WorkingSet,
    pub config: EffectiveBuildConfig,
    pub report: BuildReport,
}

/// Build the selected packages with the shell build unit.
pub async fn build(ctx: &RepoContext, opts: &BuildOptions) -> miette::Result<BuildResult> {
    let config = EffectiveBuildConfig::layer(&opts.overrides, &ctx.manifest.build, &ctx.global);
    let unit = ShellBuildUnit::new(config.command.clone(), config.timeout, config.build_number);
    build_with(ctx, opts, config, unit).await
}

/// Build the selected packages with `unit`.
pub async fn build_with<B: BuildUnit>(
    ctx: &RepoContext,
    opts: &BuildOptions,
    config: EffectiveBuildConfig,
    unit: B,
) -> miette::Result<BuildResult> {
    let working_set = ctx.working_set(&opts.patterns, opts.all)?;
    let plan = BuildPlan::from_manifest(&ctx.manifest, &working_set, &ctx.root)?;

    tracing::info!(
        packages = plan.len(),
        jobs = config.jobs,
        build_number = config.build_number,
        "starting build"
    );

    let mut observer = ConsoleObserver::new(plan.len(), opts.quiet);
    let outcome = Scheduler::new(unit, config.jobs)
        .run(&plan, &mut observer)
        .await;
    observer.finish();
    let report = outcome?;

    Ok(BuildResult {
        working_set,
        config,
        report,
    })
}

/// Print the human-readable summary of a finished build to stdout, followed
/// by a final status line.
pub fn print_summary(report: &BuildReport) {
    let mut built: Vec<_> = report.built.iter().collect();
    built.sort_by_key(|b| b.finish_seq);
    if !built.is_empty() {
        println!("Built:");
        for b in built {
            println!("  {} v{} ({})", b.package, b.version, secs(b.duration));
        }
    }

    let direct: Vec<_> = report.direct_failures().collect();
    if !direct.is_empty() {
        println!("Failed:");
        for f in direct {
            let text = match &f.reason {
                FailureReason::Build { message } => message.replace('\n', "\n      "),
                other => other.to_string(),
            };
            println!("  {}: {text}", f.package);
        }
    }

    let cascaded: Vec<_> = report.cascade_failures().collect();
    if !cascaded.is_empty() {
        println!("Not built:");
        for f in cascaded {
            println!("  {}: {}", f.package, f.reason);
        }
    }

    let elapsed = secs(report.elapsed);
    if report.is_success() {
        status(
            "Finished",
            &format!("{} package(s) in {elapsed}", report.built.len()),
        );
    } else {
        status_error(
            "Failed",
            &format!(
                "{} of {} package(s) failed in {elapsed}",
                report.failed.len(),
                report.total()
            ),
        );
    }
}

fn secs(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}
