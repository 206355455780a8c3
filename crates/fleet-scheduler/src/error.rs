use miette::Diagnostic;
use thiserror::Error;

use fleet_graph::GraphError;
use fleet_util::errors::FleetError;

/// Conditions that abort a run. Per-package build failures are not errors;
/// they are recorded in the [`crate::BuildReport`].
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// The graph cannot be scheduled (cycle); nothing was dispatched.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// The graph references a package the plan has no entry for.
    #[error("Package '{package}' is in the dependency graph but has no build plan")]
    MissingPlan { package: String },

    /// Work remains but nothing is ready or running.
    #[error("Scheduler stalled with {} package(s) still pending: {}", pending.len(), pending.join(", "))]
    Stalled { pending: Vec<String> },

    /// A build task was cancelled or lost by the runtime.
    #[error("Build task could not be joined: {message}")]
    TaskJoin { message: String },

    /// The final built/failed partition does not cover the working set.
    #[error("Result accounting mismatch: {message}")]
    Accounting { message: String },
}

impl From<SchedulerError> for FleetError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Graph(g) => g.into(),
            other => FleetError::Build {
                message: other.to_string(),
            },
        }
    }
}
