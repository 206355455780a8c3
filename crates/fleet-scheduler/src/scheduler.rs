//! The dispatch loop.
//!
//! One control loop owns the [`ScheduleState`]. Builds run as tasks in a
//! [`JoinSet`], each holding a [`Semaphore`] permit; the loop suspends on
//! `join_next()` whenever it has nothing left to dispatch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

use fleet_core::package::PackageId;

use crate::error::SchedulerError;
use crate::observer::{ScheduleEvent, ScheduleObserver};
use crate::plan::BuildPlan;
use crate::report::BuildReport;
use crate::state::{Dispatch, ScheduleState};
use crate::unit::{BuildOutcome, BuildUnit};

/// What a build task reports back to the control loop.
struct Completion {
    package: PackageId,
    outcome: BuildOutcome,
    duration: Duration,
}

/// Dependency-aware parallel build scheduler.
pub struct Scheduler<B> {
    unit: Arc<B>,
    jobs: usize,
}

impl<B: BuildUnit> Scheduler<B> {
    /// Create a scheduler running at most `jobs` builds at once.
    pub fn new(unit: B, jobs: usize) -> Self {
        Self::from_arc(Arc::new(unit), jobs)
    }

    /// Like [`Scheduler::new`] for a build unit shared with the caller.
    pub fn from_arc(unit: Arc<B>, jobs: usize) -> Self {
        Self {
            unit,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Build every package in `plan` and return the built/failed partition.
    ///
    /// Fails without dispatching anything if the graph has a cycle. Individual
    /// build failures never abort the run: the failed package's dependents
    /// are recorded as cascade failures and every independent package still
    /// builds.
    pub async fn run<O: ScheduleObserver>(
        &self,
        plan: &BuildPlan,
        observer: &mut O,
    ) -> Result<BuildReport, SchedulerError> {
        let levels = plan.graph().batches()?;
        tracing::info!(
            packages = plan.len(),
            levels = levels.len(),
            jobs = self.jobs,
            "starting build run"
        );

        let started = Instant::now();
        let mut state = ScheduleState::new(plan);
        let limiter = Arc::new(Semaphore::new(self.jobs));
        let mut tasks: JoinSet<Completion> = JoinSet::new();

        loop {
            while state.has_ready() {
                let Ok(permit) = Arc::clone(&limiter).try_acquire_owned() else {
                    break;
                };
                let Some(dispatch) = state.dispatch_next()? else {
                    break;
                };
                observer.on_event(&ScheduleEvent::Dispatched {
                    package: &dispatch.package,
                    priority: dispatch.priority,
                });
                self.spawn_build(&mut tasks, dispatch, permit);
            }

            if state.in_flight() == 0 {
                break;
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let completion = joined.map_err(|e| SchedulerError::TaskJoin {
                message: e.to_string(),
            })?;
            self.complete(&mut state, completion, observer)?;
        }

        if !state.is_drained() {
            return Err(SchedulerError::Stalled {
                pending: state.pending_ids(),
            });
        }

        let report = state.into_report(started.elapsed())?;
        tracing::info!(
            built = report.built.len(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "build run drained"
        );
        Ok(report)
    }

    fn spawn_build(
        &self,
        tasks: &mut JoinSet<Completion>,
        dispatch: Dispatch,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        let Dispatch {
            package,
            priority,
            dispatch_seq,
            request,
        } = dispatch;
        tracing::info!(package = %package, %priority, seq = dispatch_seq, "dispatching build");

        let unit = Arc::clone(&self.unit);
        let span = tracing::info_span!("build", package = %package);
        tasks.spawn(
            async move {
                let _permit = permit;
                let started = Instant::now();
                let outcome = AssertUnwindSafe(unit.build(request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        BuildOutcome::failure(format!(
                            "build unit panicked: {}",
                            panic_message(panic.as_ref())
                        ))
                    });
                Completion {
                    package,
                    outcome,
                    duration: started.elapsed(),
                }
            }
            .instrument(span),
        );
    }

    fn complete<O: ScheduleObserver>(
        &self,
        state: &mut ScheduleState<'_>,
        completion: Completion,
        observer: &mut O,
    ) -> Result<(), SchedulerError> {
        let Completion {
            package,
            outcome,
            duration,
        } = completion;

        match outcome {
            BuildOutcome::Success { version } => {
                tracing::info!(package = %package, %version, ?duration, "build succeeded");
                observer.on_event(&ScheduleEvent::Succeeded {
                    package: &package,
                    version: &version,
                });
                let newly_ready = state.record_success(&package, version, duration)?;
                if !newly_ready.is_empty() {
                    tracing::debug!(package = %package, unlocked = ?newly_ready, "dependents now eligible");
                }
            }
            BuildOutcome::Failure { reason } => {
                tracing::warn!(package = %package, %reason, "build failed");
                observer.on_event(&ScheduleEvent::Failed {
                    package: &package,
                    reason: &reason,
                });
                let cascaded = state.record_failure(&package, reason, duration)?;
                for dependent in &cascaded {
                    tracing::warn!(package = %dependent, origin = %package, "skipped: dependency failed");
                    observer.on_event(&ScheduleEvent::Cascaded {
                        package: dependent,
                        origin: &package,
                    });
                }
            }
        }
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
