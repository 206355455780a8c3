//! Dependency-aware parallel build scheduler.
//!
//! The [`Scheduler`] dispatches packages to a [`BuildUnit`] under a bounded
//! concurrency limit, discovers newly eligible packages as their
//! dependencies complete, hands each build a dependency list resolved at
//! dispatch time, and removes a failed package's entire dependent subtree
//! from the schedule. All bookkeeping lives in a single-owner
//! [`state::ScheduleState`] advanced only by the scheduler's control loop.

pub mod error;
pub mod observer;
pub mod plan;
pub mod priority;
pub mod report;
pub mod scheduler;
pub mod shell;
pub mod state;
pub mod unit;

pub use error::SchedulerError;
pub use observer::{NoopObserver, ScheduleEvent, ScheduleObserver};
pub use plan::{BuildPlan, PackagePlan};
pub use priority::Priority;
pub use report::{BuildReport, BuiltPackage, FailedPackage, FailureReason};
pub use scheduler::Scheduler;
pub use shell::ShellBuildUnit;
pub use unit::{BuildOutcome, BuildRequest, BuildUnit, FnBuildUnit};
