//! Single-owner schedule bookkeeping.
//!
//! [`ScheduleState`] is only ever touched by the scheduler's control loop, so
//! the "remove parent, check for newly eligible children" step of one
//! completion never interleaves with another's.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use fleet_core::package::PackageId;

use crate::error::SchedulerError;
use crate::plan::BuildPlan;
use crate::priority::{Priority, ReadyQueue};
use crate::report::{BuildReport, BuiltPackage, FailedPackage, FailureReason};
use crate::unit::BuildRequest;

/// Lifecycle of one package: `Pending -> InFlight -> Succeeded | Failed`,
/// or `Pending -> Failed` when an ancestor fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageState {
    Pending { unsatisfied: BTreeSet<PackageId> },
    InFlight { dispatch_seq: u64 },
    Succeeded { version: String },
    Failed { reason: FailureReason },
}

impl PackageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// A package taken off the ready queue, with its request assembled.
#[derive(Debug)]
pub struct Dispatch {
    pub package: PackageId,
    pub priority: Priority,
    pub dispatch_seq: u64,
    pub request: BuildRequest,
}

pub struct ScheduleState<'p> {
    plan: &'p BuildPlan,
    states: BTreeMap<PackageId, PackageState>,
    ready: ReadyQueue,
    resolved: BTreeMap<PackageId, String>,
    pending: usize,
    in_flight: usize,
    next_dispatch: u64,
    next_finish: u64,
    built: Vec<BuiltPackage>,
    failed: Vec<FailedPackage>,
}

impl<'p> ScheduleState<'p> {
    /// Seed every package as pending on its in-working-set parents. Packages
    /// with none are immediately ready: they form topological batch 0.
    pub fn new(plan: &'p BuildPlan) -> Self {
        let graph = plan.graph();
        let mut states = BTreeMap::new();
        let mut ready = ReadyQueue::new();

        for id in graph.nodes() {
            let unsatisfied: BTreeSet<PackageId> = graph
                .parents_of(id)
                .filter(|p| graph.contains(p))
                .cloned()
                .collect();
            if unsatisfied.is_empty() {
                ready.push(id.clone(), plan.priority(id));
            }
            states.insert(id.clone(), PackageState::Pending { unsatisfied });
        }

        Self {
            plan,
            pending: states.len(),
            states,
            ready,
            resolved: BTreeMap::new(),
            in_flight: 0,
            next_dispatch: 0,
            next_finish: 0,
            built: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn state(&self, id: &str) -> Option<&PackageState> {
        self.states.get(id)
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// No dispatchable work left and nothing running.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.in_flight == 0
    }

    /// Ids still pending, for stall diagnostics.
    pub fn pending_ids(&self) -> Vec<PackageId> {
        self.states
            .iter()
            .filter(|(_, s)| matches!(s, PackageState::Pending { .. }))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Move the best ready package to `InFlight` and build its request.
    pub fn dispatch_next(&mut self) -> Result<Option<Dispatch>, SchedulerError> {
        while let Some((package, priority)) = self.ready.pop() {
            let eligible = matches!(
                self.states.get(&package),
                Some(PackageState::Pending { unsatisfied }) if unsatisfied.is_empty()
            );
            if !eligible {
                tracing::debug!(package = %package, "skipping stale ready entry");
                continue;
            }

            let Some(request) = self.plan.request_for(&package, &self.resolved) else {
                return Err(SchedulerError::MissingPlan { package });
            };

            let dispatch_seq = self.next_dispatch;
            self.next_dispatch += 1;
            self.states
                .insert(package.clone(), PackageState::InFlight { dispatch_seq });
            self.pending -= 1;
            self.in_flight += 1;

            return Ok(Some(Dispatch {
                package,
                priority,
                dispatch_seq,
                request,
            }));
        }
        Ok(None)
    }

    fn take_in_flight(&mut self, id: &str) -> Result<u64, SchedulerError> {
        match self.states.get(id) {
            Some(PackageState::InFlight { dispatch_seq }) => {
                let seq = *dispatch_seq;
                self.in_flight -= 1;
                Ok(seq)
            }
            other => Err(SchedulerError::Accounting {
                message: format!("completion reported for '{id}' in state {other:?}"),
            }),
        }
    }

    /// Record a successful build. Returns the children that became eligible.
    pub fn record_success(
        &mut self,
        id: &str,
        version: String,
        duration: Duration,
    ) -> Result<Vec<PackageId>, SchedulerError> {
        let dispatch_seq = self.take_in_flight(id)?;
        let finish_seq = self.next_finish;
        self.next_finish += 1;

        self.resolved
            .entry(id.to_string())
            .or_insert_with(|| version.clone());
        self.states.insert(
            id.to_string(),
            PackageState::Succeeded {
                version: version.clone(),
            },
        );
        self.built.push(BuiltPackage {
            package: id.to_string(),
            version,
            dispatch_seq,
            finish_seq,
            duration,
        });

        let plan = self.plan;
        let mut newly_ready = Vec::new();
        for child in plan.graph().children_of(id) {
            if let Some(PackageState::Pending { unsatisfied }) = self.states.get_mut(child) {
                if unsatisfied.remove(id) && unsatisfied.is_empty() {
                    self.ready.push(child.clone(), plan.priority(child));
                    newly_ready.push(child.clone());
                }
            }
        }
        Ok(newly_ready)
    }

    /// Record a failed build and fail its whole dependent subtree. Returns the
    /// packages failed by cascade.
    pub fn record_failure(
        &mut self,
        id: &str,
        message: String,
        duration: Duration,
    ) -> Result<Vec<PackageId>, SchedulerError> {
        self.take_in_flight(id)?;
        self.next_finish += 1;
        self.states.insert(
            id.to_string(),
            PackageState::Failed {
                reason: FailureReason::Build {
                    message: message.clone(),
                },
            },
        );
        self.failed.push(FailedPackage {
            package: id.to_string(),
            reason: FailureReason::Build { message },
            duration: Some(duration),
        });
        Ok(self.cascade_from(id))
    }

    fn cascade_from(&mut self, origin: &str) -> Vec<PackageId> {
        let mut cascaded = Vec::new();
        for descendant in self.plan.graph().descendants(origin) {
            match self.states.get(&descendant) {
                Some(PackageState::Pending { .. }) => {
                    self.fail_pending(
                        &descendant,
                        FailureReason::Cascade {
                            origin: origin.to_string(),
                        },
                    );
                    cascaded.push(descendant);
                }
                Some(PackageState::InFlight { .. }) => {
                    tracing::warn!(
                        package = %descendant,
                        origin,
                        "dependent of a failed package is already running"
                    );
                }
                _ => {}
            }
        }
        cascaded
    }

    fn fail_pending(&mut self, id: &str, reason: FailureReason) {
        self.ready.remove(id);
        self.pending -= 1;
        self.states.insert(
            id.to_string(),
            PackageState::Failed {
                reason: reason.clone(),
            },
        );
        self.failed.push(FailedPackage {
            package: id.to_string(),
            reason,
            duration: None,
        });
    }

    /// Close the run, checking that built and failed partition the working set.
    pub fn into_report(self, elapsed: Duration) -> Result<BuildReport, SchedulerError> {
        if !self.is_drained() {
            return Err(SchedulerError::Accounting {
                message: format!(
                    "run closed with {} pending and {} in flight",
                    self.pending, self.in_flight
                ),
            });
        }

        if let Some((id, state)) = self.states.iter().find(|(_, s)| !s.is_terminal()) {
            return Err(SchedulerError::Accounting {
                message: format!("'{id}' never reached a final state: {state:?}"),
            });
        }

        let mut seen = BTreeSet::new();
        let ids = self
            .built
            .iter()
            .map(|b| &b.package)
            .chain(self.failed.iter().map(|f| &f.package));
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(SchedulerError::Accounting {
                    message: format!("'{id}' reported more than once"),
                });
            }
            if !self.states.contains_key(id) {
                return Err(SchedulerError::Accounting {
                    message: format!("'{id}' is not in the working set"),
                });
            }
        }
        if seen.len() != self.states.len() {
            let missing: Vec<&str> = self
                .states
                .keys()
                .map(String::as_str)
                .filter(|id| !seen.contains(id))
                .collect();
            return Err(SchedulerError::Accounting {
                message: format!("no result recorded for: {}", missing.join(", ")),
            });
        }

        Ok(BuildReport {
            built: self.built,
            failed: self.failed,
            elapsed,
        })
    }
}
