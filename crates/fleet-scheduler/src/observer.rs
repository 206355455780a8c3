//! Incremental progress notifications from the control loop.

use crate::priority::Priority;

/// Something the scheduler just did, reported in control-loop order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleEvent<'a> {
    Dispatched {
        package: &'a str,
        priority: Priority,
    },
    Succeeded {
        package: &'a str,
        version: &'a str,
    },
    Failed {
        package: &'a str,
        reason: &'a str,
    },
    Cascaded {
        package: &'a str,
        origin: &'a str,
    },
}

/// Receives [`ScheduleEvent`]s as a run progresses.
pub trait ScheduleObserver {
    fn on_event(&mut self, event: &ScheduleEvent<'_>);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScheduleObserver for NoopObserver {
    fn on_event(&mut self, _event: &ScheduleEvent<'_>) {}
}
