//! Terminal progress for a running build.

use indicatif::ProgressBar;

use fleet_scheduler::{ScheduleEvent, ScheduleObserver};
use fleet_util::progress::{build_progress, status, status_error, status_info, status_warn};

/// Prints a status line per package transition and advances a progress bar
/// for every package that reaches a final state.
pub struct ConsoleObserver {
    bar: ProgressBar,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            build_progress(total as u64)
        };
        Self { bar, quiet }
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn line(&self, print: fn(&str, &str), label: &str, message: &str) {
        if !self.quiet {
            self.bar.suspend(|| print(label, message));
        }
    }
}

impl ScheduleObserver for ConsoleObserver {
    fn on_event(&mut self, event: &ScheduleEvent<'_>) {
        match *event {
            ScheduleEvent::Dispatched { package, priority } => {
                self.line(status_info, "Building", &format!("{package} ({priority} priority)"));
                self.bar.set_message(package.to_string());
            }
            ScheduleEvent::Succeeded { package, version } => {
                self.line(status, "Built", &format!("{package} v{version}"));
                self.bar.inc(1);
            }
            ScheduleEvent::Failed { package, reason } => {
                let first = reason.lines().next().unwrap_or_default();
                self.line(status_error, "Failed", &format!("{package}: {first}"));
                self.bar.inc(1);
            }
            ScheduleEvent::Cascaded { package, origin } => {
                self.line(
                    status_warn,
                    "Skipped",
                    &format!("{package} (dependency '{origin}' failed)"),
                );
                self.bar.inc(1);
            }
        }
    }
}
