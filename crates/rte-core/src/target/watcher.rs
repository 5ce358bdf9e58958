use std::time::Duration;

use tracing::debug;

use super::{RefreshReport, TargetList};
use crate::memory::layout::timing;
use crate::shutdown::ShutdownSignal;

/// Refreshes a target list on a fixed interval until shutdown.
///
/// Only the registry is touched; the watcher never opens or suspends a
/// target process.
pub struct TargetWatcher {
    interval: Duration,
}

impl TargetWatcher {
    /// Intervals below the polling floor are raised to it.
    pub fn new(interval: Duration) -> Self {
        let floor = Duration::from_millis(timing::MIN_REFRESH_INTERVAL_MILLIS);
        Self {
            interval: interval.max(floor),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` is triggered. `on_refresh` sees every report,
    /// including empty ones, and returns the number of scans performed.
    pub fn run(
        &self,
        list: &mut TargetList,
        shutdown: &ShutdownSignal,
        mut on_refresh: impl FnMut(&TargetList, &RefreshReport),
    ) -> usize {
        let mut scans = 0;
        while !shutdown.is_shutdown() {
            let report = list.refresh();
            scans += 1;
            if !report.is_empty() {
                debug!(
                    "Scan {}: {} added, {} removed",
                    scans,
                    report.added.len(),
                    report.removed.len()
                );
            }
            on_refresh(list, &report);

            if shutdown.wait(self.interval) {
                break;
            }
        }
        scans
    }
}
