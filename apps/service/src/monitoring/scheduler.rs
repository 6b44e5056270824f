use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::executor::CheckExecutor;
use super::recorder::HeartbeatRecorder;
use super::types::{CheckReport, CheckStatus};
use crate::database::models::Monitor;

/// Check scheduler - owns per-monitor timing.
///
/// Each monitor gets one task that runs its cycles inline, so a monitor can
/// never have two cycles in flight. Cancellation is by aborting the task
/// handle: an abort at any await point stops the cycle before it can record.
pub struct CheckScheduler {
    executor: Arc<CheckExecutor>,
    recorder: Arc<HeartbeatRecorder>,
    report_tx: mpsc::Sender<CheckReport>,
}

impl CheckScheduler {
    pub fn new(
        executor: Arc<CheckExecutor>,
        recorder: Arc<HeartbeatRecorder>,
        report_tx: mpsc::Sender<CheckReport>,
    ) -> Self {
        Self { executor, recorder, report_tx }
    }

    /// Spawn the periodic check task for a single monitor.
    ///
    /// The first cycle runs immediately; afterwards the delay between cycles
    /// follows the monitor's interval, retry interval, or resend interval
    /// depending on the verdict and retry counter.
    pub fn schedule_monitor(&self, monitor: Monitor) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let recorder = self.recorder.clone();
        let report_tx = self.report_tx.clone();

        tokio::spawn(async move {
            if !monitor.enabled {
                return;
            }

            let mut retry_count = 0u32;

            loop {
                let report = executor.execute_check(&monitor).await;
                let rollup = rollup_status(&monitor, retry_count, report.status);

                if let Err(e) = recorder.record_cycle(&report, rollup).await {
                    error!(monitor = %monitor.uuid, "failed to record heartbeats: {e:#}");
                }

                let (delay, next_retry_count) = next_delay(&monitor, retry_count, report.status);
                retry_count = next_retry_count;

                if report_tx.send(report).await.is_err() {
                    info!(monitor = %monitor.uuid, "report channel closed, stopping task");
                    break;
                }

                tokio::time::sleep(delay).await;
            }
        })
    }

    pub fn schedule_monitors(&self, monitors: Vec<Monitor>) -> Vec<JoinHandle<()>> {
        monitors.into_iter().map(|monitor| self.schedule_monitor(monitor)).collect()
    }
}

/// Decide the delay before the next cycle and the updated retry counter.
///
/// UP resets the counter and returns to the normal interval. A failure burns
/// a retry (retry interval) until the counter is pinned at `max_retries`;
/// after that the resend interval applies, or the normal interval when
/// resend suppression is disabled (`resend_interval_seconds == 0`).
pub fn next_delay(monitor: &Monitor, retry_count: u32, status: CheckStatus) -> (Duration, u32) {
    if status == CheckStatus::Up {
        return (Duration::from_secs(monitor.interval_seconds), 0);
    }

    if retry_count < monitor.max_retries {
        return (Duration::from_secs(monitor.retry_interval_seconds), retry_count + 1);
    }

    if monitor.resend_interval_seconds > 0 {
        (Duration::from_secs(monitor.resend_interval_seconds), retry_count)
    } else {
        (Duration::from_secs(monitor.interval_seconds), retry_count)
    }
}

/// Status recorded for the cycle's roll-up heartbeat.
///
/// While a failing monitor still has retries left the roll-up is PENDING
/// rather than DOWN; entry heartbeats keep their evaluated verdicts.
pub fn rollup_status(monitor: &Monitor, retry_count: u32, status: CheckStatus) -> CheckStatus {
    if status == CheckStatus::Down && retry_count < monitor.max_retries {
        CheckStatus::Pending
    } else {
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> Monitor {
        let mut monitor = Monitor::new("svc", "https://example.com/health");
        monitor.interval_seconds = 60;
        monitor.retry_interval_seconds = 20;
        monitor.resend_interval_seconds = 600;
        monitor.max_retries = 2;
        monitor
    }

    #[test]
    fn up_resets_retries_and_uses_interval() {
        let (delay, retries) = next_delay(&monitor(), 2, CheckStatus::Up);
        assert_eq!(delay, Duration::from_secs(60));
        assert_eq!(retries, 0);
    }

    #[test]
    fn failure_burns_retries_then_switches_to_resend() {
        let monitor = monitor();

        // First and second failures use the retry interval.
        let (delay, retries) = next_delay(&monitor, 0, CheckStatus::Down);
        assert_eq!(delay, Duration::from_secs(20));
        assert_eq!(retries, 1);

        let (delay, retries) = next_delay(&monitor, retries, CheckStatus::Down);
        assert_eq!(delay, Duration::from_secs(20));
        assert_eq!(retries, 2);

        // Retries exhausted: the next fire is scheduled at the resend
        // interval and the counter stays pinned.
        let (delay, retries) = next_delay(&monitor, retries, CheckStatus::Down);
        assert_eq!(delay, Duration::from_secs(600));
        assert_eq!(retries, 2);
    }

    #[test]
    fn zero_resend_interval_falls_back_to_normal_cadence() {
        let mut monitor = monitor();
        monitor.resend_interval_seconds = 0;
        let (delay, retries) = next_delay(&monitor, 2, CheckStatus::Down);
        assert_eq!(delay, Duration::from_secs(60));
        assert_eq!(retries, 2);
    }

    #[test]
    fn zero_max_retries_fails_straight_to_resend() {
        let mut monitor = monitor();
        monitor.max_retries = 0;
        let (delay, retries) = next_delay(&monitor, 0, CheckStatus::Down);
        assert_eq!(delay, Duration::from_secs(600));
        assert_eq!(retries, 0);
    }

    #[test]
    fn rollup_is_pending_while_retries_remain() {
        let monitor = monitor();
        assert_eq!(rollup_status(&monitor, 0, CheckStatus::Down), CheckStatus::Pending);
        assert_eq!(rollup_status(&monitor, 1, CheckStatus::Down), CheckStatus::Pending);
        assert_eq!(rollup_status(&monitor, 2, CheckStatus::Down), CheckStatus::Down);
        assert_eq!(rollup_status(&monitor, 0, CheckStatus::Up), CheckStatus::Up);
    }

    #[test]
    fn rollup_is_down_immediately_without_retries() {
        let mut monitor = monitor();
        monitor.max_retries = 0;
        assert_eq!(rollup_status(&monitor, 0, CheckStatus::Down), CheckStatus::Down);
    }
}
