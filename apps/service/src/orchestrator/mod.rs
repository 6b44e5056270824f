/// Orchestrator module - coordinates all components
///
/// The orchestrator owns startup wiring (schema, repository, executor,
/// recorder, scheduler), keeps the scheduled tasks in sync with monitor
/// configuration, and logs check reports as they arrive. Pausing or
/// deleting a monitor takes effect at the next reload, which aborts the
/// monitor's task; an aborted task cannot write heartbeats for a cycle
/// that was in flight.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::database::models::{CHECK_TYPE_JSON_ENTRIES, Monitor};
use crate::database::{Database, DatabaseImpl, initialize_database};
use crate::monitoring::validation::validate_monitor_url;
use crate::monitoring::{CheckExecutor, CheckReport, CheckScheduler, HeartbeatRecorder};
use crate::pool::LibsqlPool;

/// Main orchestrator for the entrywatch service
pub struct Orchestrator {
    config: Arc<Config>,
    database: Arc<dyn Database>,
    executor: Arc<CheckExecutor>,
    recorder: Arc<HeartbeatRecorder>,
    task_handles: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Create and run an orchestrator until shutdown
    pub async fn start(config: Config, pool: LibsqlPool) -> Result<()> {
        let mut orchestrator = Self::new(config, pool).await?;
        orchestrator.run().await
    }

    async fn new(config: Config, pool: LibsqlPool) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing database schema...");
        {
            let conn = pool.get().await?;
            initialize_database(&conn).await?;
        }

        let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));
        let executor = Arc::new(CheckExecutor::new(config.http.default_timeout_seconds)?);
        let recorder = Arc::new(HeartbeatRecorder::new(database.clone()));

        Ok(Self { config, database, executor, recorder, task_handles: Vec::new() })
    }

    async fn run(&mut self) -> Result<()> {
        info!("Starting entrywatch orchestrator...");

        let (report_tx, mut report_rx) =
            mpsc::channel::<CheckReport>(self.config.scheduler.report_channel_capacity);
        let scheduler =
            CheckScheduler::new(self.executor.clone(), self.recorder.clone(), report_tx);

        info!("Loading monitors from database...");
        let monitors = self.load_schedulable_monitors().await?;
        info!("Found {} enabled monitors", monitors.len());
        self.task_handles = scheduler.schedule_monitors(monitors);

        let reload_interval = Duration::from_secs(self.config.scheduler.reload_interval_seconds);
        let mut last_reload = Instant::now();

        loop {
            tokio::select! {
                Some(report) = report_rx.recv() => {
                    info!(
                        monitor = %report.monitor_uuid,
                        status = %report.status,
                        duration_ms = report.duration_ms,
                        "{}", report.message
                    );
                }

                // Periodic task: pick up created, edited, paused, and
                // deleted monitors by rescheduling from storage
                _ = tokio::time::sleep_until(
                    tokio::time::Instant::from_std(last_reload + reload_interval)
                ) => {
                    debug!("Checking for new or updated monitors...");
                    match self.load_schedulable_monitors().await {
                        Ok(monitors) => {
                            for handle in self.task_handles.drain(..) {
                                handle.abort();
                            }
                            let active = monitors.len();
                            self.task_handles = scheduler.schedule_monitors(monitors);
                            info!("Reloaded monitors: {active} active");
                        }
                        Err(e) => {
                            error!("Failed to reload monitors: {e:#}");
                        }
                    }
                    last_reload = Instant::now();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, cancelling monitor tasks");
                    for handle in self.task_handles.drain(..) {
                        handle.abort();
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Enabled monitors of the supported check type with a valid target
    async fn load_schedulable_monitors(&self) -> Result<Vec<Monitor>> {
        let monitors = self.database.get_enabled_monitors().await?;

        Ok(monitors
            .into_iter()
            .filter(|monitor| {
                if monitor.check_type != CHECK_TYPE_JSON_ENTRIES {
                    warn!(
                        monitor = %monitor.uuid,
                        check_type = %monitor.check_type,
                        "skipping monitor with unsupported check type"
                    );
                    return false;
                }
                if let Err(e) = validate_monitor_url(&monitor.url) {
                    warn!(monitor = %monitor.uuid, "skipping monitor with invalid target: {e}");
                    return false;
                }
                true
            })
            .collect())
    }
}
