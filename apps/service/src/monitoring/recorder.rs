use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use super::types::{CheckReport, CheckStatus};
use crate::database::Database;
use crate::database::models::Heartbeat;

/// Heartbeat recorder - persists one check cycle as an atomic batch.
///
/// Each cycle appends one heartbeat per evaluated entry plus exactly one
/// roll-up heartbeat (`entry_key = None`), all sharing the cycle timestamp.
/// The repository writes the batch in a single transaction so the per-entry
/// history can never hold a roll-up without its entry rows or vice versa.
pub struct HeartbeatRecorder {
    database: Arc<dyn Database>,
}

impl HeartbeatRecorder {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Record the heartbeats for one completed cycle.
    ///
    /// `rollup_status` is the status the scheduler decided for the roll-up
    /// row (PENDING while a failing monitor still has retries left, the
    /// report's own verdict otherwise). Entry rows always carry their
    /// evaluated verdict.
    pub async fn record_cycle(
        &self,
        report: &CheckReport,
        rollup_status: CheckStatus,
    ) -> Result<()> {
        let latest_rollup = self.database.latest_heartbeat(report.monitor_uuid, None).await?;

        // Cycle timestamp, forced strictly past the previous cycle's so the
        // per-key ordering invariant holds even if the wall clock stalls.
        let mut time = Utc::now();
        if let Some(previous) = &latest_rollup {
            if time <= previous.time {
                time = previous.time + Duration::milliseconds(1);
            }
        }

        let mut batch = Vec::with_capacity(report.entries.len() + 1);

        for verdict in &report.entries {
            let previous = self
                .database
                .latest_heartbeat(report.monitor_uuid, Some(&verdict.entry_key))
                .await?;

            batch.push(Heartbeat {
                id: None,
                monitor_uuid: report.monitor_uuid,
                entry_key: Some(verdict.entry_key.clone()),
                time,
                status: verdict.status,
                message: verdict.message.clone(),
                ping_ms: Some(report.duration_ms),
                important: previous.map(|p| p.status != verdict.status).unwrap_or(true),
            });
        }

        batch.push(Heartbeat {
            id: None,
            monitor_uuid: report.monitor_uuid,
            entry_key: None,
            time,
            status: rollup_status,
            message: report.message.clone(),
            ping_ms: Some(report.duration_ms),
            important: latest_rollup.map(|p| p.status != rollup_status).unwrap_or(true),
        });

        self.database.record_heartbeats(&batch).await
    }
}
