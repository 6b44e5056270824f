#![allow(dead_code)]
use anyhow::Result;
use async_trait::async_trait;
use libsql::params;
use uuid::Uuid;

use super::models::{HealthCheckConfig, Heartbeat, Monitor};
use crate::pool::{LibsqlManager, LibsqlPool};

const MONITOR_COLUMNS: &str = "id, uuid, name, url, check_type, interval_seconds, \
     retry_interval_seconds, resend_interval_seconds, max_retries, timeout_seconds, enabled, \
     accepted_status_ranges, ignore_tls, health_check_entries, health_entries_path, \
     health_status_field, health_expected_value, created_at, updated_at";

const HEARTBEAT_COLUMNS: &str =
    "id, monitor_uuid, entry_key, time, status, message, ping_ms, important";

/// Database trait for abstracting storage operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Get all enabled monitors
    async fn get_enabled_monitors(&self) -> Result<Vec<Monitor>>;

    /// Get a monitor by UUID
    async fn get_monitor_by_uuid(&self, uuid: Uuid) -> Result<Option<Monitor>>;

    /// Create or update a monitor
    async fn save_monitor(&self, monitor: &Monitor) -> Result<i64>;

    /// Delete a monitor by UUID
    async fn delete_monitor(&self, uuid: Uuid) -> Result<()>;

    /// Append one check cycle's heartbeats as a single atomic batch:
    /// either every row is durably recorded or none is
    async fn record_heartbeats(&self, heartbeats: &[Heartbeat]) -> Result<()>;

    /// Most recent heartbeat for a `(monitor, entry_key)` pair;
    /// `entry_key = None` addresses the monitor-level roll-up history
    async fn latest_heartbeat(
        &self,
        monitor_uuid: Uuid,
        entry_key: Option<&str>,
    ) -> Result<Option<Heartbeat>>;

    /// Recent heartbeats for a `(monitor, entry_key)` pair, newest first
    async fn recent_heartbeats(
        &self,
        monitor_uuid: Uuid,
        entry_key: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Heartbeat>>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn get_enabled_monitors(&self) -> Result<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE enabled = 1"))
            .await?;

        let mut rows = stmt.query(()).await?;
        let mut monitors = Vec::new();

        while let Some(row) = rows.next().await? {
            monitors.push(monitor_from_row(&row)?);
        }

        Ok(monitors)
    }

    async fn get_monitor_by_uuid(&self, uuid: Uuid) -> Result<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE uuid = ?"))
            .await?;

        let mut rows = stmt.query(params![uuid.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_monitor(&self, monitor: &Monitor) -> Result<i64> {
        let conn = self.get_conn().await?;
        let accepted = serde_json::to_string(&monitor.accepted_status_ranges)?;
        let entries = if monitor.health_check.entries.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&monitor.health_check.entries)?)
        };
        let created_at = Monitor::datetime_to_ms(monitor.created_at);
        let updated_at = Monitor::datetime_to_ms(monitor.updated_at);

        if let Some(id) = monitor.id {
            conn.execute(
                "UPDATE monitors SET name = ?, url = ?, check_type = ?, interval_seconds = ?, \
                 retry_interval_seconds = ?, resend_interval_seconds = ?, max_retries = ?, \
                 timeout_seconds = ?, enabled = ?, accepted_status_ranges = ?, ignore_tls = ?, \
                 health_check_entries = ?, health_entries_path = ?, health_status_field = ?, \
                 health_expected_value = ?, updated_at = ? WHERE id = ?",
                params![
                    monitor.name.clone(),
                    monitor.url.clone(),
                    monitor.check_type.clone(),
                    monitor.interval_seconds as i64,
                    monitor.retry_interval_seconds as i64,
                    monitor.resend_interval_seconds as i64,
                    monitor.max_retries as i64,
                    monitor.timeout_seconds as i64,
                    if monitor.enabled { 1 } else { 0 },
                    accepted,
                    if monitor.ignore_tls { 1 } else { 0 },
                    entries,
                    monitor.health_check.entries_path.clone(),
                    monitor.health_check.status_field.clone(),
                    monitor.health_check.expected_value.clone(),
                    updated_at,
                    id
                ],
            )
            .await?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO monitors (uuid, name, url, check_type, interval_seconds, \
                 retry_interval_seconds, resend_interval_seconds, max_retries, timeout_seconds, \
                 enabled, accepted_status_ranges, ignore_tls, health_check_entries, \
                 health_entries_path, health_status_field, health_expected_value, created_at, \
                 updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    monitor.uuid.to_string(),
                    monitor.name.clone(),
                    monitor.url.clone(),
                    monitor.check_type.clone(),
                    monitor.interval_seconds as i64,
                    monitor.retry_interval_seconds as i64,
                    monitor.resend_interval_seconds as i64,
                    monitor.max_retries as i64,
                    monitor.timeout_seconds as i64,
                    if monitor.enabled { 1 } else { 0 },
                    accepted,
                    if monitor.ignore_tls { 1 } else { 0 },
                    entries,
                    monitor.health_check.entries_path.clone(),
                    monitor.health_check.status_field.clone(),
                    monitor.health_check.expected_value.clone(),
                    created_at,
                    updated_at
                ],
            )
            .await?;

            Ok(conn.last_insert_rowid())
        }
    }

    async fn delete_monitor(&self, uuid: Uuid) -> Result<()> {
        let conn = self.get_conn().await?;

        // Heartbeat rows are removed via ON DELETE CASCADE
        conn.execute("DELETE FROM monitors WHERE uuid = ?", params![uuid.to_string()]).await?;
        Ok(())
    }

    async fn record_heartbeats(&self, heartbeats: &[Heartbeat]) -> Result<()> {
        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        for heartbeat in heartbeats {
            tx.execute(
                "INSERT INTO heartbeats (id, monitor_uuid, entry_key, time, status, message, \
                 ping_ms, important) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    heartbeat.id,
                    heartbeat.monitor_uuid.to_string(),
                    heartbeat.entry_key.clone(),
                    Monitor::datetime_to_ms(heartbeat.time),
                    heartbeat.status.to_string(),
                    heartbeat.message.clone(),
                    heartbeat.ping_ms.map(|v| v as i64),
                    if heartbeat.important { 1 } else { 0 }
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest_heartbeat(
        &self,
        monitor_uuid: Uuid,
        entry_key: Option<&str>,
    ) -> Result<Option<Heartbeat>> {
        let conn = self.get_conn().await?;

        let mut rows = match entry_key {
            Some(key) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {HEARTBEAT_COLUMNS} FROM heartbeats \
                         WHERE monitor_uuid = ? AND entry_key = ? \
                         ORDER BY time DESC LIMIT 1"
                    ))
                    .await?;
                stmt.query(params![monitor_uuid.to_string(), key]).await?
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {HEARTBEAT_COLUMNS} FROM heartbeats \
                         WHERE monitor_uuid = ? AND entry_key IS NULL \
                         ORDER BY time DESC LIMIT 1"
                    ))
                    .await?;
                stmt.query(params![monitor_uuid.to_string()]).await?
            }
        };

        match rows.next().await? {
            Some(row) => Ok(Some(heartbeat_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn recent_heartbeats(
        &self,
        monitor_uuid: Uuid,
        entry_key: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Heartbeat>> {
        let conn = self.get_conn().await?;

        let mut rows = match entry_key {
            Some(key) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {HEARTBEAT_COLUMNS} FROM heartbeats \
                         WHERE monitor_uuid = ? AND entry_key = ? \
                         ORDER BY time DESC LIMIT ?"
                    ))
                    .await?;
                stmt.query(params![monitor_uuid.to_string(), key, limit as i64]).await?
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {HEARTBEAT_COLUMNS} FROM heartbeats \
                         WHERE monitor_uuid = ? AND entry_key IS NULL \
                         ORDER BY time DESC LIMIT ?"
                    ))
                    .await?;
                stmt.query(params![monitor_uuid.to_string(), limit as i64]).await?
            }
        };

        let mut heartbeats = Vec::new();
        while let Some(row) = rows.next().await? {
            heartbeats.push(heartbeat_from_row(&row)?);
        }

        Ok(heartbeats)
    }
}

fn monitor_from_row(row: &libsql::Row) -> Result<Monitor> {
    let uuid_str: String = row.get(1)?;
    let accepted_json: String = row.get(11)?;
    let entries_json: Option<String> = row.get(13)?;
    let created_at: i64 = row.get(17)?;
    let updated_at: i64 = row.get(18)?;

    let entries = match entries_json {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };

    Ok(Monitor {
        id: Some(row.get(0)?),
        uuid: Uuid::parse_str(&uuid_str)?,
        name: row.get(2)?,
        url: row.get(3)?,
        check_type: row.get(4)?,
        interval_seconds: row.get::<i64>(5)? as u64,
        retry_interval_seconds: row.get::<i64>(6)? as u64,
        resend_interval_seconds: row.get::<i64>(7)? as u64,
        max_retries: row.get::<i64>(8)? as u32,
        timeout_seconds: row.get::<i64>(9)? as u64,
        enabled: row.get::<i64>(10)? != 0,
        accepted_status_ranges: serde_json::from_str(&accepted_json)?,
        ignore_tls: row.get::<i64>(12)? != 0,
        health_check: HealthCheckConfig {
            entries,
            entries_path: row.get(14)?,
            status_field: row.get(15)?,
            expected_value: row.get(16)?,
        },
        created_at: Monitor::ms_to_datetime(created_at),
        updated_at: Monitor::ms_to_datetime(updated_at),
    })
}

fn heartbeat_from_row(row: &libsql::Row) -> Result<Heartbeat> {
    let monitor_uuid_str: String = row.get(1)?;
    let status_str: String = row.get(4)?;
    let time: i64 = row.get(3)?;

    Ok(Heartbeat {
        id: Some(row.get(0)?),
        monitor_uuid: Uuid::parse_str(&monitor_uuid_str)?,
        entry_key: row.get(2)?,
        time: Monitor::ms_to_datetime(time),
        status: status_str.parse()?,
        message: row.get(5)?,
        ping_ms: row.get::<Option<i64>>(6)?.map(|v| v as u64),
        important: row.get::<i64>(7)? != 0,
    })
}
