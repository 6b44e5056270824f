use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::monitoring::types::CheckStatus;

/// Check type discriminator for multi-entry JSON health checks
pub const CHECK_TYPE_JSON_ENTRIES: &str = "json-entries";

/// Monitor model - one configured health-check target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub url: String,
    pub check_type: String,
    pub interval_seconds: u64,
    pub retry_interval_seconds: u64,
    pub resend_interval_seconds: u64,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub enabled: bool,
    /// Acceptable HTTP status codes, as range strings ("200-299") or single
    /// codes ("200")
    pub accepted_status_ranges: Vec<String>,
    /// Skip TLS certificate verification for the fetch
    pub ignore_tls: bool,
    pub health_check: HealthCheckConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    /// Create a new multi-entry JSON monitor with default cadence
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            check_type: CHECK_TYPE_JSON_ENTRIES.to_string(),
            interval_seconds: 60,
            retry_interval_seconds: 60,
            resend_interval_seconds: 0,
            max_retries: 0,
            timeout_seconds: 10,
            enabled: true,
            accepted_status_ranges: vec!["200-299".to_string()],
            ignore_tls: false,
            health_check: HealthCheckConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert a DateTime to the unix-millisecond column representation
    pub fn datetime_to_ms(time: DateTime<Utc>) -> i64 {
        time.timestamp_millis()
    }

    /// Convert a unix-millisecond column value back to a DateTime
    pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

/// Embedded health-check configuration for a multi-entry JSON monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Entry keys to restrict evaluation to; empty means evaluate every
    /// entry found in the response
    pub entries: Vec<String>,
    /// Dotted path to the entries container in the response body
    pub entries_path: String,
    /// Field looked up inside each entry document
    pub status_field: String,
    /// Value the status field must equal for the entry to count as healthy
    pub expected_value: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            entries_path: "entries".to_string(),
            status_field: "status".to_string(),
            expected_value: "Healthy".to_string(),
        }
    }
}

/// Heartbeat model - one immutable observation.
///
/// `entry_key = None` is the monitor-level roll-up row; rows are append-only
/// and `time` is strictly increasing per `(monitor_uuid, entry_key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub id: Option<i64>,
    pub monitor_uuid: Uuid,
    pub entry_key: Option<String>,
    pub time: DateTime<Utc>,
    pub status: CheckStatus,
    pub message: String,
    pub ping_ms: Option<u64>,
    /// Marks a status transition relative to the previous heartbeat for the
    /// same key
    pub important: bool,
}
