use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Health verdict recorded for a monitor or one of its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
    Pending,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Up => write!(f, "up"),
            CheckStatus::Down => write!(f, "down"),
            CheckStatus::Pending => write!(f, "pending"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown check status: {0}")]
pub struct ParseStatusError(String);

impl std::str::FromStr for CheckStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(CheckStatus::Up),
            "down" => Ok(CheckStatus::Down),
            "pending" => Ok(CheckStatus::Pending),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Verdict for a single entry within one check cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryVerdict {
    pub entry_key: String,
    pub status: CheckStatus,
    pub message: String,
}

impl EntryVerdict {
    pub fn up(entry_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self { entry_key: entry_key.into(), status: CheckStatus::Up, message: message.into() }
    }

    pub fn down(entry_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self { entry_key: entry_key.into(), status: CheckStatus::Down, message: message.into() }
    }
}

/// Outcome of one full check cycle for a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// UUID of the monitor that was checked
    pub monitor_uuid: Uuid,

    /// Monitor-level verdict for the cycle
    pub status: CheckStatus,

    /// Diagnostic message: failing entry keys, or the cycle-level error
    pub message: String,

    /// Per-entry verdicts; empty when the cycle failed before entries
    /// could be determined
    pub entries: Vec<EntryVerdict>,

    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

/// Failures that abort an entire check cycle.
///
/// Per-entry problems (missing status field, unexpected value) never show up
/// here; they degrade only that entry's verdict.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unacceptable HTTP status {0}")]
    HttpStatus(u16),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("entries path not found: {0}")]
    EntriesPath(String),
}
