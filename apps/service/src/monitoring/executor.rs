use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;

use super::document::resolve_path;
use super::entries::extract_entries;
use super::evaluator::{aggregate, evaluate_entries};
use super::types::{CheckError, CheckReport, CheckStatus, EntryVerdict};
use crate::database::models::Monitor;

/// Check executor - runs one full check cycle for a monitor.
///
/// The fetch and JSON decode are the only suspending steps; everything after
/// the body is in memory is a pure transformation.
pub struct CheckExecutor {
    client: reqwest::Client,
    insecure_client: reqwest::Client,
}

impl CheckExecutor {
    pub fn new(default_timeout_seconds: u64) -> Result<Self> {
        let timeout = Duration::from_secs(default_timeout_seconds);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let insecure_client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { client, insecure_client })
    }

    /// Execute one check cycle. Cycle-level failures (network, unacceptable
    /// status, malformed body, absent entries path) become a DOWN report with
    /// no per-entry verdicts.
    pub async fn execute_check(&self, monitor: &Monitor) -> CheckReport {
        let started = Instant::now();

        let (status, message, entries) = match self.run_cycle(monitor).await {
            Ok(outcome) => outcome,
            Err(error) => (CheckStatus::Down, error.to_string(), Vec::new()),
        };

        CheckReport {
            monitor_uuid: monitor.uuid,
            status,
            message,
            entries,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn run_cycle(
        &self,
        monitor: &Monitor,
    ) -> Result<(CheckStatus, String, Vec<EntryVerdict>), CheckError> {
        let client = if monitor.ignore_tls { &self.insecure_client } else { &self.client };

        let response = client
            .get(&monitor.url)
            .timeout(Duration::from_secs(monitor.timeout_seconds))
            .send()
            .await?;

        let status_code = response.status().as_u16();
        if !status_accepted(status_code, &monitor.accepted_status_ranges) {
            return Err(CheckError::HttpStatus(status_code));
        }

        let body = response.text().await?;
        let document: Value = serde_json::from_str(&body)?;

        let path = &monitor.health_check.entries_path;
        let container =
            resolve_path(&document, path).ok_or_else(|| CheckError::EntriesPath(path.clone()))?;
        let extracted = extract_entries(container, &monitor.health_check.entries)
            .ok_or_else(|| CheckError::EntriesPath(path.clone()))?;

        let verdicts = evaluate_entries(&extracted, &monitor.health_check);
        let (status, message) = aggregate(&verdicts);

        Ok((status, message, verdicts))
    }
}

/// Screen a response status code against the monitor's accepted ranges.
///
/// Ranges are strings like "200-299" or single codes like "301"; malformed
/// range strings are skipped.
pub fn status_accepted(code: u16, ranges: &[String]) -> bool {
    ranges.iter().any(|range| match range.split_once('-') {
        Some((low, high)) => match (low.trim().parse::<u16>(), high.trim().parse::<u16>()) {
            (Ok(low), Ok(high)) => (low..=high).contains(&code),
            _ => false,
        },
        None => range.trim().parse::<u16>().map(|single| single == code).unwrap_or(false),
    })
}
