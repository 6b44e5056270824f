use serde_json::Value;

use super::entries::{ExtractedEntry, MISSING_ENTRY_MESSAGE};
use super::types::{CheckStatus, EntryVerdict};
use crate::database::models::HealthCheckConfig;

/// Keys listed in a DOWN aggregate message before truncation
const MAX_LISTED_KEYS: usize = 10;

/// Evaluate one entry document against the configured status field.
///
/// Comparison is exact string equality against `expected_value`, with no
/// partial or case-insensitive matching. Non-string status values are
/// rendered as JSON so the verdict message shows what was actually observed.
pub fn evaluate_entry(entry: &ExtractedEntry<'_>, config: &HealthCheckConfig) -> EntryVerdict {
    let Some(document) = entry.document else {
        return EntryVerdict::down(&entry.key, MISSING_ENTRY_MESSAGE);
    };

    let Some(observed) = document.get(&config.status_field) else {
        return EntryVerdict::down(&entry.key, "status field missing");
    };

    let observed = match observed {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    if observed == config.expected_value {
        EntryVerdict::up(&entry.key, observed)
    } else {
        EntryVerdict::down(&entry.key, observed)
    }
}

pub fn evaluate_entries(
    entries: &[ExtractedEntry<'_>],
    config: &HealthCheckConfig,
) -> Vec<EntryVerdict> {
    entries.iter().map(|entry| evaluate_entry(entry, config)).collect()
}

/// Fold per-entry verdicts into the monitor-level verdict.
///
/// DOWN if any entry is DOWN, UP only when every evaluated entry is UP. Zero
/// evaluated entries is DOWN: an empty result must never read as healthy.
pub fn aggregate(entries: &[EntryVerdict]) -> (CheckStatus, String) {
    if entries.is_empty() {
        return (CheckStatus::Down, "no entries evaluated".to_string());
    }

    let down_keys: Vec<&str> = entries
        .iter()
        .filter(|verdict| verdict.status == CheckStatus::Down)
        .map(|verdict| verdict.entry_key.as_str())
        .collect();

    if down_keys.is_empty() {
        return (CheckStatus::Up, format!("all {} entries healthy", entries.len()));
    }

    let mut listed = down_keys[..down_keys.len().min(MAX_LISTED_KEYS)].join(", ");
    if down_keys.len() > MAX_LISTED_KEYS {
        listed.push_str(&format!(" and {} more", down_keys.len() - MAX_LISTED_KEYS));
    }

    (CheckStatus::Down, format!("down entries: {listed}"))
}
