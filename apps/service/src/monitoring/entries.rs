use serde_json::Value;

/// Message recorded for an allow-listed entry absent from the response
pub const MISSING_ENTRY_MESSAGE: &str = "entry not present in response";

/// One entry located in the response body.
///
/// `document` is `None` when the key was configured in the allow-list but the
/// response did not contain it; the evaluator turns that into a DOWN verdict
/// so configured entries are never silently skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntry<'a> {
    pub key: String,
    pub document: Option<&'a Value>,
}

/// Normalize the entries container into an ordered `(key, document)` list.
///
/// The container may be an array of entry documents (keyed by their `name` or
/// `key` field, falling back to `entry-<index>`) or a map from entry key to
/// entry document. A non-empty allow-list restricts the output to those keys,
/// in allow-list order; otherwise source order is kept. Returns `None` when
/// the container is not an array or object, which callers treat the same as
/// an absent entries path.
pub fn extract_entries<'a>(
    container: &'a Value,
    allow_list: &[String],
) -> Option<Vec<ExtractedEntry<'a>>> {
    let found: Vec<(String, &Value)> = match container {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (entry_key_for(item, index), item))
            .collect(),
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value)).collect(),
        _ => return None,
    };

    if allow_list.is_empty() {
        return Some(
            found
                .into_iter()
                .map(|(key, document)| ExtractedEntry { key, document: Some(document) })
                .collect(),
        );
    }

    Some(
        allow_list
            .iter()
            .map(|key| ExtractedEntry {
                key: key.clone(),
                document: found.iter().find(|(found_key, _)| found_key == key).map(|(_, doc)| *doc),
            })
            .collect(),
    )
}

/// Identity key for an array-form entry document: `name`, then `key`,
/// then a positional fallback.
fn entry_key_for(item: &Value, index: usize) -> String {
    for field in ["name", "key"] {
        if let Some(key) = item.get(field).and_then(Value::as_str) {
            return key.to_string();
        }
    }
    format!("entry-{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_container_keys_by_name_field() {
        let container = json!([
            {"name": "a", "status": "Healthy"},
            {"name": "b", "status": "Down"}
        ]);
        let entries = extract_entries(&container, &[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[1].key, "b");
        assert!(entries.iter().all(|e| e.document.is_some()));
    }

    #[test]
    fn array_container_falls_back_to_key_field_then_index() {
        let container = json!([
            {"key": "svc", "status": "Healthy"},
            {"status": "Healthy"}
        ]);
        let entries = extract_entries(&container, &[]).unwrap();
        assert_eq!(entries[0].key, "svc");
        assert_eq!(entries[1].key, "entry-1");
    }

    #[test]
    fn object_container_keys_by_map_key_in_source_order() {
        let container = json!({
            "gateway": {"status": "Healthy"},
            "billing": {"status": "Down"}
        });
        let entries = extract_entries(&container, &[]).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["gateway", "billing"]);
    }

    #[test]
    fn allow_list_filters_and_orders_output() {
        let container = json!([
            {"name": "a", "status": "Healthy"},
            {"name": "b", "status": "Down"},
            {"name": "c", "status": "Healthy"}
        ]);
        let allow = vec!["c".to_string(), "a".to_string()];
        let entries = extract_entries(&container, &allow).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["c", "a"]);
    }

    #[test]
    fn allow_listed_key_absent_from_response_is_synthesized() {
        let container = json!([{"name": "a", "status": "Healthy"}]);
        let allow = vec!["a".to_string(), "c".to_string()];
        let entries = extract_entries(&container, &allow).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].document.is_some());
        assert_eq!(entries[1].key, "c");
        assert!(entries[1].document.is_none());
    }

    #[test]
    fn non_container_value_is_rejected() {
        assert!(extract_entries(&json!("entries"), &[]).is_none());
        assert!(extract_entries(&json!(42), &[]).is_none());
        assert!(extract_entries(&json!(null), &[]).is_none());
    }
}
