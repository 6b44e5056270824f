use serde_json::Value;

/// Resolve a dot-separated field path inside a JSON document.
///
/// An empty path resolves to the document root. A segment that is absent, or
/// a traversal step through anything other than an object, yields `None`;
/// a merely-absent path is never an error.
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(document);
    }

    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
