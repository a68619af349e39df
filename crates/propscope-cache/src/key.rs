//! Canonical cache keys.
//!
//! Two requests that differ only in query-parameter order must share a
//! key, so pairs are sorted before joining.

/// Build `METHOD:path?k=v&…` with query pairs sorted by key, then value.
pub fn canonical_key(method: &str, path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return format!("{method}:{path}");
    }
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{method}:{path}?{joined}")
}
