use serde_json::Value;

/// Resolve the first non-empty string found at any of the given JSON pointer
/// paths, in order.
///
/// Provider payloads rename fields between versions (webhook vs. API feed),
/// so every logical field reads through one ordered fallback chain instead of
/// scattered `a || b || c` lookups.
pub fn first_str<'a>(record: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers.iter().find_map(|pointer| {
        record
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })
}
