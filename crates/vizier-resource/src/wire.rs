//! Tolerant readers for wire JSON
//!
//! Hydration must never fail on a missing or oddly typed field, so every
//! descriptor reads its fields through these helpers instead of indexing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Read a string field
#[inline]
#[must_use]
pub fn str_field(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Read an identifier that the server may send as a string or a number
#[must_use]
pub fn id_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a boolean field, `false` when absent
#[inline]
#[must_use]
pub fn bool_field(json: &Value, key: &str) -> bool {
    json.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Read a signed integer field (numbers or numeric strings)
#[must_use]
pub fn i64_field(json: &Value, key: &str) -> Option<i64> {
    match json.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an unsigned integer field, `0` when absent
#[must_use]
pub fn u64_field(json: &Value, key: &str) -> u64 {
    json.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Read an array field, empty when absent or not an array
#[inline]
#[must_use]
pub fn array_field<'a>(json: &'a Value, key: &str) -> &'a [Value] {
    json.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Offset-less ISO 8601, as written by servers that keep naive UTC times
const NAIVE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Read a timestamp, `None` when absent or unparseable
///
/// Accepts RFC 3339 and offset-less ISO 8601, the latter read as UTC.
#[must_use]
pub fn timestamp_field(json: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = json.get(key).and_then(Value::as_str)?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP).map(|dt| dt.and_utc()))
        .ok()
}

/// Look up a named entry in a `[{key, value}]` property list
///
/// Projects and branches carry their display name this way on some server
/// versions.
#[must_use]
pub fn property(json: &Value, name: &str) -> Option<String> {
    array_field(json, "properties")
        .iter()
        .find(|p| p.get("key").and_then(Value::as_str) == Some(name))
        .and_then(|p| p.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_field_accepts_numbers() {
        let json = json!({"id": 42, "other": "x"});
        assert_eq!(id_field(&json, "id").as_deref(), Some("42"));
        assert_eq!(id_field(&json, "other").as_deref(), Some("x"));
        assert_eq!(id_field(&json, "missing"), None);
    }

    #[test]
    fn i64_field_parses_strings() {
        let json = json!({"a": "17", "b": 3, "c": "x"});
        assert_eq!(i64_field(&json, "a"), Some(17));
        assert_eq!(i64_field(&json, "b"), Some(3));
        assert_eq!(i64_field(&json, "c"), None);
    }

    #[test]
    fn timestamp_field_tolerates_garbage() {
        let json = json!({"ok": "2024-03-01T10:00:00Z", "bad": "yesterday"});
        assert!(timestamp_field(&json, "ok").is_some());
        assert!(timestamp_field(&json, "bad").is_none());
    }

    #[test]
    fn timestamp_field_reads_naive_times_as_utc() {
        let json = json!({
            "micros": "2019-02-18T10:21:18.868041",
            "seconds": "2019-02-18T10:21:18",
            "date": "2019-02-18"
        });
        let micros = timestamp_field(&json, "micros").unwrap();
        assert_eq!(micros.to_rfc3339(), "2019-02-18T10:21:18.868041+00:00");
        assert_eq!(
            timestamp_field(&json, "seconds").map(|t| t.to_rfc3339()).as_deref(),
            Some("2019-02-18T10:21:18+00:00")
        );
        assert!(timestamp_field(&json, "date").is_none());
    }

    #[test]
    fn property_lookup() {
        let json = json!({"properties": [{"key": "name", "value": "Main"}]});
        assert_eq!(property(&json, "name").as_deref(), Some("Main"));
        assert_eq!(property(&json, "owner"), None);
    }
}
