//! Tolerant field access over loosely-shaped JSON.
//!
//! Every getter takes an ordered list of candidate keys and returns the first
//! one that is present *and* usable as the requested type. Keys may be dotted
//! paths (`course.title`) to reach into nested objects.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

fn path<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|found| !found.is_null())
}

fn candidates<'a>(value: &'a Value, keys: &'a [&'a str]) -> impl Iterator<Item = &'a Value> + 'a {
    keys.iter().filter_map(move |key| path(value, key))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        // Epoch milliseconds.
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        _ => None,
    }
}

pub(crate) fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    candidates(value, keys).find_map(as_number)
}

/// Non-negative whole count; fractional or negative inputs are rejected.
pub(crate) fn count(value: &Value, keys: &[&str]) -> Option<u32> {
    candidates(value, keys).find_map(|found| {
        let n = as_number(found)?;
        if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n as u32)
    })
}

pub(crate) fn id(value: &Value, keys: &[&str]) -> Option<u64> {
    candidates(value, keys).find_map(|found| match found {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

pub(crate) fn boolean(value: &Value, keys: &[&str]) -> Option<bool> {
    candidates(value, keys).find_map(as_bool)
}

pub(crate) fn text(value: &Value, keys: &[&str]) -> Option<String> {
    candidates(value, keys).find_map(|found| {
        found
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

pub(crate) fn timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    candidates(value, keys).find_map(as_timestamp)
}

pub(crate) fn array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| path(value, key))
        .find_map(Value::as_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_usable_key_wins() {
        let raw = json!({ "progress": { "completed": true }, "progress_percentage": "42.5" });
        assert_eq!(number(&raw, &["progress", "progress_percentage"]), Some(42.5));
        assert_eq!(boolean(&raw, &["isCompleted", "progress.completed"]), Some(true));
    }

    #[test]
    fn null_and_garbage_fall_through() {
        let raw = json!({ "totalLessons": null, "total_lessons": "n/a", "lessonCount": 4 });
        assert_eq!(
            count(&raw, &["totalLessons", "total_lessons", "lessonCount"]),
            Some(4)
        );
        assert_eq!(count(&json!({ "n": -1 }), &["n"]), None);
        assert_eq!(count(&json!({ "n": 2.5 }), &["n"]), None);
    }

    #[test]
    fn ids_accept_numeric_strings() {
        assert_eq!(id(&json!({ "course": { "id": "17" } }), &["course.id"]), Some(17));
        assert_eq!(id(&json!({ "id": "abc" }), &["id"]), None);
    }

    #[test]
    fn timestamps_accept_rfc3339_sql_and_epoch_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(timestamp(&json!({ "t": "2024-03-01T12:00:00Z" }), &["t"]), Some(expected));
        assert_eq!(timestamp(&json!({ "t": "2024-03-01 12:00:00" }), &["t"]), Some(expected));
        assert_eq!(
            timestamp(&json!({ "t": expected.timestamp_millis() }), &["t"]),
            Some(expected)
        );
        assert_eq!(timestamp(&json!({ "t": "yesterday" }), &["t"]), None);
    }

    #[test]
    fn blank_text_is_missing() {
        let raw = json!({ "title": "  ", "course": { "title": "Rust 101" } });
        assert_eq!(text(&raw, &["title", "course.title"]).as_deref(), Some("Rust 101"));
    }
}
