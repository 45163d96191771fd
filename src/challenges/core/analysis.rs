//! JSON tree helpers used by the signal extractors.
//!
//! Remote payloads are untyped and inconsistently shaped, so every heuristic is
//! expressed as an explicit walk over the `serde_json` tree. String collection
//! is depth-bounded by [`MAX_SCAN_DEPTH`] so adversarial or deeply nested bodies
//! stay cheap to inspect.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Maximum nesting depth visited when collecting strings from a body.
pub const MAX_SCAN_DEPTH: usize = 5;

/// Epoch values above this are interpreted as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Collect every string value reachable from `body`, visiting at most
/// [`MAX_SCAN_DEPTH`] levels of nesting below the top-level object.
pub fn collect_strings(body: &Map<String, Value>) -> Vec<&str> {
    let mut out = Vec::new();
    for value in body.values() {
        collect_into(value, 1, &mut out);
    }
    out
}

fn collect_into<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a str>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    match value {
        Value::String(text) => out.push(text.as_str()),
        Value::Array(items) => {
            for item in items {
                collect_into(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_into(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Resolve a dotted path (`"verification.code"`) against an object.
pub fn lookup<'a>(body: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = body.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// First non-empty string found at any of the given paths.
pub fn first_string<'a>(body: &'a Map<String, Value>, paths: &[&str]) -> Option<&'a str> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
}

/// First scalar found at the given paths rendered as text. Numeric codes are
/// stringified so `{"verification_code": 1234}` and `"1234"` behave alike.
pub fn first_text(body: &Map<String, Value>, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

/// First numeric value at the given paths; numeric strings are accepted.
pub fn first_number(body: &Map<String, Value>, paths: &[&str]) -> Option<f64> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .find_map(as_number)
}

/// First value at the given paths that parses as a timestamp.
pub fn first_timestamp(body: &Map<String, Value>, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths
        .iter()
        .filter_map(|path| lookup(body, path))
        .find_map(parse_timestamp)
}

pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Parse RFC 3339 strings, naive `YYYY-MM-DD HH:MM:SS` strings (as UTC), or
/// epoch seconds/milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                return Some(naive.and_utc());
            }
            text.parse::<f64>().ok().and_then(from_epoch)
        }
        Value::Number(number) => number.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let millis = if raw > EPOCH_MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn collects_nested_strings_within_depth() {
        let body = object(json!({
            "a": "top",
            "b": { "c": ["inner", { "d": "deeper" }] },
            "n": 4
        }));
        let strings = collect_strings(&body);
        assert!(strings.contains(&"top"));
        assert!(strings.contains(&"inner"));
        assert!(strings.contains(&"deeper"));
    }

    #[test]
    fn stops_at_depth_bound() {
        let body = object(json!({
            "l1": { "l2": { "l3": { "l4": { "l5": "reachable", "l5b": { "l6": "hidden" } } } } }
        }));
        let strings = collect_strings(&body);
        assert_eq!(strings, vec!["reachable"]);
    }

    #[test]
    fn dotted_lookup_and_numeric_strings() {
        let body = object(json!({
            "verification": { "code": 4821 },
            "retry": "42"
        }));
        assert_eq!(first_text(&body, &["verification.code"]), Some("4821".into()));
        assert_eq!(first_number(&body, &["missing", "retry"]), Some(42.0));
        assert!(lookup(&body, "verification.code.extra").is_none());
    }

    #[test]
    fn parses_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&json!("2026-01-02T03:04:05Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2026-01-02 03:04:05")), Some(expected));
        assert_eq!(parse_timestamp(&json!(expected.timestamp())), Some(expected));
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("soon")), None);
    }
}
