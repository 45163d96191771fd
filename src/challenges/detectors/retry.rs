//! Retry-after extraction from bodies and headers.

use chrono::{DateTime, Utc};
use http::header::RETRY_AFTER;

use crate::challenges::core::{NormalizedResponse, first_number};

const SECONDS_FIELDS: &[&str] = &[
    "retry_after_seconds",
    "retry_after_secs",
    "retryAfterSeconds",
    "error.retry_after_seconds",
    "data.retry_after_seconds",
];

const MINUTES_FIELDS: &[&str] = &[
    "retry_after_minutes",
    "retryAfterMinutes",
    "error.retry_after_minutes",
    "data.retry_after_minutes",
];

const GENERIC_FIELDS: &[&str] = &[
    "retry_after",
    "retryAfter",
    "error.retry_after",
    "data.retry_after",
];

/// Seconds the remote service asked us to wait, or `0` when it gave no hint.
///
/// Body fields win over the `retry-after` header. The header accepts both the
/// delta-seconds and HTTP-date forms; dates are converted into the remaining
/// seconds from `now`.
pub fn extract_retry_seconds(response: &NormalizedResponse, now: DateTime<Utc>) -> u64 {
    let body = &response.body;

    let from_body = first_number(body, SECONDS_FIELDS)
        .or_else(|| first_number(body, MINUTES_FIELDS).map(|minutes| minutes * 60.0))
        .or_else(|| first_number(body, GENERIC_FIELDS));

    if let Some(seconds) = from_body {
        return clamp_seconds(seconds);
    }

    response
        .header(RETRY_AFTER.as_str())
        .and_then(|raw| retry_after_header(raw, now))
        .map(clamp_seconds)
        .unwrap_or(0)
}

fn retry_after_header(raw: &str, now: DateTime<Utc>) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<f64>()
        && seconds.is_finite()
    {
        return Some(seconds);
    }

    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|date| (date.with_timezone(&Utc) - now).num_milliseconds() as f64 / 1000.0)
}

fn clamp_seconds(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    seconds.floor() as u64
}
