//! Suspension and ban detection.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::challenges::core::{NormalizedResponse, collect_strings, first_string, first_timestamp};

use super::SUSPENSION_RE;

const DEFAULT_REASON: &str = "Account suspended";

const REASON_FIELDS: &[&str] = &["reason", "error", "message", "error.message", "error.reason"];

const UNTIL_FIELDS: &[&str] = &[
    "suspended_until",
    "suspension_until",
    "banned_until",
    "ban_until",
    "until",
    "suspension.until",
    "suspension.expires_at",
    "ban.until",
    "ban.expires_at",
];

/// Suspension reported by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspensionSignal {
    pub reason: String,
    pub until: Option<DateTime<Utc>>,
}

/// True when the `status` field or any string reachable in the body carries
/// suspension/ban vocabulary.
pub fn mentions_suspension(body: &Map<String, Value>) -> bool {
    if body
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| SUSPENSION_RE.is_match(status))
    {
        return true;
    }

    collect_strings(body)
        .into_iter()
        .any(|text| SUSPENSION_RE.is_match(text))
}

/// Detect a suspension or ban in the response.
pub fn extract_suspension(response: &NormalizedResponse) -> Option<SuspensionSignal> {
    let body = &response.body;
    if !mentions_suspension(body) {
        return None;
    }

    let reason = first_string(body, REASON_FIELDS)
        .unwrap_or(DEFAULT_REASON)
        .to_string();

    Some(SuspensionSignal {
        reason,
        until: first_timestamp(body, UNTIL_FIELDS),
    })
}
