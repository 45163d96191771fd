//! Persisted guard state.
//!
//! A single [`GuardState`] record captures everything the write guard knows
//! about the account: safe mode, an outstanding verification challenge, the
//! last observed suspension, server-imposed cooldowns, and the time of the last
//! successful write. The record is loaded, swept, mutated and saved once per
//! call.

mod store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::challenges::core::analysis::parse_timestamp;

pub use store::{JsonFileStateStore, MemoryStateStore, RedbStateStore, StateError, StateStore};

/// Maximum age of a pending verification that carries no `expires_at`.
pub const MAX_PENDING_AGE_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub active: bool,
    pub reason: Option<String>,
    pub until: Option<DateTime<Utc>>,
    pub seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldowns {
    pub post_until: Option<DateTime<Utc>>,
    pub comment_until: Option<DateTime<Utc>>,
    pub write_until: Option<DateTime<Utc>>,
}

impl Cooldowns {
    fn slots_mut(&mut self) -> [&mut Option<DateTime<Utc>>; 3] {
        [
            &mut self.post_until,
            &mut self.comment_until,
            &mut self.write_until,
        ]
    }
}

/// Unresolved verification challenge that blocks writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingVerification {
    #[serde(default)]
    pub source_tool: String,
    /// Records persisted without a detection time are treated as already
    /// past the age limit.
    #[serde(default = "undated_detection")]
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub auto_attempted: bool,
    #[serde(default)]
    pub failed_answers: Vec<String>,
}

fn undated_detection() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl PendingVerification {
    pub fn new(source_tool: impl Into<String>, detected_at: DateTime<Utc>) -> Self {
        Self {
            source_tool: source_tool.into(),
            detected_at,
            verification_code: None,
            challenge: None,
            prompt: None,
            expires_at: None,
            attempt_count: 0,
            auto_attempted: false,
            failed_answers: Vec::new(),
        }
    }

    fn has_text(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|text| !text.trim().is_empty())
    }

    /// A zombie carries neither a code nor any challenge/prompt text and can
    /// never be resolved.
    pub fn is_zombie(&self) -> bool {
        !Self::has_text(&self.verification_code)
            && !Self::has_text(&self.challenge)
            && !Self::has_text(&self.prompt)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => now - self.detected_at > max_age,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardState {
    pub safe_mode: bool,
    pub pending_verification: Option<PendingVerification>,
    pub suspension: Suspension,
    pub cooldowns: Cooldowns,
    pub offense_count: u32,
    pub last_write_at: Option<DateTime<Utc>>,
}

impl Default for GuardState {
    fn default() -> Self {
        Self {
            safe_mode: true,
            pending_verification: None,
            suspension: Suspension::default(),
            cooldowns: Cooldowns::default(),
            offense_count: 0,
            last_write_at: None,
        }
    }
}

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub cleared_verification: bool,
    pub cleared_cooldowns: usize,
}

impl SweepReport {
    pub fn changed(&self) -> bool {
        self.cleared_verification || self.cleared_cooldowns > 0
    }
}

impl GuardState {
    /// Merge a persisted JSON value over the defaults.
    ///
    /// Every field is read on its own, so a missing or malformed field falls
    /// back to its default without discarding the rest of the record.
    /// `suspension` and `cooldowns` are merged per sub-field.
    pub fn from_value(value: &Value) -> Self {
        let mut state = Self::default();
        let Some(map) = value.as_object() else {
            return state;
        };

        if let Some(safe_mode) = map.get("safe_mode").and_then(Value::as_bool) {
            state.safe_mode = safe_mode;
        }

        state.pending_verification = map
            .get("pending_verification")
            .filter(|value| value.is_object())
            .and_then(|value| serde_json::from_value(value.clone()).ok());

        if let Some(suspension) = map.get("suspension").and_then(Value::as_object) {
            let defaults = Suspension::default();
            state.suspension = Suspension {
                active: suspension
                    .get("active")
                    .and_then(Value::as_bool)
                    .unwrap_or(defaults.active),
                reason: suspension
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                until: timestamp_field(suspension, "until"),
                seen_at: timestamp_field(suspension, "seen_at"),
            };
        }

        if let Some(cooldowns) = map.get("cooldowns").and_then(Value::as_object) {
            state.cooldowns = Cooldowns {
                post_until: timestamp_field(cooldowns, "post_until"),
                comment_until: timestamp_field(cooldowns, "comment_until"),
                write_until: timestamp_field(cooldowns, "write_until"),
            };
        }

        if let Some(count) = map.get("offense_count").and_then(Value::as_u64) {
            state.offense_count = u32::try_from(count).unwrap_or(u32::MAX);
        }

        state.last_write_at = timestamp_field(map, "last_write_at");
        state
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Clear expired verification and cooldown fields. Idempotent.
    ///
    /// The pending verification is dropped when its `expires_at` has passed,
    /// when it has no `expires_at` and is older than `max_pending_age`, or when
    /// it is a zombie. Cooldowns not strictly in the future are cleared.
    pub fn sweep(&mut self, now: DateTime<Utc>, max_pending_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();

        if self
            .pending_verification
            .as_ref()
            .is_some_and(|pending| pending.is_zombie() || pending.is_expired(now, max_pending_age))
        {
            self.pending_verification = None;
            report.cleared_verification = true;
        }

        for slot in self.cooldowns.slots_mut() {
            if slot.is_some_and(|until| until <= now) {
                *slot = None;
                report.cleared_cooldowns += 1;
            }
        }

        report
    }
}

fn timestamp_field(map: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    map.get(key).and_then(parse_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn max_age() -> Duration {
        Duration::seconds(MAX_PENDING_AGE_SECS)
    }

    fn pending(code: Option<&str>, challenge: Option<&str>) -> PendingVerification {
        let mut pending = PendingVerification::new("create_post", now() - Duration::minutes(1));
        pending.verification_code = code.map(String::from);
        pending.challenge = challenge.map(String::from);
        pending
    }

    #[test]
    fn partial_records_merge_over_defaults() {
        let state = GuardState::from_value(&json!({
            "suspension": { "active": true },
            "cooldowns": { "post_until": "2026-10-14T12:10:00Z" },
            "unknown_field": 12
        }));

        assert!(state.safe_mode);
        assert!(state.suspension.active);
        assert_eq!(state.suspension.reason, None);
        assert_eq!(
            state.cooldowns.post_until,
            Some(Utc.with_ymd_and_hms(2026, 10, 14, 12, 10, 0).unwrap())
        );
        assert_eq!(state.cooldowns.write_until, None);
        assert_eq!(state.offense_count, 0);
    }

    #[test]
    fn malformed_fields_fall_back_individually() {
        let state = GuardState::from_value(&json!({
            "safe_mode": "nope",
            "offense_count": 3,
            "suspension": "broken",
            "pending_verification": 17,
            "last_write_at": "2026-10-14T11:59:00Z"
        }));

        assert!(state.safe_mode);
        assert_eq!(state.offense_count, 3);
        assert_eq!(state.suspension, Suspension::default());
        assert_eq!(state.pending_verification, None);
        assert!(state.last_write_at.is_some());

        assert_eq!(GuardState::from_value(&json!([1, 2, 3])), GuardState::default());
    }

    #[test]
    fn round_trips_through_json() {
        let mut state = GuardState::default();
        state.pending_verification = Some(pending(Some("vc"), Some("2 + 2")));
        state.cooldowns.write_until = Some(now());
        assert_eq!(GuardState::from_value(&state.to_value()), state);
    }

    #[test]
    fn sweep_clears_expired_verification() {
        let mut state = GuardState::default();
        let mut record = pending(Some("vc"), None);
        record.expires_at = Some(now() - Duration::seconds(1));
        state.pending_verification = Some(record);

        let report = state.sweep(now(), max_age());
        assert!(report.cleared_verification);
        assert!(state.pending_verification.is_none());
    }

    #[test]
    fn sweep_respects_max_age_without_expiry() {
        let mut fresh = GuardState::default();
        fresh.pending_verification = Some(pending(Some("vc"), None));
        fresh.sweep(now(), max_age());
        assert!(fresh.pending_verification.is_some());

        let mut stale = GuardState::default();
        let mut record = pending(Some("vc"), None);
        record.detected_at = now() - Duration::minutes(31);
        stale.pending_verification = Some(record);
        stale.sweep(now(), max_age());
        assert!(stale.pending_verification.is_none());
    }

    #[test]
    fn undated_pending_record_ages_out() {
        let mut state = GuardState::from_value(&json!({
            "pending_verification": { "source_tool": "create_post", "verification_code": "vc" }
        }));
        assert!(state.pending_verification.is_some());

        let report = state.sweep(now(), max_age());
        assert!(report.cleared_verification);
        assert!(state.pending_verification.is_none());

        let mut dated = GuardState::from_value(&json!({
            "pending_verification": {
                "verification_code": "vc",
                "expires_at": "2026-10-14T12:05:00Z"
            }
        }));
        dated.sweep(now(), max_age());
        assert!(dated.pending_verification.is_some());
    }

    #[test]
    fn future_expiry_outlives_max_age() {
        let mut state = GuardState::default();
        let mut record = pending(Some("vc"), None);
        record.detected_at = now() - Duration::hours(2);
        record.expires_at = Some(now() + Duration::minutes(5));
        state.pending_verification = Some(record);

        state.sweep(now(), max_age());
        assert!(state.pending_verification.is_some());
    }

    #[test]
    fn sweep_clears_zombies_regardless_of_age() {
        let mut state = GuardState::default();
        let mut record = pending(None, Some("   "));
        record.expires_at = Some(now() + Duration::hours(1));
        state.pending_verification = Some(record);

        state.sweep(now(), max_age());
        assert!(state.pending_verification.is_none());
    }

    #[test]
    fn sweep_clears_cooldowns_not_in_future() {
        let mut state = GuardState::default();
        state.cooldowns.write_until = Some(now());
        state.cooldowns.post_until = Some(now() - Duration::seconds(5));
        state.cooldowns.comment_until = Some(now() + Duration::seconds(5));

        let report = state.sweep(now(), max_age());
        assert_eq!(report.cleared_cooldowns, 2);
        assert_eq!(state.cooldowns.write_until, None);
        assert_eq!(state.cooldowns.post_until, None);
        assert!(state.cooldowns.comment_until.is_some());
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut state = GuardState::default();
        let mut record = pending(Some("vc"), None);
        record.detected_at = now() - Duration::hours(1);
        state.pending_verification = Some(record);
        state.cooldowns.write_until = Some(now() - Duration::seconds(1));
        state.cooldowns.comment_until = Some(now() + Duration::seconds(30));

        let mut once = state.clone();
        once.sweep(now(), max_age());
        let mut twice = once.clone();
        let second = twice.sweep(now(), max_age());

        assert_eq!(once, twice);
        assert!(!second.changed());
    }
}
