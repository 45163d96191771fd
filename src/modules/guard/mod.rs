//! Write guard.
//!
//! Decides whether a mutating call may proceed given the current state. Rules
//! are checked in strict priority order and the first match wins.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::modules::state::GuardState;
use crate::outcome::{ErrorCode, OutcomeError};

pub const DEFAULT_MIN_WRITE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Minimum spacing between writes while safe mode is on.
    pub min_write_interval: Duration,
}

impl GuardPolicy {
    pub fn new(min_write_interval_secs: u64) -> Self {
        let secs = i64::try_from(min_write_interval_secs).unwrap_or(i64::MAX);
        Self {
            min_write_interval: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        }
    }
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WRITE_INTERVAL_SECS)
    }
}

/// Reason a mutating call was refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardBlock {
    AccountSuspended {
        reason: Option<String>,
        until: Option<DateTime<Utc>>,
    },
    PendingVerification {
        source_tool: String,
        verification_code: Option<String>,
        challenge: Option<String>,
        prompt: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    },
    WriteCooldown {
        until: DateTime<Utc>,
        retry_after_secs: u64,
    },
    SafeModeInterval {
        last_write_at: DateTime<Utc>,
        retry_after_secs: u64,
    },
}

impl GuardBlock {
    pub fn code(&self) -> ErrorCode {
        match self {
            GuardBlock::AccountSuspended { .. } => ErrorCode::AccountSuspended,
            GuardBlock::PendingVerification { .. } => ErrorCode::BlockedByPendingVerification,
            GuardBlock::WriteCooldown { .. } => ErrorCode::WriteCooldownActive,
            GuardBlock::SafeModeInterval { .. } => ErrorCode::SafeModeWriteInterval,
        }
    }

    pub fn message(&self) -> String {
        match self {
            GuardBlock::AccountSuspended { reason, until } => {
                let reason = reason.as_deref().unwrap_or("Account suspended");
                match until {
                    Some(until) => format!("{reason} (until {})", until.to_rfc3339()),
                    None => reason.to_string(),
                }
            }
            GuardBlock::PendingVerification { source_tool, .. } => format!(
                "verification challenge from {source_tool} must be answered before writing"
            ),
            GuardBlock::WriteCooldown {
                retry_after_secs, ..
            } => format!("write cooldown active for another {retry_after_secs}s"),
            GuardBlock::SafeModeInterval {
                retry_after_secs, ..
            } => format!("safe mode requires waiting another {retry_after_secs}s between writes"),
        }
    }

    pub fn details(&self) -> Value {
        match self {
            GuardBlock::AccountSuspended { reason, until } => json!({
                "reason": reason,
                "until": until,
            }),
            GuardBlock::PendingVerification {
                source_tool,
                verification_code,
                challenge,
                prompt,
                expires_at,
            } => json!({
                "source_tool": source_tool,
                "verification_code": verification_code,
                "challenge": challenge,
                "prompt": prompt,
                "expires_at": expires_at,
            }),
            GuardBlock::WriteCooldown {
                until,
                retry_after_secs,
            } => json!({
                "until": until,
                "retry_after_seconds": retry_after_secs,
            }),
            GuardBlock::SafeModeInterval {
                last_write_at,
                retry_after_secs,
            } => json!({
                "last_write_at": last_write_at,
                "retry_after_seconds": retry_after_secs,
            }),
        }
    }

    pub fn to_error(&self) -> OutcomeError {
        OutcomeError::new(self.code(), self.message()).with_details(self.details())
    }
}

/// Whole seconds from `now` until `until`, rounded up.
fn remaining_secs(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(0);
    u64::try_from(millis).unwrap_or(0).div_ceil(1000)
}

/// Block decision for a hypothetical mutating call at `now`.
pub fn evaluate(state: &GuardState, now: DateTime<Utc>, policy: &GuardPolicy) -> Option<GuardBlock> {
    if state.suspension.active {
        return Some(GuardBlock::AccountSuspended {
            reason: state.suspension.reason.clone(),
            until: state.suspension.until,
        });
    }

    if let Some(pending) = state.pending_verification.as_ref() {
        return Some(GuardBlock::PendingVerification {
            source_tool: pending.source_tool.clone(),
            verification_code: pending.verification_code.clone(),
            challenge: pending.challenge.clone(),
            prompt: pending.prompt.clone(),
            expires_at: pending.expires_at,
        });
    }

    if let Some(until) = state.cooldowns.write_until
        && until > now
    {
        return Some(GuardBlock::WriteCooldown {
            until,
            retry_after_secs: remaining_secs(now, until),
        });
    }

    if state.safe_mode
        && let Some(last_write_at) = state.last_write_at
    {
        let next_allowed = last_write_at
            .checked_add_signed(policy.min_write_interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now < next_allowed {
            return Some(GuardBlock::SafeModeInterval {
                last_write_at,
                retry_after_secs: remaining_secs(now, next_allowed),
            });
        }
    }

    None
}
