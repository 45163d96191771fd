//! Verification challenge detection.
//!
//! Two gates keep this heuristic from blocking healthy traffic:
//!
//! 1. The body must carry verification vocabulary or an explicit code field.
//! 2. Responses with `status < 400` only count when an explicit code is present.
//!
//! A final check rejects signals with neither a code nor any challenge/prompt
//! text, since such a record could never be resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::challenges::core::{NormalizedResponse, first_string, first_text, first_timestamp};

use super::VERIFICATION_RE;

const CODE_FIELDS: &[&str] = &[
    "verification_code",
    "verificationCode",
    "verification.code",
    "verification.verification_code",
    "challenge.code",
    "challenge.verification_code",
    "data.verification_code",
    "error.verification_code",
];

const CHALLENGE_FIELDS: &[&str] = &[
    "challenge",
    "challenge.text",
    "challenge.question",
    "verification.challenge",
    "math_challenge",
];

const PROMPT_FIELDS: &[&str] = &[
    "prompt",
    "verification.prompt",
    "challenge.prompt",
    "instructions",
];

const EXPIRY_FIELDS: &[&str] = &[
    "expires_at",
    "expiresAt",
    "verification.expires_at",
    "challenge.expires_at",
];

/// Challenge issued by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSignal {
    pub verification_code: Option<String>,
    pub challenge: Option<String>,
    pub prompt: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Case-insensitive vocabulary check over the serialized body (keys included).
pub fn mentions_verification(body: &Map<String, Value>) -> bool {
    serde_json::to_string(body)
        .map(|text| VERIFICATION_RE.is_match(&text))
        .unwrap_or(false)
}

pub fn extract_verification(response: &NormalizedResponse) -> Option<VerificationSignal> {
    let body = &response.body;
    let verification_code = first_text(body, CODE_FIELDS);

    if verification_code.is_none() && !mentions_verification(body) {
        return None;
    }

    if response.status < 400 && verification_code.is_none() {
        return None;
    }

    let challenge = first_string(body, CHALLENGE_FIELDS).map(str::to_string);
    let prompt = first_string(body, PROMPT_FIELDS).map(str::to_string);

    if verification_code.is_none() && challenge.is_none() && prompt.is_none() {
        log::debug!("ignoring verification signal without code or challenge text");
        return None;
    }

    Some(VerificationSignal {
        verification_code,
        challenge,
        prompt,
        expires_at: first_timestamp(body, EXPIRY_FIELDS),
    })
}
