//! Caller-facing result payloads.
//!
//! Every guarded call resolves to a [`ToolOutcome`]; failures are structured
//! payloads carrying an [`ErrorCode`], never an `Err`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::challenges::core::NormalizedResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AccountSuspended,
    BlockedByPendingVerification,
    WriteCooldownActive,
    SafeModeWriteInterval,
    VerificationRequired,
    RateLimited,
    RequestFailed,
    NetworkError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AccountSuspended => "account_suspended",
            ErrorCode::BlockedByPendingVerification => "blocked_by_pending_verification",
            ErrorCode::WriteCooldownActive => "write_cooldown_active",
            ErrorCode::SafeModeWriteInterval => "safe_mode_write_interval",
            ErrorCode::VerificationRequired => "verification_required",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::RequestFailed => "request_failed",
            ErrorCode::NetworkError => "network_error",
        }
    }

    /// Code for a failed remote response, by status.
    pub fn for_status(status: u16) -> Self {
        match status {
            0 => ErrorCode::NetworkError,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::RequestFailed,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl OutcomeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub ok: bool,
    /// Remote status. `None` when the call was blocked before any request.
    pub status: Option<u16>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub auto_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_response: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

impl ToolOutcome {
    pub fn success(response: &NormalizedResponse) -> Self {
        Self {
            ok: true,
            status: Some(response.status),
            data: response.body.clone(),
            auto_verified: false,
            verify_response: None,
            error: None,
        }
    }

    /// Failed remote response with its status-derived error code.
    pub fn failure(response: &NormalizedResponse, message: impl Into<String>) -> Self {
        Self::failure_with(response, ErrorCode::for_status(response.status), message)
    }

    pub fn failure_with(
        response: &NormalizedResponse,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            status: Some(response.status),
            data: response.body.clone(),
            auto_verified: false,
            verify_response: None,
            error: Some(OutcomeError::new(code, message)),
        }
    }

    /// Call refused locally before reaching the remote service.
    pub fn blocked(error: OutcomeError) -> Self {
        Self {
            ok: false,
            status: None,
            data: Map::new(),
            auto_verified: false,
            verify_response: None,
            error: Some(error),
        }
    }

    pub fn with_verify_response(mut self, response: &NormalizedResponse) -> Self {
        self.verify_response = Some(response.body.clone());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = details;
        }
        self
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|error| error.code)
    }
}
