//! Response signal extraction.
//!
//! Pure functions that read a [`NormalizedResponse`](crate::challenges::core::NormalizedResponse)
//! and report suspension/ban signals, retry-after hints, and verification
//! challenges. None of them mutate state; the orchestrator decides what to do
//! with the signals.

pub mod retry;
pub mod suspension;
pub mod verification;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

pub use retry::extract_retry_seconds;
pub use suspension::{SuspensionSignal, extract_suspension, mentions_suspension};
pub use verification::{VerificationSignal, extract_verification, mentions_verification};

pub(crate) fn build_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|err| panic!("invalid signal detection regex `{}`: {}", pattern, err))
}

static SUSPENSION_RE: Lazy<Regex> =
    Lazy::new(|| build_regex(r"suspend|temp(?:orary)?\s+ban|\b(?:shadow)?ban(?:ned|ning|s)?\b"));

static VERIFICATION_RE: Lazy<Regex> =
    Lazy::new(|| build_regex(r"verification|verify|challenge|math|captcha"));
