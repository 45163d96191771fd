//! Verification auto-solve pipeline.
//!
//! Brings together the challenge solvers and the verification submission in a
//! single entry point. The pipeline picks the challenge text out of a detected
//! [`VerificationSignal`] (falling back to well-known body fields), solves it,
//! and submits the answer through the transport.

use serde_json::{Map, Value};

use crate::challenges::core::{
    ApiTransport, NormalizedResponse, VerificationSubmission, execute_verification_submission,
    first_string,
};
use crate::challenges::detectors::VerificationSignal;
use crate::challenges::solvers::solve_challenge;

/// Body fields consulted when the signal carries no solvable challenge/prompt text.
const FALLBACK_TEXT_FIELDS: &[&str] = &["question", "math_challenge", "puzzle", "message", "hint"];

pub const DEFAULT_VERIFY_PATH: &str = "/verify";

/// Result of an auto-solve attempt.
#[derive(Debug)]
pub enum AutoSolveOutcome {
    /// The answer was accepted by the verification endpoint.
    Verified {
        answer: String,
        response: NormalizedResponse,
    },
    /// The answer was submitted but the endpoint rejected it (or the request failed).
    Rejected {
        answer: String,
        response: NormalizedResponse,
    },
    /// No candidate text could be solved; nothing was submitted.
    Unsolvable,
}

impl AutoSolveOutcome {
    pub fn attempted(&self) -> bool {
        !matches!(self, AutoSolveOutcome::Unsolvable)
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            AutoSolveOutcome::Verified { answer, .. } | AutoSolveOutcome::Rejected { answer, .. } => {
                Some(answer)
            }
            AutoSolveOutcome::Unsolvable => None,
        }
    }
}

/// Coordinates challenge solving and answer submission.
#[derive(Debug, Clone)]
pub struct VerificationPipeline {
    verify_path: String,
}

impl VerificationPipeline {
    pub fn new(verify_path: impl Into<String>) -> Self {
        Self {
            verify_path: verify_path.into(),
        }
    }

    pub fn verify_path(&self) -> &str {
        &self.verify_path
    }

    /// Candidate texts in priority order: challenge, prompt, then body fallbacks.
    pub fn candidate_texts(signal: &VerificationSignal, body: &Map<String, Value>) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        let mut push = |text: &str| {
            if !texts.iter().any(|existing| existing == text) {
                texts.push(text.to_string());
            }
        };

        if let Some(challenge) = signal.challenge.as_deref() {
            push(challenge);
        }
        if let Some(prompt) = signal.prompt.as_deref() {
            push(prompt);
        }
        for field in FALLBACK_TEXT_FIELDS {
            if let Some(text) = first_string(body, &[*field]) {
                push(text);
            }
        }
        texts
    }

    /// First answer produced from the candidate texts.
    pub fn solve(signal: &VerificationSignal, body: &Map<String, Value>) -> Option<String> {
        Self::candidate_texts(signal, body)
            .iter()
            .find_map(|text| solve_challenge(text))
    }

    /// Solve the challenge and submit the answer through the transport.
    pub async fn attempt(
        &self,
        transport: &dyn ApiTransport,
        signal: &VerificationSignal,
        body: &Map<String, Value>,
    ) -> AutoSolveOutcome {
        let Some(answer) = Self::solve(signal, body) else {
            return AutoSolveOutcome::Unsolvable;
        };

        let submission =
            VerificationSubmission::new(answer.clone()).with_code(signal.verification_code.clone());
        let response = execute_verification_submission(transport, &self.verify_path, &submission).await;

        if response.ok {
            AutoSolveOutcome::Verified { answer, response }
        } else {
            AutoSolveOutcome::Rejected { answer, response }
        }
    }
}

impl Default for VerificationPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFY_PATH)
    }
}
