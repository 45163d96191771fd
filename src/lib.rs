//! # writeguard-rs
//!
//! A guarded client for social-platform APIs. Tool-style requests are
//! forwarded to HTTP endpoints while local guards keep an agent from writing
//! while suspended, while a verification challenge is outstanding, during a
//! server-imposed cooldown, or faster than a minimum interval.
//!
//! Simple arithmetic verification challenges (digit expressions or obfuscated
//! English number words) are answered automatically.
//!
//! ## Features
//!
//! - Suspension, retry-after and verification detection over loosely shaped JSON
//! - Recursive-descent digit solver and fuzzy number-word solver
//! - Persisted guard state (JSON file, redb, or in-memory)
//! - Reqwest transport with bearer authentication
//! - Event hooks around every call
//!
//! ## Example
//!
//! ```no_run
//! use writeguard_rs::{GuardedClient, ToolRequest};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GuardedClient::builder()
//!         .with_api_key("moltbook_sk_...")
//!         .with_state_path(".writeguard/state.json")
//!         .build()?;
//!
//!     let outcome = client
//!         .call(
//!             ToolRequest::post("create_post", "/posts")
//!                 .with_body(json!({ "submolt": "general", "title": "hello" })),
//!         )
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```

mod guarded_client;

pub mod challenges;
pub mod config;
pub mod modules;
pub mod outcome;
pub mod tools;

pub use crate::guarded_client::{
    Clock,
    GuardStatus,
    GuardedClient,
    GuardedClientBuilder,
    GuardedClientError,
    GuardedClientResult,
    ManualClock,
    SystemClock,
};

pub use crate::challenges::core::{
    ApiTransport,
    NormalizedResponse,
    RequestParts,
    ReqwestTransport,
    TransportBuildError,
    VerificationSubmission,
};

pub use crate::challenges::detectors::{
    SuspensionSignal,
    VerificationSignal,
    extract_retry_seconds,
    extract_suspension,
    extract_verification,
};

pub use crate::challenges::pipeline::{AutoSolveOutcome, VerificationPipeline};

pub use crate::challenges::solvers::{
    ChallengeSolver,
    Operation,
    compute,
    detect_operation,
    extract_numbers,
    normalize_challenge,
    solve_challenge,
    solve_digit_expression,
};

pub use crate::config::{ConfigError, GuardConfig};

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    GuardBlock,
    GuardEvent,
    GuardPolicy,
    GuardState,
    JsonFileStateStore,
    LoggingHandler,
    MemoryStateStore,
    PendingVerification,
    RedbStateStore,
    StateError,
    StateStore,
};

pub use crate::outcome::{ErrorCode, OutcomeError, ToolOutcome};
pub use crate::tools::{CooldownCategory, ToolClassifier, ToolRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
