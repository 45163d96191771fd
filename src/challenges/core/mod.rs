//! Core utilities shared by signal extractors, solvers, and the orchestrator.

pub mod analysis;
pub mod executor;
pub mod reqwest_client;
pub mod types;

pub use analysis::{
    MAX_SCAN_DEPTH, collect_strings, first_number, first_string, first_text, first_timestamp,
    lookup, parse_timestamp,
};
pub use executor::{ApiTransport, VerificationSubmission, execute_verification_submission};
pub use reqwest_client::{ReqwestTransport, TransportBuildError};
pub use types::{NormalizedResponse, RequestParts};
