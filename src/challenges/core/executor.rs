//! Transport contract and verification submission.
//!
//! The orchestrator never talks to HTTP directly: every request goes through an
//! [`ApiTransport`], which must normalize all outcomes (including network
//! failures) into a [`NormalizedResponse`].

use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value};

use super::types::{NormalizedResponse, RequestParts};

/// Contract that abstracts the underlying HTTP transport.
///
/// Implementations must not fail: network errors are reported as a response
/// with `status == 0` and `{"error": "network_error", "message": ...}`.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn execute(&self, method: &Method, path: &str, parts: RequestParts)
    -> NormalizedResponse;
}

/// Answer payload posted to the verification endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationSubmission {
    pub answer: String,
    pub verification_code: Option<String>,
}

impl VerificationSubmission {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            verification_code: None,
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.verification_code = code;
        self
    }

    /// JSON body `{answer, verification_code?}`.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("answer".into(), Value::String(self.answer.clone()));
        if let Some(code) = &self.verification_code {
            body.insert("verification_code".into(), Value::String(code.clone()));
        }
        Value::Object(body)
    }
}

/// POST the answer to the verification endpoint and return the raw outcome.
pub async fn execute_verification_submission(
    transport: &dyn ApiTransport,
    verify_path: &str,
    submission: &VerificationSubmission,
) -> NormalizedResponse {
    let parts = RequestParts::new().with_body(submission.to_body());
    transport.execute(&Method::POST, verify_path, parts).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use http::HeaderMap;
    use serde_json::json;
    use std::sync::Mutex;

    /// Request captured by [`StubTransport`].
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub body: Option<Value>,
    }

    pub(crate) struct StubTransport {
        responses: Mutex<Vec<NormalizedResponse>>,
        pub requests: Mutex<Vec<RecordedRequest>>,
    }

    impl StubTransport {
        pub(crate) fn new(responses: Vec<NormalizedResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn recorded(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiTransport for StubTransport {
        async fn execute(
            &self,
            method: &Method,
            path: &str,
            parts: RequestParts,
        ) -> NormalizedResponse {
            self.requests.lock().unwrap().push(RecordedRequest {
                method: method.clone(),
                path: path.to_string(),
                body: parts.body,
            });
            self.responses
                .lock()
                .unwrap()
                .pop()
                .expect("no more stub responses")
        }
    }

    pub(crate) fn response(status: u16, body: Value) -> NormalizedResponse {
        NormalizedResponse::from_json(status, HeaderMap::new(), body)
    }

    #[test]
    fn submission_body_omits_missing_code() {
        let body = VerificationSubmission::new("14.00").to_body();
        assert_eq!(body, json!({ "answer": "14.00" }));

        let body = VerificationSubmission::new("7.00")
            .with_code(Some("abc".into()))
            .to_body();
        assert_eq!(body, json!({ "answer": "7.00", "verification_code": "abc" }));
    }

    #[tokio::test]
    async fn posts_answer_to_verify_path() {
        let transport = StubTransport::new(vec![response(200, json!({ "success": true }))]);
        let submission = VerificationSubmission::new("14.00").with_code(Some("c-1".into()));

        let outcome = execute_verification_submission(&transport, "/verify", &submission).await;

        assert!(outcome.ok);
        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::POST);
        assert_eq!(recorded[0].path, "/verify");
        assert_eq!(
            recorded[0].body,
            Some(json!({ "answer": "14.00", "verification_code": "c-1" }))
        );
    }
}
