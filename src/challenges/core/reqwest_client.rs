//! Reqwest-based implementation of the [`ApiTransport`] trait.
//!
//! Provides a thin adapter around `reqwest::Client` that resolves tool paths
//! against the configured base URL and converts every outcome into a
//! [`NormalizedResponse`].

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::types::{NormalizedResponse, RequestParts};
use super::ApiTransport;

#[derive(Debug, Error)]
pub enum TransportBuildError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid header value for '{0}'")]
    InvalidHeader(&'static str),
}

/// Reqwest-backed transport bound to a single API base URL.
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport with default headers (user agent, optional bearer token).
    pub fn new(
        base_url: Url,
        api_key: Option<&str>,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportBuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|_| TransportBuildError::InvalidHeader("user-agent"))?,
        );
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| TransportBuildError::InvalidHeader("authorization"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: with_trailing_slash(base_url),
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: with_trailing_slash(base_url),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a tool path relative to the base URL, so `/posts` under
    /// `https://host/api/v1` becomes `https://host/api/v1/posts`.
    fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn execute(
        &self,
        method: &Method,
        path: &str,
        parts: RequestParts,
    ) -> NormalizedResponse {
        let url = match self.resolve(path) {
            Ok(url) => url,
            Err(err) => return NormalizedResponse::network_error(format!("invalid path: {err}")),
        };

        let mut builder = self.client.request(method.clone(), url);
        if !parts.query.is_empty() {
            builder = builder.query(&parts.query);
        }
        if let Some(body) = &parts.body {
            builder = builder.json(body);
        }

        match builder.send().await {
            Ok(response) => to_normalized_response(response).await,
            Err(err) => NormalizedResponse::network_error(err.to_string()),
        }
    }
}

async fn to_normalized_response(response: reqwest::Response) -> NormalizedResponse {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => return NormalizedResponse::network_error(err.to_string()),
    };

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
            serde_json::json!({ "raw": String::from_utf8_lossy(&bytes).to_string() })
        })
    };

    NormalizedResponse::from_json(status, headers, value)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
