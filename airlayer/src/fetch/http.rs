//! HTTP client abstraction for testability.

use std::time::Duration;

use bytes::Bytes;

use super::{BoxFuture, FetchError};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A raw HTTP response: sniffable content type plus body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The `Content-Type` header, if present.
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Trait for HTTP GET operations.
///
/// This abstraction allows dependency injection and easier testing by
/// enabling mock HTTP clients in tests.
pub trait HttpFetch: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// A non-2xx status is an error (`FetchError::Status`); transport
    /// failures map to `FetchError::Transient`.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Creates a client with the default 30 s timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transient(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetch {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Transient(format!("request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status { code: status.as_u16() });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transient(format!("failed to read response: {}", e)))?;

            Ok(HttpResponse { content_type, body })
        })
    }
}
