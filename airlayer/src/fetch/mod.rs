//! Remote layer fetching.
//!
//! Each of the four remote layers is reached through the [`LayerFetcher`]
//! seam: `fetch(bbox) -> features`. Behind it sits a retrying HTTP wrapper
//! ([`retry::RetryingFetch`]) over a mockable client trait
//! ([`HttpFetch`]), plus a generic GeoJSON adapter
//! ([`geojson::GeoJsonLayer`]) for services that speak FeatureCollection.
//!
//! # Error taxonomy
//!
//! - `Cancelled` is cooperative supersession; never retried, never surfaced
//!   to the user.
//! - `Transient`, `Status` and `NotJson` are retried with backoff.
//! - `SchemaDecode` is not retried: the bytes arrived fine, retrying will
//!   not fix a malformed schema.

mod geojson;
mod http;
mod retry;

pub use geojson::GeoJsonLayer;
pub use http::{HttpFetch, HttpResponse, ReqwestFetch};
pub use retry::{RetryConfig, RetryingFetch};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::feature::{Feature, LayerSource};
use crate::geo::BBox;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from a single layer fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request was superseded; cooperative cancellation.
    #[error("fetch cancelled")]
    Cancelled,

    /// Network-level failure (connect, timeout, body read).
    #[error("transient network error: {0}")]
    Transient(String),

    /// Non-success HTTP status.
    #[error("HTTP status {code}")]
    Status { code: u16 },

    /// 2xx response whose body is not JSON. Some third-party endpoints
    /// mislabel XML error bodies as successful responses.
    #[error("response is not JSON (content-type: {content_type})")]
    NotJson { content_type: String },

    /// Body parsed as JSON but did not match the expected shape.
    #[error("schema decode error: {0}")]
    SchemaDecode(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Whether the retry wrapper should attempt again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transient(_) | FetchError::Status { .. } | FetchError::NotJson { .. }
        )
    }
}

/// One remote airspace layer.
///
/// The transport and per-service schema live behind this trait; the
/// orchestrator only sees `bbox -> features`.
pub trait LayerFetcher: Send + Sync {
    /// The source this fetcher serves.
    fn source(&self) -> LayerSource;

    /// Fetches all features intersecting `bbox`.
    ///
    /// Implementations must observe `cancel` cooperatively and return
    /// `FetchError::Cancelled` rather than partial data.
    fn fetch<'a>(
        &'a self,
        bbox: &'a BBox,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>>;
}

/// Content sniffing for mislabeled responses.
///
/// Header first: a content-type mentioning JSON is trusted, one mentioning
/// XML or HTML is rejected outright. Otherwise the first non-whitespace
/// body byte decides: `{` or `[` passes, anything else (e.g. an
/// `<ExceptionReport` body served with 200) fails.
pub fn looks_like_json(content_type: Option<&str>, body: &[u8]) -> bool {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("json") {
            return true;
        }
        if ct.contains("xml") || ct.contains("html") {
            return false;
        }
    }

    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|&b| b == b'{' || b == b'[')
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_content_type_is_trusted() {
        assert!(looks_like_json(Some("application/json"), b"<oops>"));
        assert!(looks_like_json(Some("application/geo+json; charset=utf-8"), b""));
    }

    #[test]
    fn test_xml_content_type_is_rejected() {
        assert!(!looks_like_json(Some("text/xml"), b"{\"a\":1}"));
        assert!(!looks_like_json(Some("text/html"), b"[1]"));
    }

    #[test]
    fn test_body_sniffing_without_header() {
        assert!(looks_like_json(None, b"  {\"a\": 1}"));
        assert!(looks_like_json(None, b"\n\t[1, 2]"));
        assert!(!looks_like_json(None, b"<ExceptionReport>boom</ExceptionReport>"));
        assert!(!looks_like_json(None, b""));
    }

    #[test]
    fn test_unhelpful_header_falls_back_to_body() {
        assert!(looks_like_json(Some("application/octet-stream"), b"[{}]"));
        assert!(!looks_like_json(Some("text/plain"), b"<ExceptionReport"));
    }

    #[test]
    fn test_error_retryability() {
        assert!(FetchError::Transient("reset".into()).is_retryable());
        assert!(FetchError::Status { code: 503 }.is_retryable());
        assert!(FetchError::NotJson { content_type: "text/xml".into() }.is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::SchemaDecode("bad shape".into()).is_retryable());
    }
}
