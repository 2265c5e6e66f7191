//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the terminal user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("no layer URLs configured; pass at least one --<layer>-url option")]
    NoLayers,

    #[error("viewport span too large; the engine would reject it")]
    SpanTooLarge,

    #[error("fetch failed: {0}")]
    Fetch(#[from] airlayer::fetch::FetchError),
}
