//! Typed errors for the sitescope library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Discovery and analysis
//! swallow expected network failures internally (spelled out per
//! strategy and per page); these types cover the contract violations
//! and collaborator failures that do propagate.

use thiserror::Error;

/// Errors from a single HTTP fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Request exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from sitemap XML parsing.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// Server returned an HTML document where XML was expected,
    /// usually a soft-404 or a client-side redirect page.
    #[error("received HTML document instead of sitemap XML")]
    HtmlDocument,

    /// Malformed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Document parsed but contained neither a urlset nor a sitemap index
    #[error("document is not a sitemap")]
    NotASitemap,
}

/// Errors from the analysis pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetch failed in a context where it cannot be degraded per-page
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Cache or usage store failed
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Page scorer failed
    #[error("scorer error: {0}")]
    Scorer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON (de)serialization of a stored result failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
