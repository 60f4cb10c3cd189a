//! Bounded-timeout HTTP fetcher used by every other component.
//!
//! The [`Fetcher`] trait exists so discovery, caching and analysis can
//! be exercised against scripted responses in tests; [`HttpFetcher`]
//! is the reqwest-backed production implementation.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};

/// Fixed user agent sent with every request.
pub const USER_AGENT: &str = "Sitescope Bot 1.0";

/// Default GET timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default HEAD timeout.
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

/// A fetched page body plus the response metadata the pipeline cares
/// about.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,

    /// Content-Type header, if present
    pub content_type: Option<String>,

    /// Last-Modified header, if present
    pub last_modified: Option<String>,

    /// ETag header, if present
    pub etag: Option<String>,
}

/// Response metadata from a HEAD probe.
#[derive(Debug, Clone)]
pub struct HeadSnapshot {
    /// HTTP status code (304 signals an unchanged conditional probe)
    pub status: u16,

    /// Last-Modified header, if present
    pub last_modified: Option<String>,

    /// ETag header, if present
    pub etag: Option<String>,
}

impl HeadSnapshot {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether a conditional probe reported 304 Not Modified.
    pub fn not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Stored HTTP validators replayed on a conditional request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// Sent as If-Modified-Since
    pub last_modified: Option<String>,

    /// Sent as If-None-Match
    pub etag: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.last_modified.is_none() && self.etag.is_none()
    }
}

/// Outbound HTTP operations needed by the pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a URL and return the body with response metadata.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// HEAD a URL.
    async fn head(&self, url: &str) -> FetchResult<HeadSnapshot>;

    /// HEAD a URL with conditional-request validators attached.
    async fn conditional_head(&self, url: &str, validators: &Validators)
        -> FetchResult<HeadSnapshot>;
}

/// Production fetcher over a shared `reqwest::Client`.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    head_timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with default timeouts and user agent.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: USER_AGENT.to_string(),
            head_timeout: HEAD_TIMEOUT,
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client (timeouts come from the client).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn map_error(url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http(Box::new(e))
        }
    }

    fn header(response: &reqwest::Response, name: &str) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, "HTTP GET starting");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP GET failed");
                Self::map_error(url, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = Self::header(&response, "content-type");
        let last_modified = Self::header(&response, "last-modified");
        let etag = Self::header(&response, "etag");

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
            content_type,
            last_modified,
            etag,
        })
    }

    async fn head(&self, url: &str) -> FetchResult<HeadSnapshot> {
        self.conditional_head(url, &Validators::default()).await
    }

    async fn conditional_head(
        &self,
        url: &str,
        validators: &Validators,
    ) -> FetchResult<HeadSnapshot> {
        debug!(url = %url, conditional = !validators.is_empty(), "HTTP HEAD starting");
        let mut request = self
            .client
            .head(url)
            .header("User-Agent", &self.user_agent)
            .timeout(self.head_timeout);

        if let Some(since) = &validators.last_modified {
            request = request.header("If-Modified-Since", since);
        }
        if let Some(etag) = &validators.etag {
            request = request.header("If-None-Match", etag);
        }

        let response = request.send().await.map_err(|e| Self::map_error(url, e))?;

        Ok(HeadSnapshot {
            status: response.status().as_u16(),
            last_modified: Self::header(&response, "last-modified"),
            etag: Self::header(&response, "etag"),
        })
    }
}

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher wrapper that enforces a requests-per-second quota.
///
/// Keeps outbound pressure on a single site bounded regardless of how
/// many batches the orchestrator has in flight.
pub struct RateLimitedFetcher<F: Fetcher> {
    inner: F,
    limiter: std::sync::Arc<DirectRateLimiter>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Wrap a fetcher with a sustained requests-per-second limit.
    pub fn new(inner: F, requests_per_second: u32) -> Self {
        let quota = governor::Quota::per_second(
            std::num::NonZeroU32::new(requests_per_second)
                .expect("requests_per_second must be > 0"),
        );
        Self {
            inner,
            limiter: std::sync::Arc::new(governor::RateLimiter::direct(quota)),
        }
    }

    /// Wrap with burst support.
    pub fn with_burst(inner: F, requests_per_second: u32, burst: u32) -> Self {
        let quota = governor::Quota::per_second(
            std::num::NonZeroU32::new(requests_per_second)
                .expect("requests_per_second must be > 0"),
        )
        .allow_burst(std::num::NonZeroU32::new(burst).expect("burst must be > 0"));
        Self {
            inner,
            limiter: std::sync::Arc::new(governor::RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }

    async fn head(&self, url: &str) -> FetchResult<HeadSnapshot> {
        self.limiter.until_ready().await;
        self.inner.head(url).await
    }

    async fn conditional_head(
        &self,
        url: &str,
        validators: &Validators,
    ) -> FetchResult<HeadSnapshot> {
        self.limiter.until_ready().await;
        self.inner.conditional_head(url, validators).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_snapshot_states() {
        let ok = HeadSnapshot {
            status: 200,
            last_modified: None,
            etag: None,
        };
        assert!(ok.is_success());
        assert!(!ok.not_modified());

        let unchanged = HeadSnapshot {
            status: 304,
            last_modified: None,
            etag: None,
        };
        assert!(!unchanged.is_success());
        assert!(unchanged.not_modified());
    }

    #[test]
    fn test_validators_empty() {
        assert!(Validators::default().is_empty());
        let with_etag = Validators {
            etag: Some("\"abc\"".into()),
            ..Default::default()
        };
        assert!(!with_etag.is_empty());
    }
}
