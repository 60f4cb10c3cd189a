//! Hand-written test doubles.
//!
//! Public so downstream crates and the integration tests can script
//! network and scorer behavior without a live server or API key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::error::{FetchError, FetchResult, PipelineError};
use crate::fetcher::{FetchedPage, Fetcher, HeadSnapshot, Validators};
use crate::traits::PageScorer;
use crate::types::PageAnalysis;

/// A request observed by [`MockFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Fetch { url: String },
    Head { url: String },
    ConditionalHead { url: String, validators: Validators },
}

impl RecordedRequest {
    pub fn url(&self) -> &str {
        match self {
            RecordedRequest::Fetch { url }
            | RecordedRequest::Head { url }
            | RecordedRequest::ConditionalHead { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedPage {
    body: String,
    final_url: Option<String>,
    last_modified: Option<String>,
    etag: Option<String>,
}

/// Scripted [`Fetcher`]: responses are registered per URL, everything
/// unscripted fails with a 404, and every request is recorded for
/// assertions.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, ScriptedPage>,
    heads: HashMap<String, HeadSnapshot>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful GET (and matching HEAD) for a URL.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        self.heads.entry(url.clone()).or_insert(HeadSnapshot {
            status: 200,
            last_modified: None,
            etag: None,
        });
        self.pages.insert(
            url,
            ScriptedPage {
                body: body.into(),
                final_url: None,
                last_modified: None,
                etag: None,
            },
        );
        self
    }

    /// Script a GET that redirects: the response reports `final_url`
    /// instead of the requested URL.
    pub fn with_redirected_page(
        mut self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let url = url.into();
        self.heads.entry(url.clone()).or_insert(HeadSnapshot {
            status: 200,
            last_modified: None,
            etag: None,
        });
        self.pages.insert(
            url,
            ScriptedPage {
                body: body.into(),
                final_url: Some(final_url.into()),
                last_modified: None,
                etag: None,
            },
        );
        self
    }

    /// Script a successful GET carrying validator headers.
    pub fn with_page_validators(
        mut self,
        url: impl Into<String>,
        body: impl Into<String>,
        last_modified: Option<&str>,
        etag: Option<&str>,
    ) -> Self {
        let url = url.into();
        self.heads.insert(
            url.clone(),
            HeadSnapshot {
                status: 200,
                last_modified: last_modified.map(str::to_string),
                etag: etag.map(str::to_string),
            },
        );
        self.pages.insert(
            url,
            ScriptedPage {
                body: body.into(),
                final_url: None,
                last_modified: last_modified.map(str::to_string),
                etag: etag.map(str::to_string),
            },
        );
        self
    }

    /// Script a bare HEAD status for a URL (304 to answer conditional
    /// requests, 200 for crawl validation, anything else to refuse).
    pub fn with_head_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.heads.insert(
            url.into(),
            HeadSnapshot {
                status,
                last_modified: None,
                etag: None,
            },
        );
        self
    }

    /// Script a HEAD response carrying an ETag.
    pub fn with_head_etag(
        mut self,
        url: impl Into<String>,
        status: u16,
        etag: impl Into<String>,
    ) -> Self {
        self.heads.insert(
            url.into(),
            HeadSnapshot {
                status,
                last_modified: None,
                etag: Some(etag.into()),
            },
        );
        self
    }

    /// Everything this fetcher has been asked so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// GET requests issued for one URL.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, RecordedRequest::Fetch { url: u } if u == url))
            .count()
    }

    /// All GET requests issued, across URLs.
    pub fn total_fetches(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, RecordedRequest::Fetch { .. }))
            .count()
    }

    /// Conditional HEAD requests issued for one URL.
    pub fn conditional_head_count(&self, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, RecordedRequest::ConditionalHead { url: u, .. } if u == url))
            .count()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().expect("lock poisoned").push(request);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.record(RecordedRequest::Fetch {
            url: url.to_string(),
        });
        match self.pages.get(url) {
            Some(page) => Ok(FetchedPage {
                final_url: page.final_url.clone().unwrap_or_else(|| url.to_string()),
                status: 200,
                body: page.body.clone(),
                content_type: Some("text/html; charset=utf-8".to_string()),
                last_modified: page.last_modified.clone(),
                etag: page.etag.clone(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn head(&self, url: &str) -> FetchResult<HeadSnapshot> {
        self.record(RecordedRequest::Head {
            url: url.to_string(),
        });
        match self.heads.get(url) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn conditional_head(
        &self,
        url: &str,
        validators: &Validators,
    ) -> FetchResult<HeadSnapshot> {
        self.record(RecordedRequest::ConditionalHead {
            url: url.to_string(),
            validators: validators.clone(),
        });
        match self.heads.get(url) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Scripted [`PageScorer`]: fixed analyses per URL, optional failure
/// URLs, call counting split by plain and enhanced mode.
#[derive(Default)]
pub struct MockScorer {
    analyses: HashMap<String, PageAnalysis>,
    failures: Vec<String>,
    ai: bool,
    plain_calls: AtomicU32,
    enhanced_calls: AtomicU32,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the analysis returned for one URL.
    pub fn with_analysis(mut self, url: impl Into<String>, analysis: PageAnalysis) -> Self {
        self.analyses.insert(url.into(), analysis);
        self
    }

    /// Make scoring fail for one URL.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failures.push(url.into());
        self
    }

    /// Report `enhanced` calls as consuming the AI budget.
    pub fn with_ai(mut self) -> Self {
        self.ai = true;
        self
    }

    pub fn plain_calls(&self) -> u32 {
        self.plain_calls.load(Ordering::SeqCst)
    }

    pub fn enhanced_calls(&self) -> u32 {
        self.enhanced_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScorer for MockScorer {
    async fn score(
        &self,
        url: &str,
        _raw_content: &str,
        enhanced: bool,
    ) -> Result<PageAnalysis, PipelineError> {
        if enhanced {
            self.enhanced_calls.fetch_add(1, Ordering::SeqCst);
        } else {
            self.plain_calls.fetch_add(1, Ordering::SeqCst);
        }

        if self.failures.iter().any(|f| f == url) {
            return Err(PipelineError::Scorer(
                format!("scripted scorer failure for {url}").into(),
            ));
        }

        Ok(self.analyses.get(url).cloned().unwrap_or(PageAnalysis {
            title: "Mock Page".to_string(),
            description: "A scripted analysis result.".to_string(),
            quality_score: 5.0,
            category: "General".to_string(),
            relevance: 5.0,
        }))
    }

    fn uses_ai(&self) -> bool {
        self.ai
    }
}
