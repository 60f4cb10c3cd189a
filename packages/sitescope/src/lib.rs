//! Site Discovery and Analysis Pipeline
//!
//! Finds the pages of a website worth analyzing, scores them for
//! content quality, and caches the results per subscription tier with
//! change-aware invalidation.
//!
//! # Design Philosophy
//!
//! **"Degrade, never fail"**
//!
//! - Discovery falls through sitemaps, robots.txt, a single-page-app
//!   heuristic and a bounded crawl; it always returns at least one page
//! - Per-page analysis failures become degraded records, not errors
//! - Ten consecutive failures read as bot protection and stop the run
//! - The cache serves a page only after confirming it has not changed
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sitescope::{
//!     AnalysisOrchestrator, CacheEngine, DiscoveryEngine, HtmlScorer,
//!     HttpFetcher, MemoryCacheStore, Tier,
//! };
//!
//! let fetcher = Arc::new(HttpFetcher::new());
//! let cache = Arc::new(CacheEngine::new(Arc::new(MemoryCacheStore::new())));
//! let scorer = Arc::new(HtmlScorer::new());
//!
//! let discovery = DiscoveryEngine::new(Arc::clone(&fetcher));
//! let found = discovery.discover("https://example.com").await;
//!
//! let orchestrator = AnalysisOrchestrator::new(fetcher, cache, scorer);
//! let report = orchestrator.run(found.entries, Tier::Growth).await;
//! for page in &report.pages {
//!     println!("{}: {}", page.quality_score, page.url);
//! }
//! ```
//!
//! # Modules
//!
//! - [`discovery`] - Multi-strategy page discovery
//! - [`filter`] - Relevance filtering and priority ordering
//! - [`analyze`] - Batch orchestration with budget and failure gating
//! - [`cache`] - Tier-scoped cache engine with change detection
//! - [`scorers`] - HTML-heuristic and model-backed page scorers
//! - [`usage`] - Per-user daily accounting and limit checks
//! - [`stores`] - Storage implementations (in-memory)
//! - [`testing`] - Mock implementations for testing

pub mod analyze;
pub mod cache;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod scorers;
pub mod sitemap;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod usage;

// Re-export core types at crate root
pub use analyze::{AnalysisConfig, AnalysisOrchestrator, AnalysisReport};
pub use cache::CacheEngine;
pub use discovery::{DiscoveryConfig, DiscoveryEngine};
pub use error::{FetchError, PipelineError, SitemapError};
pub use fetcher::{Fetcher, HttpFetcher, RateLimitedFetcher};
pub use filter::filter_relevant;
pub use scorers::{HtmlScorer, OpenAiScorer};
pub use stores::{MemoryCacheStore, MemoryUsageStore};
pub use traits::{CacheStore, PageScorer, UsageStore};
pub use types::{
    AnalysisMetrics, CacheRecord, CacheStats, DiscoveredPage, DiscoveryMethod, DiscoveryResult,
    PageAnalysis, SitemapEntry, Tier, TierLimits,
};
pub use usage::{estimate_analysis_cost, UsageCheck, UsageTracker};
