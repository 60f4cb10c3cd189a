//! Core data types for the discovery and analysis pipeline.

pub mod cache;
pub mod entry;
pub mod metrics;
pub mod page;
pub mod tier;

pub use cache::{CacheRecord, CacheStats, ContentHash, UrlHash};
pub use entry::{ChangeFrequency, DiscoveryMethod, DiscoveryResult, SitemapEntry};
pub use metrics::AnalysisMetrics;
pub use page::{DiscoveredPage, PageAnalysis};
pub use tier::{Tier, TierFeatures, TierLimits};

/// Canonical form of a URL used for cache keys and deduplication.
///
/// Fragments and query strings are dropped, the trailing slash is
/// trimmed, and the result is lowercased. The same logical page must
/// never occupy two cache slots within a tier.
pub fn canonicalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.set_query(None);
            let s = parsed.to_string();
            s.trim_end_matches('/').to_lowercase()
        }
        Err(_) => raw.trim_end_matches('/').to_lowercase(),
    }
}
