//! Tier-scoped result cache with change-aware invalidation.
//!
//! The engine owns all reads and writes against a [`CacheStore`];
//! expiry policy and change detection live here so stores stay dumb
//! key-value maps.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::fetcher::{FetchedPage, Fetcher, Validators};
use crate::traits::CacheStore;
use crate::types::{CacheRecord, CacheStats, ContentHash, DiscoveredPage, Tier, UrlHash};

/// URL path fragments that halve the cache lifetime.
const FAST_MOVING_PATHS: &[&str] = &["/blog/", "/news/", "/updates/"];

/// URL path fragments that double the cache lifetime.
const SLOW_MOVING_PATHS: &[&str] = &["/docs/", "/api/", "/reference/"];

/// Cache engine over an injected store.
///
/// Records are keyed by `(url_hash, tier)`; the engine never serves a
/// record across tiers or past its expiry.
pub struct CacheEngine<S: CacheStore> {
    store: Arc<S>,
}

impl<S: CacheStore> CacheEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look up an unexpired record and count the hit.
    ///
    /// Expired records are left for [`sweep_expired`](Self::sweep_expired)
    /// rather than deleted inline.
    pub async fn lookup(
        &self,
        url: &str,
        tier: Tier,
    ) -> Result<Option<CacheRecord>, PipelineError> {
        let url_hash = UrlHash::from_url(url);
        let Some(record) = self.store.get(&url_hash, tier).await? else {
            return Ok(None);
        };

        if record.is_expired(Utc::now()) {
            debug!(url = %url, tier = %tier, "Cache record expired");
            return Ok(None);
        }

        self.store.record_hit(&url_hash, tier).await?;
        debug!(url = %url, tier = %tier, hits = record.hit_count + 1, "Cache hit");
        Ok(Some(record))
    }

    /// Decide whether a cached record still reflects the live page.
    ///
    /// Preference order: a 304 settles it; otherwise differing
    /// validators mean changed; with no validators on either side the
    /// body hash is compared; any network error is treated as changed
    /// so a stale result is never served on faith.
    pub async fn has_changed<F: Fetcher>(
        &self,
        fetcher: &F,
        url: &str,
        record: &CacheRecord,
    ) -> bool {
        if record.has_validators() {
            let validators = Validators {
                last_modified: record.last_modified_header.clone(),
                etag: record.etag.clone(),
            };
            match fetcher.conditional_head(url, &validators).await {
                Ok(snapshot) if snapshot.not_modified() => return false,
                Ok(snapshot) if snapshot.is_success() => {
                    if let (Some(cached), Some(live)) = (&record.etag, &snapshot.etag) {
                        return cached != live;
                    }
                    if let (Some(cached), Some(live)) =
                        (&record.last_modified_header, &snapshot.last_modified)
                    {
                        return cached != live;
                    }
                    // Server stopped sending validators; fall through
                    // to the hash compare.
                }
                Ok(_) | Err(_) => {
                    warn!(url = %url, "Conditional request failed; treating page as changed");
                    return true;
                }
            }
        }

        match fetcher.fetch(url).await {
            Ok(page) => ContentHash::from_content(&page.body) != record.content_hash,
            Err(e) => {
                warn!(url = %url, error = %e, "Change-check fetch failed; treating page as changed");
                true
            }
        }
    }

    /// Persist a freshly scored page, resetting the hit count.
    ///
    /// Keyed by the requested `url`, not `fetched.final_url`: lookups
    /// run before any fetch, so a record keyed by the post-redirect
    /// URL would never be read again.
    pub async fn store_result(
        &self,
        url: &str,
        fetched: &FetchedPage,
        scored: &DiscoveredPage,
        tier: Tier,
    ) -> Result<(), PipelineError> {
        let now = Utc::now();
        let record = CacheRecord {
            url: url.to_string(),
            url_hash: UrlHash::from_url(url),
            content_hash: ContentHash::from_content(&fetched.body),
            last_modified_header: fetched.last_modified.clone(),
            etag: fetched.etag.clone(),
            scored_result: scored.clone(),
            tier,
            cached_at: now,
            expires_at: now + cache_duration(url, tier),
            hit_count: 0,
        };
        self.store.upsert(record).await
    }

    /// Delete expired records. Returns the number removed.
    pub async fn sweep_expired(&self) -> Result<u64, PipelineError> {
        let removed = self.store.delete_expired(Utc::now()).await?;
        if removed > 0 {
            debug!(removed, "Swept expired cache records");
        }
        Ok(removed)
    }

    /// Aggregate counters for one tier.
    pub async fn stats(&self, tier: Tier) -> Result<CacheStats, PipelineError> {
        self.store.stats(tier, Utc::now()).await
    }
}

/// Cache lifetime for a URL under a tier.
///
/// The tier sets the base; content volatility inferred from the path
/// halves it (never below one day) or doubles it.
pub fn cache_duration(url: &str, tier: Tier) -> Duration {
    let base_days = tier.limits().cache_duration_days;
    let lower = url.to_lowercase();

    let days = if FAST_MOVING_PATHS.iter().any(|p| lower.contains(p)) {
        (base_days / 2).max(1)
    } else if SLOW_MOVING_PATHS.iter().any(|p| lower.contains(p)) {
        base_days * 2
    } else {
        base_days
    };
    Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryCacheStore;
    use crate::testing::MockFetcher;
    use crate::types::PageAnalysis;

    fn scored(url: &str) -> DiscoveredPage {
        DiscoveredPage::from_analysis(
            url,
            &PageAnalysis {
                title: "Docs Home".to_string(),
                description: "Entry point for the documentation.".to_string(),
                quality_score: 8.0,
                category: "Documentation".to_string(),
                relevance: 8.0,
            },
        )
    }

    fn fetched(url: &str, body: &str, etag: Option<&str>) -> FetchedPage {
        FetchedPage {
            final_url: url.to_string(),
            status: 200,
            body: body.to_string(),
            content_type: Some("text/html".to_string()),
            last_modified: None,
            etag: etag.map(str::to_string),
        }
    }

    #[test]
    fn test_cache_duration_path_shaping() {
        assert_eq!(
            cache_duration("https://example.com/blog/post", Tier::Growth),
            Duration::days(3)
        );
        assert_eq!(
            cache_duration("https://example.com/docs/intro", Tier::Growth),
            Duration::days(14)
        );
        assert_eq!(
            cache_duration("https://example.com/pricing", Tier::Growth),
            Duration::days(7)
        );
        // Scale's 3-day base halves to 1, never below
        assert_eq!(
            cache_duration("https://example.com/news/today", Tier::Scale),
            Duration::days(1)
        );
        assert_eq!(
            cache_duration("https://example.com/about", Tier::Starter),
            Duration::days(30)
        );
    }

    #[tokio::test]
    async fn test_lookup_roundtrip_preserves_result() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(Arc::clone(&store));
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>docs</html>", Some("\"v1\""));

        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();

        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();
        assert_eq!(record.scored_result, scored(url));
        assert_eq!(record.hit_count, 0);

        // The counted hit lands in the store
        let again = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();
        assert_eq!(again.hit_count, 1);
    }

    #[tokio::test]
    async fn test_redirected_fetch_is_keyed_by_requested_url() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(store);
        let url = "http://example.com/docs/intro";

        // GET followed a redirect to the https canonical form
        let page = FetchedPage {
            final_url: "https://www.example.com/docs/intro".to_string(),
            status: 200,
            body: "<html>docs</html>".to_string(),
            content_type: Some("text/html".to_string()),
            last_modified: None,
            etag: None,
        };
        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();

        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();
        assert_eq!(record.url, url);
    }

    #[tokio::test]
    async fn test_lookup_is_tier_scoped() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(store);
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>docs</html>", None);

        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();

        assert!(engine.lookup(url, Tier::Starter).await.unwrap().is_none());
        assert!(engine.lookup(url, Tier::Growth).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_has_changed_not_modified() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(Arc::clone(&store));
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>docs</html>", Some("\"v1\""));
        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();
        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();

        let fetcher = MockFetcher::new().with_head_status(url, 304);
        assert!(!engine.has_changed(&fetcher, url, &record).await);
    }

    #[tokio::test]
    async fn test_has_changed_differing_etag() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(Arc::clone(&store));
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>docs</html>", Some("\"v1\""));
        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();
        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();

        let fetcher = MockFetcher::new().with_head_etag(url, 200, "\"v2\"");
        assert!(engine.has_changed(&fetcher, url, &record).await);
    }

    #[tokio::test]
    async fn test_has_changed_hash_compare_without_validators() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(Arc::clone(&store));
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>v1</html>", None);
        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();
        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();

        let same = MockFetcher::new().with_page(url, "<html>v1</html>");
        assert!(!engine.has_changed(&same, url, &record).await);

        let different = MockFetcher::new().with_page(url, "<html>v2</html>");
        assert!(engine.has_changed(&different, url, &record).await);
    }

    #[tokio::test]
    async fn test_has_changed_error_means_changed() {
        let store = Arc::new(MemoryCacheStore::new());
        let engine = CacheEngine::new(Arc::clone(&store));
        let url = "https://example.com/docs/intro";
        let page = fetched(url, "<html>docs</html>", None);
        engine
            .store_result(url, &page, &scored(url), Tier::Growth)
            .await
            .unwrap();
        let record = engine.lookup(url, Tier::Growth).await.unwrap().unwrap();

        // Nothing scripted: every request errors
        let fetcher = MockFetcher::new();
        assert!(engine.has_changed(&fetcher, url, &record).await);
    }
}
