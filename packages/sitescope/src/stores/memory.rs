//! In-memory store implementations.
//!
//! Suitable for tests, the dev CLI and single-process deployments.
//! State is owned by the instance and shared only through `Arc`, so
//! tests can inspect and reset it without touching globals.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::PipelineError;
use crate::traits::{CacheStore, UsageStore};
use crate::types::{CacheRecord, CacheStats, Tier, UrlHash};

/// `CacheStore` backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct MemoryCacheStore {
    records: RwLock<HashMap<(UrlHash, Tier), CacheRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, across all tiers.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.records.write().expect("lock poisoned").clear();
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(
        &self,
        url_hash: &UrlHash,
        tier: Tier,
    ) -> Result<Option<CacheRecord>, PipelineError> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.get(&(url_hash.clone(), tier)).cloned())
    }

    async fn upsert(&self, record: CacheRecord) -> Result<(), PipelineError> {
        let mut records = self.records.write().expect("lock poisoned");
        records.insert((record.url_hash.clone(), record.tier), record);
        Ok(())
    }

    async fn record_hit(&self, url_hash: &UrlHash, tier: Tier) -> Result<(), PipelineError> {
        let mut records = self.records.write().expect("lock poisoned");
        if let Some(record) = records.get_mut(&(url_hash.clone(), tier)) {
            record.hit_count += 1;
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, PipelineError> {
        let mut records = self.records.write().expect("lock poisoned");
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok((before - records.len()) as u64)
    }

    async fn stats(&self, tier: Tier, now: DateTime<Utc>) -> Result<CacheStats, PipelineError> {
        let records = self.records.read().expect("lock poisoned");
        let mut stats = CacheStats::default();
        for record in records.values().filter(|r| r.tier == tier) {
            stats.total_entries += 1;
            stats.total_hits += u64::from(record.hit_count);
            if record.is_expired(now) {
                stats.expired_entries += 1;
            } else {
                stats.active_entries += 1;
            }
        }
        Ok(stats)
    }
}

/// `UsageStore` backed by a `RwLock<HashMap>` keyed by user and day.
#[derive(Default)]
pub struct MemoryUsageStore {
    usage: RwLock<HashMap<(String, NaiveDate), (u32, u32)>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total AI calls recorded for a user on a day.
    pub fn ai_calls(&self, user: &str, date: NaiveDate) -> u32 {
        let usage = self.usage.read().expect("lock poisoned");
        usage
            .get(&(user.to_string(), date))
            .map(|(_, ai)| *ai)
            .unwrap_or(0)
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn analyses_today(&self, user: &str, date: NaiveDate) -> Result<u32, PipelineError> {
        let usage = self.usage.read().expect("lock poisoned");
        Ok(usage
            .get(&(user.to_string(), date))
            .map(|(analyses, _)| *analyses)
            .unwrap_or(0))
    }

    async fn record_analysis(
        &self,
        user: &str,
        date: NaiveDate,
        ai_calls: u32,
    ) -> Result<(), PipelineError> {
        let mut usage = self.usage.write().expect("lock poisoned");
        let entry = usage.entry((user.to_string(), date)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += ai_calls;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentHash, DiscoveredPage, PageAnalysis};
    use chrono::Duration;

    fn record(url: &str, tier: Tier, expired: bool) -> CacheRecord {
        let now = Utc::now();
        let analysis = PageAnalysis {
            title: "Title".to_string(),
            description: "Description".to_string(),
            quality_score: 7.0,
            category: "Documentation".to_string(),
            relevance: 7.0,
        };
        CacheRecord {
            url: url.to_string(),
            url_hash: UrlHash::from_url(url),
            content_hash: ContentHash::from_content("body"),
            last_modified_header: None,
            etag: None,
            scored_result: DiscoveredPage::from_analysis(url, &analysis),
            tier,
            cached_at: now,
            expires_at: if expired {
                now - Duration::hours(1)
            } else {
                now + Duration::days(7)
            },
            hit_count: 0,
        }
    }

    #[tokio::test]
    async fn test_tiers_do_not_share_records() {
        let store = MemoryCacheStore::new();
        let rec = record("https://example.com/docs", Tier::Growth, false);
        let hash = rec.url_hash.clone();
        store.upsert(rec).await.unwrap();

        assert!(store.get(&hash, Tier::Growth).await.unwrap().is_some());
        assert!(store.get(&hash, Tier::Starter).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_hit_increments() {
        let store = MemoryCacheStore::new();
        let rec = record("https://example.com/docs", Tier::Coffee, false);
        let hash = rec.url_hash.clone();
        store.upsert(rec).await.unwrap();

        store.record_hit(&hash, Tier::Coffee).await.unwrap();
        store.record_hit(&hash, Tier::Coffee).await.unwrap();
        let fetched = store.get(&hash, Tier::Coffee).await.unwrap().unwrap();
        assert_eq!(fetched.hit_count, 2);
    }

    #[tokio::test]
    async fn test_delete_expired_and_stats() {
        let store = MemoryCacheStore::new();
        store
            .upsert(record("https://example.com/a", Tier::Growth, false))
            .await
            .unwrap();
        store
            .upsert(record("https://example.com/b", Tier::Growth, true))
            .await
            .unwrap();

        let now = Utc::now();
        let stats = store.stats(Tier::Growth, now).await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.active_entries, 1);
        assert_eq!(stats.expired_entries, 1);

        let removed = store.delete_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_usage_accumulates_per_day() {
        let store = MemoryUsageStore::new();
        let today = Utc::now().date_naive();
        assert_eq!(store.analyses_today("user@example.com", today).await.unwrap(), 0);

        store
            .record_analysis("user@example.com", today, 12)
            .await
            .unwrap();
        store
            .record_analysis("user@example.com", today, 3)
            .await
            .unwrap();

        assert_eq!(store.analyses_today("user@example.com", today).await.unwrap(), 2);
        assert_eq!(store.ai_calls("user@example.com", today), 15);
        assert_eq!(store.analyses_today("other@example.com", today).await.unwrap(), 0);
    }
}
