use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::PipelineError;
use crate::types::{CacheRecord, CacheStats, Tier, UrlHash};

/// Persistence seam for scored-page records, keyed by `(url_hash, tier)`.
///
/// Higher tiers never read records written for other tiers; the key
/// shape enforces that at the storage boundary rather than in call
/// sites.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the record for a URL under a tier, expired or not.
    /// Expiry policy lives in the cache engine, not the store.
    async fn get(&self, url_hash: &UrlHash, tier: Tier)
        -> Result<Option<CacheRecord>, PipelineError>;

    /// Insert or replace the record for `(record.url_hash, record.tier)`.
    async fn upsert(&self, record: CacheRecord) -> Result<(), PipelineError>;

    /// Increment the hit counter for a record, if present.
    async fn record_hit(&self, url_hash: &UrlHash, tier: Tier) -> Result<(), PipelineError>;

    /// Remove all records whose `expires_at` is at or before `now`.
    /// Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, PipelineError>;

    /// Aggregate counters for one tier.
    async fn stats(&self, tier: Tier, now: DateTime<Utc>) -> Result<CacheStats, PipelineError>;
}

/// Per-user, per-day analysis accounting.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Analyses already started by this user today.
    async fn analyses_today(&self, user: &str, date: NaiveDate) -> Result<u32, PipelineError>;

    /// Record one started analysis and its AI call count.
    async fn record_analysis(
        &self,
        user: &str,
        date: NaiveDate,
        ai_calls: u32,
    ) -> Result<(), PipelineError>;
}
