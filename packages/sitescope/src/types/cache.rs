//! Cache record types and content hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::canonicalize_url;
use super::page::DiscoveredPage;
use super::tier::Tier;

/// SHA-256 hash of a canonicalized URL; half of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UrlHash(String);

impl UrlHash {
    /// Hash a URL after canonicalization.
    pub fn from_url(url: &str) -> Self {
        let canonical = canonicalize_url(url);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// SHA-256 hash of page content, used for change detection when no
/// HTTP validators are available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_content(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One cached scoring result, keyed by `(url_hash, tier)`.
///
/// Tiers never share entries: AI-enhanced and HTML-only results differ
/// in content, and tier cache lifetimes differ. Owned exclusively by
/// the cache engine; callers never mutate a record directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Original (canonical) URL
    pub url: String,

    /// Key half: hash of the canonical URL
    pub url_hash: UrlHash,

    /// Hash of the content that produced `scored_result`
    pub content_hash: ContentHash,

    /// Last-Modified response header at scoring time, if any
    pub last_modified_header: Option<String>,

    /// ETag response header at scoring time, if any
    pub etag: Option<String>,

    /// The scored page, preserved verbatim on cache hits
    pub scored_result: DiscoveredPage,

    /// Key half: tier the result was scored under
    pub tier: Tier,

    /// When the record was created or last refreshed
    pub cached_at: DateTime<Utc>,

    /// When the record stops being served
    pub expires_at: DateTime<Utc>,

    /// Hits since creation or last refresh
    pub hit_count: u32,
}

impl CacheRecord {
    /// Whether this record has passed its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the record carries any HTTP validator.
    pub fn has_validators(&self) -> bool {
        self.last_modified_header.is_some() || self.etag.is_some()
    }
}

/// Aggregate cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_hits: u64,
    pub active_entries: usize,
    pub expired_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_hash_is_canonical() {
        // Trailing slash and case differences collapse to one key
        assert_eq!(
            UrlHash::from_url("https://Example.com/Docs/"),
            UrlHash::from_url("https://example.com/docs")
        );
        assert_ne!(
            UrlHash::from_url("https://example.com/docs"),
            UrlHash::from_url("https://example.com/api")
        );
    }

    #[test]
    fn test_content_hash_detects_change() {
        let h1 = ContentHash::from_content("<html>v1</html>");
        let h2 = ContentHash::from_content("<html>v2</html>");
        assert_ne!(h1, h2);
        assert_eq!(h1, ContentHash::from_content("<html>v1</html>"));
    }
}
