//! Discovery input types - sitemap entries and discovery provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suggested change frequency from a sitemap `<changefreq>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl FromStr for ChangeFrequency {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            _ => Err(()),
        }
    }
}

/// A single URL discovered for a site.
///
/// Produced by the discovery engine from a sitemap, robots.txt
/// directive, or crawl fallback. Immutable once produced; identity is
/// the URL string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapEntry {
    /// Page URL
    pub url: String,

    /// `<lastmod>` value or Last-Modified header, if known
    pub last_modified: Option<DateTime<Utc>>,

    /// `<changefreq>` value, if present
    pub change_frequency: Option<ChangeFrequency>,

    /// `<priority>` value (0.0 to 1.0), if present
    pub priority: Option<f32>,
}

impl SitemapEntry {
    /// Create an entry with just a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_modified: None,
            change_frequency: None,
            priority: None,
        }
    }

    /// Set the last-modified timestamp.
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Set the sitemap priority.
    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the change frequency.
    pub fn with_change_frequency(mut self, freq: ChangeFrequency) -> Self {
        self.change_frequency = Some(freq);
        self
    }
}

/// Which fallback tier produced a discovery result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
    /// A sitemap at a canonical location
    Sitemap,
    /// A sitemap declared in robots.txt
    RobotsTxt,
    /// Single-page-app heuristic matched; homepage only
    HomepageOnly,
    /// Best-effort link crawl
    FallbackCrawl,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sitemap => "sitemap",
            Self::RobotsTxt => "robots.txt",
            Self::HomepageOnly => "homepage-only",
            Self::FallbackCrawl => "fallback-crawl",
        };
        f.write_str(s)
    }
}

/// Result of one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Discovered URL entries
    pub entries: Vec<SitemapEntry>,

    /// Whether a real sitemap document was found
    pub sitemap_found: bool,

    /// Which strategy produced the entries
    pub method: DiscoveryMethod,

    /// Human-readable summary of how the run went
    pub message: String,
}
