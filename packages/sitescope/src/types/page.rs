//! Analysis output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of scoring one page's content.
///
/// This is what a [`PageScorer`](crate::traits::PageScorer) returns;
/// the orchestrator merges it with the originating entry to build a
/// [`DiscoveredPage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// Page title
    pub title: String,

    /// Short description of the page content
    pub description: String,

    /// Content quality, 1.0 to 10.0
    pub quality_score: f32,

    /// Content category (Documentation, Tutorial, Blog, ...)
    pub category: String,

    /// Relevance for downstream consumers, 1.0 to 10.0
    pub relevance: f32,
}

impl PageAnalysis {
    /// Clamp score fields into the 1-10 contract range.
    pub fn clamped(mut self) -> Self {
        self.quality_score = self.quality_score.clamp(1.0, 10.0);
        self.relevance = self.relevance.clamp(1.0, 10.0);
        self
    }
}

/// A fully analyzed page - the externally consumed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    /// Page URL
    pub url: String,

    /// Page title
    pub title: String,

    /// Short description of the page content
    pub description: String,

    /// Content quality, 1.0 to 10.0
    pub quality_score: f32,

    /// Content category
    pub category: String,

    /// Last-modified timestamp from discovery, if known
    pub last_modified: Option<DateTime<Utc>>,
}

impl DiscoveredPage {
    /// Build a page from a scorer analysis.
    pub fn from_analysis(url: impl Into<String>, analysis: &PageAnalysis) -> Self {
        Self {
            url: url.into(),
            title: analysis.title.clone(),
            description: analysis.description.clone(),
            quality_score: analysis.quality_score,
            category: analysis.category.clone(),
            last_modified: None,
        }
    }

    /// Degraded placeholder for a page that could not be analyzed.
    pub fn degraded(url: impl Into<String>, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            url: url.into(),
            title: "Analysis Failed".to_string(),
            description: "Unable to analyze this page".to_string(),
            quality_score: 1.0,
            category: "Error".to_string(),
            last_modified,
        }
    }

    /// Set the last-modified timestamp.
    pub fn with_last_modified(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_modified = at;
        self
    }
}
