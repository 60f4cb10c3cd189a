//! Run metrics accumulated during one analysis.

use serde::{Deserialize, Serialize};

/// Counters for one orchestration run.
///
/// Informational only; nothing reads these for control flow. Batches
/// produce their own partial counters which a single reducer merges
/// after the batches complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Pages selected for this run (after filtering and truncation)
    pub total_pages: usize,

    /// Pages served from cache
    pub cached_pages: usize,

    /// Pages freshly fetched and scored
    pub analyzed_pages: usize,

    /// Scorer invocations in enhanced (AI) mode
    pub ai_calls_used: usize,

    /// Scorer invocations in HTML-only mode
    pub html_extractions_used: usize,

    /// Rough cost of this run in dollars
    pub estimated_cost: f64,

    /// Seconds of fetch+score work avoided by cache hits
    pub time_saved_secs: f64,

    /// Whether any page came from cache
    pub cache_hit: bool,

    /// Wall-clock duration of the run in seconds
    pub processing_time_secs: f64,

    /// Total scorer invocations (AI + HTML)
    pub api_calls: usize,

    /// Rough dollar estimate of what cache hits saved
    pub cost_saved: f64,
}

impl AnalysisMetrics {
    /// Fold another batch's counters into this one.
    pub fn merge(&mut self, other: &AnalysisMetrics) {
        self.cached_pages += other.cached_pages;
        self.analyzed_pages += other.analyzed_pages;
        self.ai_calls_used += other.ai_calls_used;
        self.html_extractions_used += other.html_extractions_used;
        self.estimated_cost += other.estimated_cost;
        self.time_saved_secs += other.time_saved_secs;
    }

    /// Fill in the derived fields once all batches are merged.
    pub fn finalize(&mut self, processing_time_secs: f64) {
        self.processing_time_secs = processing_time_secs;
        self.cache_hit = self.cached_pages > 0;
        self.api_calls = self.ai_calls_used + self.html_extractions_used;
        self.cost_saved = self.time_saved_secs * 0.01;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_finalize() {
        let mut total = AnalysisMetrics {
            total_pages: 10,
            ..Default::default()
        };
        let batch_a = AnalysisMetrics {
            cached_pages: 3,
            analyzed_pages: 2,
            ai_calls_used: 1,
            html_extractions_used: 1,
            time_saved_secs: 9.0,
            ..Default::default()
        };
        let batch_b = AnalysisMetrics {
            analyzed_pages: 5,
            html_extractions_used: 5,
            ..Default::default()
        };

        total.merge(&batch_a);
        total.merge(&batch_b);
        total.finalize(1.5);

        assert_eq!(total.cached_pages, 3);
        assert_eq!(total.analyzed_pages, 7);
        assert_eq!(total.api_calls, 7);
        assert!(total.cache_hit);
        assert_eq!(total.processing_time_secs, 1.5);
    }
}
