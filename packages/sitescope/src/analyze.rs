//! Batch analysis orchestration.
//!
//! Takes discovered entries through filtering, tier truncation,
//! cache-aware batch processing and final ranking. One run is one
//! call to [`AnalysisOrchestrator::run`]; all cross-batch state is a
//! pair of atomic counters.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::CacheEngine;
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::filter::filter_relevant;
use crate::traits::{CacheStore, PageScorer};
use crate::types::{AnalysisMetrics, DiscoveredPage, SitemapEntry, Tier};

const AI_COST_PER_PAGE: f64 = 0.03;
const HTML_COST_PER_PAGE: f64 = 0.001;
const SECS_SAVED_PER_CACHE_HIT: f64 = 3.0;

/// Tunables for one orchestrator.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Entries per batch
    pub batch_size: usize,

    /// Batches dispatched concurrently per group
    pub concurrent_batches: usize,

    /// Consecutive per-page failures that trip the circuit breaker
    pub max_consecutive_failures: u32,

    /// Pause between batch groups
    pub group_pause: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            concurrent_batches: 2,
            max_consecutive_failures: 10,
            group_pause: Duration::from_millis(300),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_concurrent_batches(mut self, batches: usize) -> Self {
        self.concurrent_batches = batches.max(1);
        self
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    pub fn with_group_pause(mut self, pause: Duration) -> Self {
        self.group_pause = pause;
        self
    }
}

/// Output of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Scored pages, best first
    pub pages: Vec<DiscoveredPage>,

    /// Counters for the run
    pub metrics: AnalysisMetrics,

    /// Whether the bot-protection circuit breaker stopped the run early
    pub tripped: bool,
}

/// One batch's contribution, merged by the caller.
struct BatchOutcome {
    pages: Vec<DiscoveredPage>,
    metrics: AnalysisMetrics,
}

/// Drives filtered entries through the cache and scorer in paced,
/// concurrent batches.
pub struct AnalysisOrchestrator<F: Fetcher, S: CacheStore, P: PageScorer> {
    fetcher: Arc<F>,
    cache: Arc<CacheEngine<S>>,
    scorer: Arc<P>,
    config: AnalysisConfig,
}

impl<F: Fetcher, S: CacheStore, P: PageScorer> AnalysisOrchestrator<F, S, P> {
    pub fn new(fetcher: Arc<F>, cache: Arc<CacheEngine<S>>, scorer: Arc<P>) -> Self {
        Self {
            fetcher,
            cache,
            scorer,
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze discovered entries under a tier.
    ///
    /// Per-page failures degrade rather than abort; ten consecutive
    /// failures read as bot protection and stop further batch groups,
    /// with in-flight batches still contributing.
    pub async fn run(&self, entries: Vec<SitemapEntry>, tier: Tier) -> AnalysisReport {
        let started = Instant::now();

        let mut selected = filter_relevant(entries);
        let limit = tier.limits().max_pages_per_analysis;
        if selected.len() > limit {
            debug!(selected = selected.len(), limit, "Truncating to tier page cap");
            selected.truncate(limit);
        }

        let mut metrics = AnalysisMetrics {
            total_pages: selected.len(),
            ..Default::default()
        };

        info!(
            pages = selected.len(),
            tier = %tier,
            "Starting analysis run"
        );

        let consecutive_failures = AtomicU32::new(0);
        let ai_reserved = AtomicUsize::new(0);

        let mut pages: Vec<DiscoveredPage> = Vec::with_capacity(selected.len());
        let mut tripped = false;

        let batches: Vec<&[SitemapEntry]> = selected.chunks(self.config.batch_size).collect();
        let mut groups = batches.chunks(self.config.concurrent_batches).peekable();

        while let Some(group) = groups.next() {
            if consecutive_failures.load(Ordering::SeqCst) >= self.config.max_consecutive_failures {
                warn!("Circuit breaker open, skipping remaining batches");
                tripped = true;
                break;
            }

            let outcomes = futures::future::join_all(group.iter().map(|batch| {
                self.process_batch(batch, tier, &consecutive_failures, &ai_reserved)
            }))
            .await;

            for outcome in outcomes {
                pages.extend(outcome.pages);
                metrics.merge(&outcome.metrics);
            }

            if groups.peek().is_some() {
                tokio::time::sleep(self.config.group_pause).await;
            }
        }

        if !tripped
            && consecutive_failures.load(Ordering::SeqCst) >= self.config.max_consecutive_failures
        {
            tripped = true;
        }

        pages.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
        metrics.finalize(started.elapsed().as_secs_f64());

        info!(
            pages = pages.len(),
            cached = metrics.cached_pages,
            analyzed = metrics.analyzed_pages,
            ai_calls = metrics.ai_calls_used,
            tripped,
            "Analysis run finished"
        );

        AnalysisReport {
            pages,
            metrics,
            tripped,
        }
    }

    async fn process_batch(
        &self,
        batch: &[SitemapEntry],
        tier: Tier,
        consecutive_failures: &AtomicU32,
        ai_reserved: &AtomicUsize,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            pages: Vec::with_capacity(batch.len()),
            metrics: AnalysisMetrics::default(),
        };

        for entry in batch {
            if consecutive_failures.load(Ordering::SeqCst) >= self.config.max_consecutive_failures {
                warn!(url = %entry.url, "Circuit breaker open, abandoning rest of batch");
                break;
            }

            if let Some(page) = self.try_cached(entry, tier).await {
                outcome.pages.push(page);
                outcome.metrics.cached_pages += 1;
                outcome.metrics.time_saved_secs += SECS_SAVED_PER_CACHE_HIT;
                consecutive_failures.store(0, Ordering::SeqCst);
                continue;
            }

            match self.analyze_fresh(entry, tier, ai_reserved).await {
                Ok((page, used_ai)) => {
                    outcome.pages.push(page);
                    outcome.metrics.analyzed_pages += 1;
                    if used_ai {
                        outcome.metrics.ai_calls_used += 1;
                        outcome.metrics.estimated_cost += AI_COST_PER_PAGE;
                    } else {
                        outcome.metrics.html_extractions_used += 1;
                        outcome.metrics.estimated_cost += HTML_COST_PER_PAGE;
                    }
                    consecutive_failures.store(0, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "Page analysis failed, recording degraded result");
                    outcome
                        .pages
                        .push(DiscoveredPage::degraded(&entry.url, entry.last_modified));
                    consecutive_failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        outcome
    }

    /// Serve from cache when the record is fresh and the live page has
    /// not changed.
    async fn try_cached(&self, entry: &SitemapEntry, tier: Tier) -> Option<DiscoveredPage> {
        let record = match self.cache.lookup(&entry.url, tier).await {
            Ok(found) => found?,
            Err(e) => {
                warn!(url = %entry.url, error = %e, "Cache lookup failed, analyzing fresh");
                return None;
            }
        };

        if self
            .cache
            .has_changed(self.fetcher.as_ref(), &entry.url, &record)
            .await
        {
            debug!(url = %entry.url, "Cached page changed, re-analyzing");
            return None;
        }

        Some(record.scored_result)
    }

    async fn analyze_fresh(
        &self,
        entry: &SitemapEntry,
        tier: Tier,
        ai_reserved: &AtomicUsize,
    ) -> Result<(DiscoveredPage, bool), PipelineError> {
        let fetched = self.fetcher.fetch(&entry.url).await?;

        let enhanced = self.scorer.uses_ai()
            && tier.allows_ai()
            && reserve_ai_call(ai_reserved, tier.limits().ai_pages_budget);

        let analysis = self
            .scorer
            .score(&fetched.final_url, &fetched.body, enhanced)
            .await?
            .clamped();

        let page = DiscoveredPage::from_analysis(&entry.url, &analysis)
            .with_last_modified(entry.last_modified);

        if let Err(e) = self.cache.store_result(&entry.url, &fetched, &page, tier).await {
            warn!(url = %entry.url, error = %e, "Failed to cache scored page");
        }

        Ok((page, enhanced))
    }
}

/// Reserve one AI call against the budget. Atomic so concurrent
/// batches cannot overshoot.
fn reserve_ai_call(reserved: &AtomicUsize, budget: usize) -> bool {
    reserved
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            (current < budget).then_some(current + 1)
        })
        .is_ok()
}
