//! Per-user daily usage accounting and pre-flight limit checks.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::traits::UsageStore;
use crate::types::{AnalysisMetrics, Tier, TierLimits};

/// Outcome of a pre-flight limit check.
#[derive(Debug, Clone)]
pub struct UsageCheck {
    /// Whether the analysis may start
    pub allowed: bool,

    /// Human-readable refusal reason when not allowed
    pub reason: Option<String>,

    /// Analyses the user has already started today
    pub analyses_today: u32,

    /// The limits the check ran against
    pub limits: TierLimits,

    /// Tier that would lift the limit that refused, if any
    pub suggested_upgrade: Option<Tier>,
}

impl UsageCheck {
    fn allowed(analyses_today: u32, limits: TierLimits) -> Self {
        Self {
            allowed: true,
            reason: None,
            analyses_today,
            limits,
            suggested_upgrade: None,
        }
    }
}

/// Checks and records usage against an injected store.
pub struct UsageTracker<U: UsageStore> {
    store: Arc<U>,
}

impl<U: UsageStore> UsageTracker<U> {
    pub fn new(store: Arc<U>) -> Self {
        Self { store }
    }

    /// Decide whether a user may run an analysis of `requested_pages`.
    ///
    /// Store failures fail open: a broken usage store must not block
    /// analyses, so the check allows and logs.
    pub async fn check_limits(&self, user: &str, tier: Tier, requested_pages: usize) -> UsageCheck {
        let limits = tier.limits();
        let today = Utc::now().date_naive();

        let analyses_today = match self.store.analyses_today(user, today).await {
            Ok(count) => count,
            Err(e) => {
                warn!(user = %user, error = %e, "Usage store unavailable, allowing analysis");
                return UsageCheck::allowed(0, limits);
            }
        };

        if analyses_today >= limits.daily_analyses {
            return UsageCheck {
                allowed: false,
                reason: Some(format!(
                    "Daily limit reached. The {tier} tier allows {} analyses per day.",
                    limits.daily_analyses
                )),
                analyses_today,
                limits,
                suggested_upgrade: tier.next(),
            };
        }

        if requested_pages > limits.max_pages_per_analysis {
            return UsageCheck {
                allowed: false,
                reason: Some(format!(
                    "Too many pages requested. The {tier} tier allows at most {} pages per analysis.",
                    limits.max_pages_per_analysis
                )),
                analyses_today,
                limits,
                suggested_upgrade: tier.next(),
            };
        }

        UsageCheck::allowed(analyses_today, limits)
    }

    /// Record a completed run. Best-effort, like the check.
    pub async fn record_run(&self, user: &str, metrics: &AnalysisMetrics) {
        let today = Utc::now().date_naive();
        match self
            .store
            .record_analysis(user, today, metrics.ai_calls_used as u32)
            .await
        {
            Ok(()) => info!(
                user = %user,
                pages = metrics.total_pages,
                ai_calls = metrics.ai_calls_used,
                cache_hits = metrics.cached_pages,
                "Recorded analysis usage"
            ),
            Err(e) => warn!(user = %user, error = %e, "Failed to record analysis usage"),
        }
    }
}

/// Cost estimate for an analysis before it runs.
///
/// Cache hits are free; of the remainder, AI covers up to the tier's
/// budget and HTML extraction the rest.
pub fn estimate_analysis_cost(pages: usize, tier: Tier, cache_hits: usize) -> f64 {
    const AI_COST_PER_PAGE: f64 = 0.03;
    const HTML_COST_PER_PAGE: f64 = 0.001;

    let limits = tier.limits();
    let uncached = pages.saturating_sub(cache_hits);
    let ai_pages = if tier.allows_ai() {
        uncached.min(limits.ai_pages_budget)
    } else {
        0
    };
    let html_pages = uncached - ai_pages;

    (ai_pages as f64) * AI_COST_PER_PAGE + (html_pages as f64) * HTML_COST_PER_PAGE
}
