//! Subscription tiers and their static resource limits.
//!
//! Tiers are a closed enum so an unknown or misspelled tier is a
//! compile-time error rather than a runtime lookup miss. The limits
//! table is deploy-time configuration; it is never mutated at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription level gating page-count and AI-usage budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier: HTML extraction only, smallest page budget
    Starter,
    /// One-time purchase: full AI analysis, no file history
    Coffee,
    /// Subscription: large page budget, file history
    Growth,
    /// Top tier: effectively unbounded, shortest cache lifetime
    Scale,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 4] = [Tier::Starter, Tier::Coffee, Tier::Growth, Tier::Scale];

    /// Static limits for this tier.
    ///
    /// Invariant: `ai_pages_budget <= max_pages_per_analysis` for every
    /// tier (checked by test).
    pub fn limits(self) -> TierLimits {
        match self {
            Tier::Starter => TierLimits {
                daily_analyses: 1,
                max_pages_per_analysis: 20,
                ai_pages_budget: 0,
                cache_duration_days: 30,
                features: TierFeatures {
                    html_extraction: true,
                    ai_analysis: false,
                    file_history: false,
                    priority_support: false,
                    smart_caching: true,
                    api_access: false,
                },
            },
            Tier::Coffee => TierLimits {
                daily_analyses: 999,
                max_pages_per_analysis: 200,
                ai_pages_budget: 200,
                cache_duration_days: 7,
                features: TierFeatures {
                    html_extraction: true,
                    ai_analysis: true,
                    file_history: false,
                    priority_support: false,
                    smart_caching: true,
                    api_access: false,
                },
            },
            Tier::Growth => TierLimits {
                daily_analyses: 999,
                max_pages_per_analysis: 1000,
                ai_pages_budget: 200,
                cache_duration_days: 7,
                features: TierFeatures {
                    html_extraction: true,
                    ai_analysis: true,
                    file_history: true,
                    priority_support: true,
                    smart_caching: true,
                    api_access: false,
                },
            },
            Tier::Scale => TierLimits {
                daily_analyses: 999,
                max_pages_per_analysis: 999_999,
                ai_pages_budget: 999_999,
                cache_duration_days: 3,
                features: TierFeatures {
                    html_extraction: true,
                    ai_analysis: true,
                    file_history: true,
                    priority_support: true,
                    smart_caching: true,
                    api_access: true,
                },
            },
        }
    }

    /// Whether pages analyzed under this tier may consume AI budget.
    pub fn allows_ai(self) -> bool {
        self.limits().features.ai_analysis
    }

    /// The next tier to suggest when a limit is hit, if any.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Starter => Some(Tier::Growth),
            Tier::Coffee => Some(Tier::Growth),
            Tier::Growth => Some(Tier::Scale),
            Tier::Scale => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Starter => "starter",
            Tier::Coffee => "coffee",
            Tier::Growth => "growth",
            Tier::Scale => "scale",
        };
        f.write_str(s)
    }
}

/// Per-tier resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Analyses allowed per user per day
    pub daily_analyses: u32,

    /// Pages analyzed per run after relevance filtering
    pub max_pages_per_analysis: usize,

    /// Pages per run that may be scored with the AI scorer
    pub ai_pages_budget: usize,

    /// Base cache lifetime for results scored under this tier
    pub cache_duration_days: i64,

    /// Feature switches
    pub features: TierFeatures,
}

/// Feature switches per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFeatures {
    pub html_extraction: bool,
    pub ai_analysis: bool,
    pub file_history: bool,
    pub priority_support: bool,
    pub smart_caching: bool,
    pub api_access: bool,
}
