//! One-shot analysis runs against live sites, for development.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use secrecy::SecretString;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use sitescope::analyze::{AnalysisOrchestrator, AnalysisReport};
use sitescope::cache::CacheEngine;
use sitescope::discovery::DiscoveryEngine;
use sitescope::fetcher::{Fetcher, HttpFetcher, RateLimitedFetcher};
use sitescope::scorers::{HtmlScorer, OpenAiScorer};
use sitescope::stores::{MemoryCacheStore, MemoryUsageStore};
use sitescope::traits::PageScorer;
use sitescope::types::{SitemapEntry, Tier};
use sitescope::usage::{estimate_analysis_cost, UsageTracker};

#[derive(Parser, Debug)]
#[command(name = "sitescope", about = "Discover and score the pages of a website")]
struct Args {
    /// Site URL to analyze
    url: String,

    /// Subscription tier to run under: starter, coffee, growth or scale
    #[arg(long, default_value = "growth")]
    tier: String,

    /// User identity for usage accounting
    #[arg(long, default_value = "dev@localhost")]
    user: String,

    /// Outbound requests per second
    #[arg(long, default_value_t = 5)]
    rps: u32,

    /// Use the OpenAI scorer (requires OPENAI_API_KEY)
    #[arg(long)]
    ai: bool,

    /// Only print the top N pages
    #[arg(long)]
    top: Option<usize>,
}

fn parse_tier(raw: &str) -> Result<Tier> {
    match raw.to_lowercase().as_str() {
        "starter" => Ok(Tier::Starter),
        "coffee" => Ok(Tier::Coffee),
        "growth" => Ok(Tier::Growth),
        "scale" => Ok(Tier::Scale),
        other => bail!("unknown tier '{other}' (expected starter, coffee, growth or scale)"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let tier = parse_tier(&args.tier)?;

    let fetcher = Arc::new(RateLimitedFetcher::new(HttpFetcher::new(), args.rps));

    println!("{} {}", "Discovering".bright_cyan().bold(), args.url);
    let discovery = DiscoveryEngine::new(Arc::clone(&fetcher));
    let found = discovery.discover(&args.url).await;
    println!(
        "  {} via {} ({} entries)",
        found.message,
        found.method.to_string().bright_yellow(),
        found.entries.len()
    );

    let usage = UsageTracker::new(Arc::new(MemoryUsageStore::new()));
    let check = usage.check_limits(&args.user, tier, found.entries.len()).await;
    if !check.allowed {
        let reason = check.reason.unwrap_or_else(|| "limit reached".to_string());
        println!("{} {reason}", "Refused:".bright_red().bold());
        if let Some(upgrade) = check.suggested_upgrade {
            println!("  Consider upgrading to the {upgrade} tier.");
        }
        return Ok(());
    }

    let estimated = estimate_analysis_cost(found.entries.len(), tier, 0);
    println!(
        "{} {} pages under the {} tier (~${estimated:.2})",
        "Analyzing".bright_cyan().bold(),
        found.entries.len().min(tier.limits().max_pages_per_analysis),
        tier.to_string().bright_yellow(),
    );

    let report = if args.ai {
        let key = std::env::var("OPENAI_API_KEY")
            .context("--ai requires OPENAI_API_KEY in the environment")?;
        let scorer = OpenAiScorer::new(SecretString::from(key));
        run(fetcher, Arc::new(scorer), found.entries, tier).await
    } else {
        run(fetcher, Arc::new(HtmlScorer::new()), found.entries, tier).await
    };

    usage.record_run(&args.user, &report.metrics).await;
    print_report(&report, args.top);
    Ok(())
}

async fn run<F, P>(
    fetcher: Arc<F>,
    scorer: Arc<P>,
    entries: Vec<SitemapEntry>,
    tier: Tier,
) -> AnalysisReport
where
    F: Fetcher,
    P: PageScorer,
{
    let cache = Arc::new(CacheEngine::new(Arc::new(MemoryCacheStore::new())));
    AnalysisOrchestrator::new(fetcher, cache, scorer)
        .run(entries, tier)
        .await
}

fn print_report(report: &AnalysisReport, top: Option<usize>) {
    println!();
    let shown = top.unwrap_or(report.pages.len());
    for page in report.pages.iter().take(shown) {
        let score = format!("{:>4.1}", page.quality_score);
        let score = if page.quality_score >= 7.0 {
            score.bright_green()
        } else if page.quality_score >= 4.0 {
            score.bright_yellow()
        } else {
            score.bright_red()
        };
        println!("{score}  [{}] {}", page.category, page.url.bold());
        println!("      {} - {}", page.title, page.description);
    }

    let m = &report.metrics;
    println!();
    println!(
        "{} {} pages in {:.1}s ({} analyzed, {} cached, {} AI calls, ~${:.2})",
        "Done:".bright_cyan().bold(),
        m.total_pages,
        m.processing_time_secs,
        m.analyzed_pages,
        m.cached_pages,
        m.ai_calls_used,
        m.estimated_cost,
    );
    if report.tripped {
        println!(
            "{}",
            "Run stopped early: repeated failures suggest bot protection.".bright_red()
        );
    }
}
