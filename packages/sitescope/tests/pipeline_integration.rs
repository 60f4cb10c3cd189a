//! End-to-end pipeline scenarios: discovery through analysis against
//! a scripted fetcher, no network.

use std::sync::Arc;
use std::time::Duration;

use sitescope::analyze::{AnalysisConfig, AnalysisOrchestrator};
use sitescope::cache::CacheEngine;
use sitescope::discovery::DiscoveryEngine;
use sitescope::stores::MemoryCacheStore;
use sitescope::testing::{MockFetcher, MockScorer};
use sitescope::types::{DiscoveryMethod, PageAnalysis, SitemapEntry, Tier};

const SITE: &str = "https://widgets.test";

fn sitemap_xml(paths: &[&str]) -> String {
    let urls: String = paths
        .iter()
        .map(|p| format!("<url><loc>{SITE}{p}</loc><priority>0.8</priority></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{urls}</urlset>"#
    )
}

fn content_page(title: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head>\
         <body><p>Substantial body text for {title}.</p></body></html>"
    )
}

fn analysis(score: f32) -> PageAnalysis {
    PageAnalysis {
        title: "Scored".to_string(),
        description: "Scripted description long enough to count.".to_string(),
        quality_score: score,
        category: "Documentation".to_string(),
        relevance: score,
    }
}

fn pipeline(
    fetcher: Arc<MockFetcher>,
    scorer: MockScorer,
) -> AnalysisOrchestrator<MockFetcher, MemoryCacheStore, MockScorer> {
    let cache = Arc::new(CacheEngine::new(Arc::new(MemoryCacheStore::new())));
    AnalysisOrchestrator::new(fetcher, cache, Arc::new(scorer))
        .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)))
}

#[tokio::test]
async fn sitemap_site_is_discovered_and_ranked() {
    let paths = ["/docs/a", "/docs/b", "/guides/c", "/blog/d", "/about"];
    let mut fetcher = MockFetcher::new().with_page(
        format!("{SITE}/sitemap.xml"),
        sitemap_xml(&paths),
    );
    let mut scorer = MockScorer::new();
    for (i, path) in paths.iter().enumerate() {
        let url = format!("{SITE}{path}");
        fetcher = fetcher.with_page(&url, content_page(path));
        scorer = scorer.with_analysis(&url, analysis(4.0 + i as f32));
    }
    // The discovery engine HEADs the sitemap before fetching it
    let fetcher = Arc::new(fetcher.with_head_status(format!("{SITE}/sitemap.xml"), 200));

    let discovery = DiscoveryEngine::new(Arc::clone(&fetcher));
    let found = discovery.discover(SITE).await;
    assert!(found.sitemap_found);
    assert_eq!(found.method, DiscoveryMethod::Sitemap);
    assert_eq!(found.entries.len(), 5);

    let report = pipeline(fetcher, scorer).run(found.entries, Tier::Growth).await;
    assert_eq!(report.pages.len(), 5);
    assert_eq!(report.metrics.total_pages, 5);
    assert_eq!(report.metrics.analyzed_pages, 5);
    // Descending quality order
    for pair in report.pages.windows(2) {
        assert!(pair[0].quality_score >= pair[1].quality_score);
    }
    assert_eq!(report.pages[0].url, format!("{SITE}/about"));
}

#[tokio::test]
async fn robots_directive_supplies_the_sitemap() {
    let sitemap_url = format!("{SITE}/hidden/map.xml");
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page(
                format!("{SITE}/robots.txt"),
                format!("User-agent: *\nSitemap: {sitemap_url}\n"),
            )
            .with_page(&sitemap_url, sitemap_xml(&["/docs/a", "/docs/b"])),
    );

    let found = DiscoveryEngine::new(fetcher).discover(SITE).await;
    assert!(found.sitemap_found);
    assert_eq!(found.method, DiscoveryMethod::RobotsTxt);
    assert_eq!(found.entries.len(), 2);
}

#[tokio::test]
async fn spa_homepage_collapses_to_a_single_entry() {
    let homepage = r#"<html><head><title>Board, the planning app</title></head>
        <body><div id="root"></div><script src="/bundle.js"></script></body></html>"#;
    let fetcher = Arc::new(MockFetcher::new().with_page(format!("{SITE}/"), homepage));

    // No sitemap, no robots.txt: both strategies miss, the heuristic
    // fires on the third
    let found = DiscoveryEngine::new(fetcher).discover(&format!("{SITE}/")).await;
    assert_eq!(found.method, DiscoveryMethod::HomepageOnly);
    assert!(!found.sitemap_found);
    assert_eq!(found.entries.len(), 1);
    assert!(found.message.contains("single-page"));
}

#[tokio::test]
async fn crawl_fallback_validates_candidates_and_never_returns_empty() {
    let homepage = format!(
        r#"<html><head><title>Widgets, thoroughly documented and indexed</title></head>
        <body>
        <nav><a href="/docs">Docs</a><a href="/pricing">Pricing</a>
        <a href="/blog">Blog</a><a href="/team">Team</a><a href="/contact">Contact</a></nav>
        <div class="breadcrumb">home</div><div class="pagination">1 2 3</div>
        <p>Server-rendered marketing copy with plenty of links.</p>
        <a href="/features">Features</a><a href="/download">Download</a>
        </body></html>"#
    );
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page(SITE, &homepage)
            .with_page(format!("{SITE}/"), &homepage)
            .with_head_status(format!("{SITE}/docs"), 200)
            .with_head_status(format!("{SITE}/pricing"), 200)
            .with_head_status(format!("{SITE}/"), 200),
    );

    let found = DiscoveryEngine::new(Arc::clone(&fetcher)).discover(SITE).await;
    assert_eq!(found.method, DiscoveryMethod::FallbackCrawl);
    assert!(!found.sitemap_found);

    let urls: Vec<&str> = found.entries.iter().map(|e| e.url.as_str()).collect();
    assert!(urls.contains(&format!("{SITE}/docs").as_str()));
    assert!(urls.contains(&format!("{SITE}/pricing").as_str()));
    // Candidates whose HEAD probe failed are dropped
    assert!(!urls.iter().any(|u| u.ends_with("/blog")));

    // The root keeps top priority, other survivors sit below it
    let root = found
        .entries
        .iter()
        .find(|e| e.url == format!("{SITE}/"))
        .expect("root entry");
    assert_eq!(root.priority, Some(1.0));
    let docs = found
        .entries
        .iter()
        .find(|e| e.url.ends_with("/docs"))
        .expect("docs entry");
    assert_eq!(docs.priority, Some(0.8));
}

#[tokio::test]
async fn unreachable_site_still_yields_the_base_url() {
    // Nothing scripted at all: every strategy fails
    let fetcher = Arc::new(MockFetcher::new());
    let found = DiscoveryEngine::new(fetcher).discover(SITE).await;
    assert_eq!(found.entries.len(), 1);
    assert_eq!(found.entries[0].url, SITE);
    assert_eq!(found.method, DiscoveryMethod::FallbackCrawl);
}

#[tokio::test]
async fn tier_caps_bound_the_analyzed_page_count() {
    let mut fetcher = MockFetcher::new();
    let mut entries = Vec::new();
    for i in 0..30 {
        let url = format!("{SITE}/page-{i:02}");
        fetcher = fetcher.with_page(&url, content_page(&format!("Page {i}")));
        entries.push(SitemapEntry::new(url));
    }
    let fetcher = Arc::new(fetcher);

    let report = pipeline(Arc::clone(&fetcher), MockScorer::new())
        .run(entries.clone(), Tier::Starter)
        .await;
    assert_eq!(report.pages.len(), 20);
    assert_eq!(report.metrics.total_pages, 20);

    let report = pipeline(fetcher, MockScorer::new())
        .run(entries, Tier::Growth)
        .await;
    assert_eq!(report.pages.len(), 30);
}

#[tokio::test]
async fn second_run_is_idempotent_and_served_from_cache() {
    let paths = ["/docs/a", "/docs/b", "/guides/c"];
    let mut fetcher = MockFetcher::new();
    for path in &paths {
        fetcher = fetcher.with_page_validators(
            format!("{SITE}{path}"),
            content_page(path),
            Some("Wed, 01 Jan 2025 00:00:00 GMT"),
            Some("\"rev-1\""),
        );
    }
    let fetcher = Arc::new(fetcher);
    let cache = Arc::new(CacheEngine::new(Arc::new(MemoryCacheStore::new())));
    let orchestrator = AnalysisOrchestrator::new(
        Arc::clone(&fetcher),
        cache,
        Arc::new(MockScorer::new()),
    )
    .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)));

    let entries: Vec<SitemapEntry> = paths
        .iter()
        .map(|p| SitemapEntry::new(format!("{SITE}{p}")))
        .collect();

    let first = orchestrator.run(entries.clone(), Tier::Growth).await;
    assert_eq!(first.metrics.analyzed_pages, 3);
    assert_eq!(first.metrics.cached_pages, 0);
    let fetches_after_first = fetcher.total_fetches();

    let second = orchestrator.run(entries, Tier::Growth).await;
    assert_eq!(second.metrics.cached_pages, 3);
    assert_eq!(second.metrics.analyzed_pages, 0);
    assert!(second.metrics.time_saved_secs >= 9.0);
    // Byte-identical results, validated by conditional probes alone
    assert_eq!(second.pages, first.pages);
    assert_eq!(fetcher.total_fetches(), fetches_after_first);
    for path in &paths {
        assert_eq!(fetcher.conditional_head_count(&format!("{SITE}{path}")), 1);
    }
}

#[tokio::test]
async fn redirecting_page_is_still_served_from_cache_on_rerun() {
    let url = format!("{SITE}/guide");
    let store = Arc::new(MemoryCacheStore::new());

    // Every GET reports a post-redirect canonical form
    let redirecting = || {
        Arc::new(MockFetcher::new().with_redirected_page(
            &url,
            "https://www.widgets.test/guide",
            content_page("Guide"),
        ))
    };

    let cache = Arc::new(CacheEngine::new(Arc::clone(&store)));
    let orchestrator = AnalysisOrchestrator::new(redirecting(), cache, Arc::new(MockScorer::new()))
        .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)));
    let first = orchestrator
        .run(vec![SitemapEntry::new(&url)], Tier::Growth)
        .await;
    assert_eq!(first.metrics.analyzed_pages, 1);

    let cache = Arc::new(CacheEngine::new(Arc::clone(&store)));
    let orchestrator = AnalysisOrchestrator::new(redirecting(), cache, Arc::new(MockScorer::new()))
        .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)));
    let second = orchestrator
        .run(vec![SitemapEntry::new(&url)], Tier::Growth)
        .await;

    assert_eq!(second.metrics.cached_pages, 1);
    assert_eq!(second.metrics.analyzed_pages, 0);
}

#[tokio::test]
async fn changed_page_is_reanalyzed_and_its_record_refreshed() {
    use sitescope::traits::CacheStore;
    use sitescope::types::UrlHash;

    let url = format!("{SITE}/docs/a");
    let store = Arc::new(MemoryCacheStore::new());

    // First run: revision 1
    let v1 = Arc::new(MockFetcher::new().with_page_validators(
        &url,
        content_page("v1"),
        None,
        Some("\"rev-1\""),
    ));
    let cache = Arc::new(CacheEngine::new(Arc::clone(&store)));
    let orchestrator = AnalysisOrchestrator::new(v1, cache, Arc::new(MockScorer::new()))
        .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)));
    orchestrator
        .run(vec![SitemapEntry::new(&url)], Tier::Growth)
        .await;

    let hash = UrlHash::from_url(&url);
    let before = store.get(&hash, Tier::Growth).await.unwrap().unwrap();

    // Second run against revision 2: the conditional probe reports a
    // new validator, so the page is re-fetched and the record replaced
    let v2 = Arc::new(MockFetcher::new().with_page_validators(
        &url,
        content_page("v2"),
        None,
        Some("\"rev-2\""),
    ));
    let cache = Arc::new(CacheEngine::new(Arc::clone(&store)));
    let orchestrator = AnalysisOrchestrator::new(
        Arc::clone(&v2),
        cache,
        Arc::new(MockScorer::new()),
    )
    .with_config(AnalysisConfig::new().with_group_pause(Duration::from_millis(0)));
    let report = orchestrator
        .run(vec![SitemapEntry::new(&url)], Tier::Growth)
        .await;

    assert_eq!(report.metrics.analyzed_pages, 1);
    assert_eq!(report.metrics.cached_pages, 0);
    assert_eq!(v2.fetch_count(&url), 1);

    let after = store.get(&hash, Tier::Growth).await.unwrap().unwrap();
    assert_ne!(after.content_hash, before.content_hash);
    assert_eq!(after.etag.as_deref(), Some("\"rev-2\""));
    assert_eq!(after.hit_count, 0);
}

#[tokio::test]
async fn starter_runs_never_spend_ai_budget() {
    let url = format!("{SITE}/docs/a");
    let fetcher = Arc::new(MockFetcher::new().with_page(&url, content_page("Docs")));
    let scorer = MockScorer::new().with_ai();

    let report = pipeline(Arc::clone(&fetcher), scorer)
        .run(vec![SitemapEntry::new(&url)], Tier::Starter)
        .await;
    assert_eq!(report.metrics.ai_calls_used, 0);
    assert_eq!(report.metrics.html_extractions_used, 1);
}

#[tokio::test]
async fn hostile_site_trips_the_breaker_without_an_eleventh_fetch() {
    // Every fetch fails: bot protection behavior
    let fetcher = Arc::new(MockFetcher::new());
    let entries: Vec<SitemapEntry> = (0..40)
        .map(|i| SitemapEntry::new(format!("{SITE}/page-{i:02}")))
        .collect();

    let report = pipeline(Arc::clone(&fetcher), MockScorer::new())
        .run(entries, Tier::Growth)
        .await;

    assert!(report.tripped);
    assert_eq!(fetcher.total_fetches(), 10);
    assert!(report
        .pages
        .iter()
        .all(|p| p.quality_score == 1.0 && p.category == "Error"));
}
