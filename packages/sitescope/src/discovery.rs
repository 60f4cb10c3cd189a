//! Multi-strategy page discovery with graceful degradation.
//!
//! Discovery never fails hard for network reasons. Strategies are an
//! explicit ordered list; each either produces a [`DiscoveryResult`]
//! or skips to the next, and the final crawl fallback always produces
//! at least one entry so the pipeline always has a page to analyze.

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetcher::Fetcher;
use crate::sitemap::{parse_sitemap, ParsedSitemap};
use crate::types::{DiscoveryMethod, DiscoveryResult, SitemapEntry};

/// Sitemap locations probed at the root domain, in order.
const SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap/sitemap.xml",
    "/sitemaps/sitemap.xml",
    "/wp-sitemap.xml",
    "/sitemap-index.xml",
    "/post-sitemap.xml",
];

/// Common content paths unioned into the crawl fallback candidate set.
const COMMON_CONTENT_PATHS: &[&str] = &[
    "/",
    "/docs",
    "/documentation",
    "/api",
    "/api-docs",
    "/guides",
    "/guide",
    "/tutorials",
    "/tutorial",
    "/help",
    "/support",
    "/faq",
    "/about",
    "/getting-started",
    "/quickstart",
    "/reference",
    "/examples",
    "/demos",
    "/blog",
    "/posts",
    "/articles",
    "/news",
    "/updates",
    "/changelog",
    "/releases",
    "/roadmap",
    "/contact",
    "/team",
    "/company",
    "/pricing",
    "/features",
    "/download",
];

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

static CLIENT_REDIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.location\.href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static BINARY_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|pdf|zip|doc|docx|xls|xlsx|ppt|pptx|mp3|mp4|avi|mov)$")
        .expect("valid regex")
});

/// Tunables for one discovery engine.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum candidates HEAD-validated in the crawl fallback
    pub max_crawl_candidates: usize,

    /// Cumulative signal score at which a homepage counts as a
    /// single-page app
    pub spa_threshold: i32,

    /// Recursion bound when following sitemap indexes
    pub max_index_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_crawl_candidates: 50,
            spa_threshold: 3,
            max_index_depth: 3,
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the crawl fallback candidate cap.
    pub fn with_max_crawl_candidates(mut self, max: usize) -> Self {
        self.max_crawl_candidates = max;
        self
    }

    /// Set the SPA classification threshold.
    pub fn with_spa_threshold(mut self, threshold: i32) -> Self {
        self.spa_threshold = threshold;
        self
    }
}

/// Ordered fallback chain; first strategy to produce a result wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    CanonicalSitemaps,
    RobotsSitemap,
    HomepageHeuristic,
    FallbackCrawl,
}

impl Strategy {
    const ORDER: [Strategy; 4] = [
        Strategy::CanonicalSitemaps,
        Strategy::RobotsSitemap,
        Strategy::HomepageHeuristic,
        Strategy::FallbackCrawl,
    ];
}

/// Orchestrates the sitemap / robots / heuristic / crawl fallback
/// chain for one site.
pub struct DiscoveryEngine<F: Fetcher> {
    fetcher: Arc<F>,
    config: DiscoveryConfig,
}

impl<F: Fetcher> DiscoveryEngine<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            config: DiscoveryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Discover crawlable pages for a site.
    ///
    /// Network errors are swallowed per-candidate; the method field of
    /// the result records which degraded path produced the entries.
    pub async fn discover(&self, base_url: &str) -> DiscoveryResult {
        let root = root_domain(base_url);
        info!(base_url = %base_url, root = %root, "Starting discovery");

        for strategy in Strategy::ORDER {
            if let Some(result) = self.run_strategy(strategy, base_url, &root).await {
                info!(
                    method = %result.method,
                    entries = result.entries.len(),
                    "Discovery completed"
                );
                return result;
            }
        }

        // The crawl fallback always returns a result; this is the
        // belt-and-braces floor for the contract that discovery never
        // comes back empty-handed.
        DiscoveryResult {
            entries: vec![SitemapEntry::new(base_url).with_priority(1.0)],
            sitemap_found: false,
            method: DiscoveryMethod::FallbackCrawl,
            message: "Discovery exhausted all strategies; analyzing the base URL only".to_string(),
        }
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
        base_url: &str,
        root: &str,
    ) -> Option<DiscoveryResult> {
        match strategy {
            Strategy::CanonicalSitemaps => self.try_canonical_sitemaps(root).await,
            Strategy::RobotsSitemap => self.try_robots_sitemap(root).await,
            Strategy::HomepageHeuristic => self.try_homepage_heuristic(base_url).await,
            Strategy::FallbackCrawl => Some(self.crawl_fallback(base_url, root).await),
        }
    }

    /// Strategy 1: probe the canonical sitemap path list, extended
    /// with redirect-target candidates when the site front door
    /// redirects client-side.
    async fn try_canonical_sitemaps(&self, root: &str) -> Option<DiscoveryResult> {
        let mut candidates: Vec<String> = Vec::new();

        if let Some(redirect_base) = self.detect_redirect_base(root).await {
            debug!(redirect_base = %redirect_base, "Detected client-side redirect");
            for path in &SITEMAP_PATHS[..4] {
                candidates.push(format!("{redirect_base}{path}"));
            }
        }
        for path in SITEMAP_PATHS {
            candidates.push(format!("{root}{path}"));
        }

        for candidate in &candidates {
            debug!(url = %candidate, "Probing sitemap location");
            let entries = self.load_sitemap(candidate, 0).await;
            if entries.is_empty() {
                // A successful fetch with zero entries is a false
                // positive (HTML error page with an XML content type);
                // keep probing.
                continue;
            }
            return Some(DiscoveryResult {
                message: format!("Found sitemap with {} pages", entries.len()),
                entries,
                sitemap_found: true,
                method: DiscoveryMethod::Sitemap,
            });
        }
        None
    }

    /// One lightweight pass to spot a client-side redirect: HEAD the
    /// root sitemap, and only if that fails scan the homepage for a
    /// `window.location.href` assignment.
    async fn detect_redirect_base(&self, root: &str) -> Option<String> {
        let probe = format!("{root}/sitemap.xml");
        match self.fetcher.head(&probe).await {
            Ok(snapshot) if snapshot.is_success() => return None,
            Ok(_) | Err(_) => {}
        }

        let homepage = self.fetcher.fetch(root).await.ok()?;
        let target = CLIENT_REDIRECT
            .captures(&homepage.body)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str())?;

        if target.starts_with('/') {
            Some(format!("{root}{}", target.trim_end_matches('/')))
        } else {
            Some(format!("{root}/{}", target.trim_end_matches('/')))
        }
    }

    /// Fetch and parse one sitemap URL, flattening nested indexes.
    fn load_sitemap<'a>(&'a self, url: &'a str, depth: usize) -> BoxFuture<'a, Vec<SitemapEntry>> {
        Box::pin(async move {
            let page = match self.fetcher.fetch(url).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(url = %url, error = %e, "Sitemap fetch failed");
                    return Vec::new();
                }
            };

            match parse_sitemap(&page.body) {
                Ok(ParsedSitemap::Pages(entries)) => entries,
                Ok(ParsedSitemap::Index(children)) => {
                    if depth >= self.config.max_index_depth {
                        warn!(url = %url, depth, "Sitemap index depth bound reached");
                        return Vec::new();
                    }
                    let mut flattened = Vec::new();
                    for child in children {
                        flattened.extend(self.load_sitemap(&child, depth + 1).await);
                    }
                    flattened
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "Sitemap parse failed");
                    Vec::new()
                }
            }
        })
    }

    /// Strategy 2: follow a `Sitemap:` directive from robots.txt.
    async fn try_robots_sitemap(&self, root: &str) -> Option<DiscoveryResult> {
        let robots_url = format!("{root}/robots.txt");
        let robots = match self.fetcher.fetch(&robots_url).await {
            Ok(page) => page.body,
            Err(e) => {
                debug!(url = %robots_url, error = %e, "robots.txt fetch failed");
                return None;
            }
        };

        for sitemap_url in sitemap_directives(&robots) {
            debug!(url = %sitemap_url, "Trying sitemap from robots.txt");
            let entries = self.load_sitemap(&sitemap_url, 0).await;
            if !entries.is_empty() {
                return Some(DiscoveryResult {
                    message: format!("Found sitemap via robots.txt with {} pages", entries.len()),
                    entries,
                    sitemap_found: true,
                    method: DiscoveryMethod::RobotsTxt,
                });
            }
        }
        None
    }

    /// Strategy 3: classify single-page apps from homepage signals.
    async fn try_homepage_heuristic(&self, base_url: &str) -> Option<DiscoveryResult> {
        let homepage = match self.fetcher.fetch(base_url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(url = %base_url, error = %e, "Homepage fetch failed");
                return None;
            }
        };

        let (score, indicators) = spa_signals(&homepage.body);
        debug!(url = %base_url, score, indicators = ?indicators, "Homepage SPA signals");

        if score >= self.config.spa_threshold {
            Some(DiscoveryResult {
                entries: vec![SitemapEntry::new(base_url).with_last_modified(Utc::now())],
                sitemap_found: false,
                method: DiscoveryMethod::HomepageOnly,
                message: "No sitemap found. This appears to be a single-page site. \
                          Analysis includes homepage only."
                    .to_string(),
            })
        } else {
            None
        }
    }

    /// Strategy 4: best-effort crawl. Homepage links plus common
    /// content paths, capped, HEAD-validated concurrently. Never
    /// returns an empty entry list.
    async fn crawl_fallback(&self, base_url: &str, root: &str) -> DiscoveryResult {
        let mut candidates: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Ok(homepage) = self.fetcher.fetch(base_url).await {
            if let Ok(final_url) = Url::parse(&homepage.final_url) {
                for link in extract_links(&final_url, &homepage.body) {
                    if seen.insert(link.clone()) {
                        candidates.push(link);
                    }
                }
            }
        }

        for path in COMMON_CONTENT_PATHS {
            let url = if *path == "/" {
                format!("{root}/")
            } else {
                format!("{root}{path}")
            };
            if seen.insert(url.clone()) {
                candidates.push(url);
            }
        }

        candidates.truncate(self.config.max_crawl_candidates);
        debug!(candidates = candidates.len(), "Validating crawl candidates");

        let probes = candidates.iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                match fetcher.head(url).await {
                    Ok(snapshot) if snapshot.is_success() => Some((url.clone(), snapshot)),
                    Ok(_) | Err(_) => None,
                }
            }
        });

        let mut entries: Vec<SitemapEntry> = join_all(probes)
            .await
            .into_iter()
            .flatten()
            .map(|(url, snapshot)| {
                let priority = if is_root_url(&url, base_url, root) { 1.0 } else { 0.8 };
                let mut entry = SitemapEntry::new(url).with_priority(priority);
                if let Some(modified) = snapshot.last_modified.as_deref().and_then(parse_http_date)
                {
                    entry = entry.with_last_modified(modified);
                }
                entry
            })
            .collect();

        if entries.is_empty() {
            entries.push(
                SitemapEntry::new(base_url)
                    .with_priority(1.0)
                    .with_last_modified(Utc::now()),
            );
        }

        DiscoveryResult {
            message: format!(
                "No sitemap found. Discovered {} pages through basic crawling. \
                 Some pages may be missing.",
                entries.len()
            ),
            entries,
            sitemap_found: false,
            method: DiscoveryMethod::FallbackCrawl,
        }
    }
}

/// Scheme + host (+ port) of a URL, no path.
fn root_domain(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => base_url.trim_end_matches('/').to_string(),
    }
}

fn is_root_url(url: &str, base_url: &str, root: &str) -> bool {
    url == base_url || url == root || url == format!("{root}/")
}

/// Extract `Sitemap:` directives from robots.txt.
pub fn sitemap_directives(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (directive, value) = line.trim().split_once(':')?;
            if !directive.trim().eq_ignore_ascii_case("sitemap") {
                return None;
            }
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

/// Extract same-host page links from HTML, excluding binary files,
/// admin/auth paths and non-HTTP schemes.
pub fn extract_links(base: &Url, html: &str) -> Vec<String> {
    let base_host = base.host_str().unwrap_or("");
    let mut links = Vec::new();

    for cap in HREF.captures_iter(html) {
        let Some(href) = cap.get(1).map(|m| m.as_str()) else {
            continue;
        };

        if href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if resolved.host_str() != Some(base_host) {
            continue;
        }
        resolved.set_fragment(None);

        let url = resolved.to_string();
        if BINARY_EXTENSION.is_match(&url)
            || url.contains("/wp-admin/")
            || url.contains("/admin/")
            || url.contains("/login")
            || url.contains("/logout")
        {
            continue;
        }
        links.push(url);
    }

    links
}

/// Score single-page-app likelihood from homepage HTML.
///
/// Returns the cumulative score plus the indicators that fired, for
/// logging and tests.
pub fn spa_signals(html: &str) -> (i32, Vec<&'static str>) {
    let lower = html.to_lowercase();
    let mut score = 0;
    let mut indicators = Vec::new();

    if lower.contains("id=\"root\"") || lower.contains("data-reactroot") {
        score += 2;
        indicators.push("react-app");
    }
    if lower.contains("id=\"app\"") || lower.contains("data-v-") {
        score += 2;
        indicators.push("vue-app");
    }
    if lower.contains("ng-app") {
        score += 2;
        indicators.push("angular-app");
    }
    // Next.js can be multi-page, weaker signal
    if lower.contains("id=\"__next\"") {
        score += 1;
        indicators.push("nextjs-app");
    }

    if nav_link_count(&lower) <= 3 {
        score += 1;
        indicators.push("minimal-navigation");
    }
    if internal_link_count(&lower) <= 5 {
        score += 1;
        indicators.push("few-internal-links");
    }

    if lower.contains("breadcrumb") {
        score -= 1;
        indicators.push("has-breadcrumbs");
    }
    if lower.contains("pagination") || lower.contains("page-numbers") {
        score -= 1;
        indicators.push("has-pagination");
    }

    if title_or_description_mentions_app(&lower) {
        score += 1;
        indicators.push("app-terminology");
    }

    (score, indicators)
}

static NAV_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(nav|header)[^>]*>(.*?)</(nav|header)>").expect("valid regex"));

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("valid regex"));

static META_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#)
        .expect("valid regex")
});

fn nav_link_count(html: &str) -> usize {
    NAV_BLOCK
        .captures_iter(html)
        .map(|cap| {
            cap.get(2)
                .map(|block| HREF.captures_iter(block.as_str()).count())
                .unwrap_or(0)
        })
        .sum()
}

fn internal_link_count(html: &str) -> usize {
    HREF.captures_iter(html)
        .filter(|cap| {
            cap.get(1)
                .map(|m| {
                    let href = m.as_str();
                    href.starts_with('/') || href.starts_with("./") || href.starts_with("../")
                })
                .unwrap_or(false)
        })
        .count()
}

fn title_or_description_mentions_app(html: &str) -> bool {
    let in_title = TITLE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().contains("app"))
        .unwrap_or(false);
    let in_description = META_DESCRIPTION
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().contains("app"))
        .unwrap_or(false);
    in_title || in_description
}

/// Parse an HTTP date header (IMF-fixdate).
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
