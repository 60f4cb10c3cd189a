//! Relevance filtering and priority ranking of discovered URLs.
//!
//! Pure and deterministic: the same entry list always filters and
//! orders the same way. Exclusion happens first (assets, auth/admin
//! surfaces, archive shapes, anything with a query or fragment), then
//! survivors are bucketed high/medium/low by path heuristics and
//! stable-sorted, so ties keep discovery order.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::types::SitemapEntry;

static ASSET_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(jpg|jpeg|png|gif|pdf|zip|xml|json|css|js|woff|woff2|ttf|eot|ico|svg)$")
        .expect("valid regex")
});

static PAGINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/page/\d+").expect("valid regex"));

static DATE_ARCHIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d{4}/\d{2}/\d{2}/").expect("valid regex"));

/// Path fragments that mark a URL as non-content.
const EXCLUDED_PATHS: &[&str] = &[
    "/wp-admin/",
    "/admin/",
    "/login",
    "/logout",
    "/register",
    "/cart",
    "/checkout",
    "/account",
    "/dashboard",
    "/search",
    "/tag/",
    "/category/",
    "/author/",
    "/user/",
    "/profile/",
    "/wp-content/",
    "/assets/",
    "/static/",
    "/images/",
    "/css/",
    "/js/",
    "/fonts/",
    "/media/",
];

/// Path fragments marking reference-style, high-value content.
const HIGH_PRIORITY_PATHS: &[&str] = &[
    "/doc",
    "/documentation",
    "/guide",
    "/tutorial",
    "/help",
    "/api",
    "/reference",
    "/manual",
    "/faq",
    "/about",
    "/support",
    "/getting-started",
    "/best-practices",
    "/troubleshooting",
    "/changelog",
    "/roadmap",
    "/features",
    "/pricing",
    "/contact",
    "/learn",
    "/how-to",
    "/example",
    "/resource",
    "/template",
    "/integration",
    "/tool",
    "/sdk",
    "/cli",
    "/quickstart",
    "/overview",
    "/introduction",
];

/// Path fragments marking secondary content.
const MEDIUM_PRIORITY_PATHS: &[&str] = &[
    "/blog",
    "/article",
    "/news",
    "/updates",
    "/release-notes",
    "/announcements",
    "/case-studies",
    "/stories",
    "/solutions",
    "/product",
    "/service",
    "/platform",
    "/security",
    "/privacy",
    "/legal",
    "/terms",
    "/compliance",
    "/enterprise",
    "/business",
    "/developer",
    "/community",
    "/partner",
    "/career",
    "/company",
    "/team",
    "/mission",
];

/// Relevance bucket for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PagePriority {
    High,
    Medium,
    Low,
}

/// Lowercased path component. The word lists must never see the host:
/// `search.example.com` or `accountingfirm.com` would otherwise match
/// path rules. Unparseable input falls back to the raw string so bare
/// paths still classify.
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    }
}

/// Whether a URL should be dropped from analysis entirely.
pub fn is_excluded(url: &str) -> bool {
    if url.contains('?') || url.contains('#') {
        return true;
    }
    let path = url_path(url);
    if ASSET_EXTENSION.is_match(&path) || PAGINATION.is_match(&path) || DATE_ARCHIVE.is_match(&path)
    {
        return true;
    }
    EXCLUDED_PATHS.iter().any(|p| path.contains(p))
}

/// Classify a URL into a priority bucket by path heuristics.
pub fn classify(url: &str) -> PagePriority {
    let path = url_path(url);
    if HIGH_PRIORITY_PATHS.iter().any(|p| path.contains(p)) {
        PagePriority::High
    } else if MEDIUM_PRIORITY_PATHS.iter().any(|p| path.contains(p)) {
        PagePriority::Medium
    } else {
        PagePriority::Low
    }
}

/// A root or homepage-shaped URL: path depth <= 1 and a trailing slash.
fn is_homepage_shaped(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.ends_with('/') && lower.split('/').count() <= 4
}

/// Drop non-content URLs and order survivors high, medium, low.
///
/// The sort is stable: within a bucket, homepage-shaped URLs come
/// first and everything else keeps discovery order.
pub fn filter_relevant(entries: Vec<SitemapEntry>) -> Vec<SitemapEntry> {
    let mut kept: Vec<SitemapEntry> = entries
        .into_iter()
        .filter(|e| !is_excluded(&e.url))
        .collect();

    kept.sort_by_key(|e| (classify(&e.url), !is_homepage_shaped(&e.url)));
    kept
}
