//! Heuristic page analysis from raw HTML, no network or model calls.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::error::PipelineError;
use crate::traits::PageScorer;
use crate::types::PageAnalysis;

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid regex"));
static META_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#)
        .expect("valid regex")
});
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid regex"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6][^>]*>").expect("valid regex"));
static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(code|pre)[^>]*>").expect("valid regex"));

/// Scorer that never leaves the process. Used directly for the Starter
/// tier and as the baseline and fallback for the AI scorer.
#[derive(Debug, Default, Clone)]
pub struct HtmlScorer;

impl HtmlScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageScorer for HtmlScorer {
    async fn score(
        &self,
        url: &str,
        raw_content: &str,
        _enhanced: bool,
    ) -> Result<PageAnalysis, PipelineError> {
        Ok(analyze_html(url, raw_content))
    }
}

/// Analyze one page from its HTML alone.
///
/// Scoring starts from a deliberately low base and earns its way up
/// through content depth and structure; navigation shells, error
/// pages and placeholder content are demoted hard. The result is
/// clamped to 1..=10 in 0.5 steps.
pub fn analyze_html(url: &str, html: &str) -> PageAnalysis {
    let text = visible_text(html);
    let title = extract_title(url, html);
    let description = extract_description(url, html, &text);

    let word_count = text.split_whitespace().count();
    let paragraph_count = PARAGRAPH.captures_iter(html).count();
    let list_item_count = LIST_ITEM.captures_iter(html).count();
    let heading_count = HEADING.find_iter(html).count();
    let code_block_count = CODE_BLOCK.find_iter(html).count();

    let text_lower = text.to_lowercase();
    let title_lower = title.to_lowercase();
    let category = categorize(url, &text_lower, list_item_count, paragraph_count);

    let mut score: f32 = 3.0;

    // Content depth
    if word_count > 100 {
        score += 1.0;
    }
    if word_count > 300 {
        score += 1.0;
    }
    if word_count > 500 {
        score += 1.0;
    }

    // Structure
    if heading_count >= 2 {
        score += 0.5;
    }
    if paragraph_count >= 3 {
        score += 0.5;
    }
    if code_block_count > 0 {
        score += 1.0;
    }

    if title.len() > 20 && !title.contains("http://") && !title.contains("https://") {
        score += 0.5;
    }
    if description.len() > 100 && !description.contains("From here you can") {
        score += 0.5;
    }

    // Navigation shells score low no matter what else they earned
    let is_navigation = text_lower.contains("from here you can")
        || text_lower.contains("select from")
        || text_lower.contains("choose from")
        || (list_item_count > 2 && paragraph_count <= 2 && word_count < 300);
    if is_navigation {
        score = (score - 1.0).clamp(1.0, 3.0);
    }

    if title_lower.contains("404")
        || title_lower.contains("error")
        || text_lower.contains("page not found")
    {
        score = 1.0;
    }

    if text_lower.contains("lorem ipsum")
        || text_lower.contains("coming soon")
        || text_lower.contains("under construction")
    {
        score = (score - 2.0).max(1.0);
    }

    if description.ends_with(':') || description.contains("From here you can") || description.len() < 30
    {
        score = (score - 2.0).max(1.0);
    }

    let score = half_step_clamp(score);

    PageAnalysis {
        title: truncate_chars(&title, 100),
        description: truncate_at_word(&description, 300),
        quality_score: score,
        category,
        relevance: score,
    }
}

/// Body text with scripts, styles and tags stripped and whitespace
/// collapsed.
fn visible_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_scripts, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}

fn first_capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| WHITESPACE.replace_all(&TAG.replace_all(m.as_str(), " "), " ").trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_title(url: &str, html: &str) -> String {
    first_capture(&TITLE, html)
        .or_else(|| first_capture(&H1, html))
        .or_else(|| last_path_segment(url))
        .unwrap_or_else(|| "Untitled Page".to_string())
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn extract_description(url: &str, html: &str, text: &str) -> String {
    if let Some(meta) = first_capture(&META_DESCRIPTION, html) {
        return meta;
    }

    let first_paragraph = first_capture(&PARAGRAPH, html).unwrap_or_default();
    let list_items: Vec<String> = LIST_ITEM
        .captures_iter(html)
        .take(3)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            WHITESPACE
                .replace_all(&TAG.replace_all(m.as_str(), " "), " ")
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect();

    if first_paragraph.len() > 10 {
        if first_paragraph.to_lowercase().contains("from here you can") && !list_items.is_empty() {
            return format!("{first_paragraph} {}", list_items.join(", "));
        }
        return first_paragraph;
    }
    if !list_items.is_empty() {
        return format!("Navigation page with links to: {}", list_items.join(", "));
    }

    let snippet = truncate_chars(text, 200);
    if !snippet.is_empty() {
        return snippet;
    }
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "this site".to_string());
    format!("Content page from {host}")
}

fn categorize(url: &str, text_lower: &str, list_items: usize, paragraphs: usize) -> String {
    let url_lower = url.to_lowercase();
    if url_lower.contains("/docs") || url_lower.contains("/documentation") {
        "Documentation"
    } else if url_lower.contains("/api") {
        "API Reference"
    } else if url_lower.contains("/guide") || url_lower.contains("/tutorial") {
        "Tutorial"
    } else if url_lower.contains("/blog") {
        "Blog"
    } else if url_lower.contains("/about") {
        "About"
    } else if text_lower.contains("navigation")
        || text_lower.contains("from here you can")
        || list_items > paragraphs
    {
        "Navigation"
    } else {
        "General"
    }
    .to_string()
}

/// Clamp to 1..=10 and round to the nearest 0.5.
fn half_step_clamp(score: f32) -> f32 {
    ((score * 2.0).round() / 2.0).clamp(1.0, 10.0)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate to `max` chars at a word boundary, appending an ellipsis
/// when something was cut. A boundary too close to the start is
/// ignored rather than producing a stub.
pub fn truncate_at_word(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    // The ellipsis counts against the cap
    let budget = max.saturating_sub(3);
    let cut: String = s.chars().take(budget).collect();
    match cut.rfind(' ') {
        Some(last_space) if last_space > budget.saturating_sub(50) => {
            format!("{}...", &cut[..last_space])
        }
        _ => format!("{cut}..."),
    }
}
