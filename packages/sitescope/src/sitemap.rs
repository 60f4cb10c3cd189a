//! Sitemap XML parsing.
//!
//! Handles both `<urlset>` documents and `<sitemapindex>` documents
//! (which list other sitemaps rather than pages). A common failure
//! mode in the wild is an HTML error page served with an XML content
//! type; that is detected up front and reported as a distinct error so
//! discovery treats it as "this location has no sitemap" instead of a
//! parse failure.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::SitemapError;
use crate::types::SitemapEntry;

/// Outcome of parsing one sitemap document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSitemap {
    /// A `<urlset>` of page entries
    Pages(Vec<SitemapEntry>),

    /// A `<sitemapindex>`: URLs of child sitemaps to fetch and parse
    Index(Vec<String>),
}

impl ParsedSitemap {
    /// Whether the document contained nothing useful.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pages(entries) => entries.is_empty(),
            Self::Index(urls) => urls.is_empty(),
        }
    }
}

/// Parse a sitemap or sitemap-index document.
pub fn parse_sitemap(xml: &str) -> Result<ParsedSitemap, SitemapError> {
    let trimmed = xml.trim_start();
    let lower = trimmed
        .get(..15)
        .map(|p| p.to_ascii_lowercase())
        .unwrap_or_default();
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return Err(SitemapError::HtmlDocument);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Root> = None;
    let mut entries: Vec<SitemapEntry> = Vec::new();
    let mut child_sitemaps: Vec<String> = Vec::new();
    let mut current = EntryBuilder::default();
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"urlset" => root = Some(Root::UrlSet),
                b"sitemapindex" => root = Some(Root::Index),
                b"url" | b"sitemap" => current = EntryBuilder::default(),
                b"loc" => field = Some(Field::Loc),
                b"lastmod" => field = Some(Field::LastMod),
                b"changefreq" => field = Some(Field::ChangeFreq),
                b"priority" => field = Some(Field::Priority),
                _ => field = None,
            },
            Event::Text(t) => {
                if let Some(field) = field {
                    let text = t.unescape()?.trim().to_string();
                    match field {
                        Field::Loc => current.loc = Some(text),
                        Field::LastMod => current.lastmod = parse_lastmod(&text),
                        Field::ChangeFreq => current.changefreq = text.parse().ok(),
                        Field::Priority => current.priority = text.parse().ok(),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(loc) = current.loc.take() {
                        entries.push(SitemapEntry {
                            url: loc,
                            last_modified: current.lastmod.take(),
                            change_frequency: current.changefreq.take(),
                            priority: current.priority.take(),
                        });
                    }
                }
                b"sitemap" => {
                    if let Some(loc) = current.loc.take() {
                        child_sitemaps.push(loc);
                    }
                }
                _ => field = None,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"urlset" => root = Some(Root::UrlSet),
                b"sitemapindex" => root = Some(Root::Index),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(Root::UrlSet) => Ok(ParsedSitemap::Pages(entries)),
        Some(Root::Index) => Ok(ParsedSitemap::Index(child_sitemaps)),
        None => Err(SitemapError::NotASitemap),
    }
}

#[derive(Debug, Clone, Copy)]
enum Root {
    UrlSet,
    Index,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Loc,
    LastMod,
    ChangeFreq,
    Priority,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    loc: Option<String>,
    lastmod: Option<DateTime<Utc>>,
    changefreq: Option<crate::types::ChangeFrequency>,
    priority: Option<f32>,
}

/// Parse a `<lastmod>` value: full W3C datetime or bare date.
fn parse_lastmod(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeFrequency;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-02-01</lastmod>
    <changefreq>weekly</changefreq>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>https://example.com/docs</loc>
  </url>
</urlset>"#;

        let parsed = parse_sitemap(xml).unwrap();
        let ParsedSitemap::Pages(entries) = parsed else {
            panic!("expected urlset");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/");
        assert_eq!(entries[0].change_frequency, Some(ChangeFrequency::Weekly));
        assert_eq!(entries[0].priority, Some(1.0));
        assert!(entries[0].last_modified.is_some());
        assert!(entries[1].last_modified.is_none());
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<?xml version="1.0"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/post-sitemap.xml</loc></sitemap>
  <sitemap><loc>https://example.com/page-sitemap.xml</loc></sitemap>
</sitemapindex>"#;

        let parsed = parse_sitemap(xml).unwrap();
        assert_eq!(
            parsed,
            ParsedSitemap::Index(vec![
                "https://example.com/post-sitemap.xml".to_string(),
                "https://example.com/page-sitemap.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_html_disguised_as_xml() {
        let html = "<!DOCTYPE html><html><body>Not Found</body></html>";
        assert!(matches!(
            parse_sitemap(html),
            Err(SitemapError::HtmlDocument)
        ));
        assert!(matches!(
            parse_sitemap("  <html lang=\"en\"><head></head></html>"),
            Err(SitemapError::HtmlDocument)
        ));
    }

    #[test]
    fn test_not_a_sitemap() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"></rss>"#;
        assert!(matches!(parse_sitemap(xml), Err(SitemapError::NotASitemap)));
    }

    #[test]
    fn test_empty_urlset_is_empty() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"></urlset>"#;
        let parsed = parse_sitemap(xml).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_lastmod_rfc3339() {
        let parsed = parse_lastmod("2024-02-01T12:30:00+02:00").unwrap();
        assert_eq!(parsed.timezone(), Utc);
        assert!(parse_lastmod("soon").is_none());
    }
}
