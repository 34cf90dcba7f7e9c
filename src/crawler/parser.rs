//! HTML parsing for fetched pages
//!
//! Two independent link extraction strategies live here:
//! - [`parse_html`] walks the DOM (`<a href>` and canonical links)
//! - [`extract_markup_links`] scans the raw markup for `href` attributes
//!
//! Their results overlap heavily. Both feed the frontier, which deduplicates.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from the `<title>` tag)
    pub title: Option<String>,

    /// Absolute http(s) links, fragments removed, in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title and structured links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links (same page anchors)
///
/// # Example
///
/// ```
/// use doc_trawler::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Intro</title></head><body><a href="setup#linux">Setup</a></body></html>"#;
/// let base = Url::parse("https://ex.com/docs/").unwrap();
/// let parsed = parse_html(html, &base);
/// assert_eq!(parsed.title.as_deref(), Some("Intro"));
/// assert_eq!(parsed.links, vec!["https://ex.com/docs/setup".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

/// Converts a page to markdown text, dropping the contents of `excluded_tags`
pub fn html_to_text(html: &str, excluded_tags: &[String]) -> Result<String, String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(excluded_tags.iter().map(String::as_str).collect())
        .build();

    converter
        .convert(html)
        .map_err(|e| format!("markdown conversion failed: {e}"))
}

/// Scans raw markup for `href` attributes and resolves them against `base_url`
///
/// Unlike [`parse_html`] this does not build a DOM, so it also picks up links in
/// markup the parser would discard or in tags other than `<a>`.
pub fn extract_markup_links(markup: &str, base_url: &Url) -> Vec<String> {
    static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    });

    HREF_RE
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| resolve_link(&decode_entities(m.as_str()), base_url))
        .collect()
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves an href to an absolute http(s) URL without its fragment
///
/// Returns `None` for special schemes, same page anchors and anything that does not
/// resolve.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}

/// Decodes the handful of entities that show up inside attribute values
fn decode_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
