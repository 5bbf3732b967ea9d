//! HTML parser for extracting links and page metadata
//!
//! This module handles parsing fetched bytes to extract:
//! - Raw `<a href>` values for the normalizer
//! - Page title and meta description
//! - Content metrics used by the analysis endpoint
//!
//! Parsing never fails: malformed markup yields whatever the HTML5 parser
//! recovers, and the worst case is an empty page. Traversal uses selector
//! iteration, never recursion over the document tree.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Excerpt length in characters before truncation
const EXCERPT_CHARS: usize = 500;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub description: Option<String>,

    /// Every `<a href>` value, untrimmed and unresolved
    pub links: Vec<String>,

    pub heading_count: usize,
    pub heading_titles: Vec<String>,
    pub paragraph_count: usize,
    pub image_count: usize,

    /// Whitespace-separated words inside `<p>` elements
    pub word_count: usize,

    /// Paragraph text, at most 500 characters plus `...`
    pub text_excerpt: String,

    /// Anchors resolving to the page's own host
    pub internal_links: usize,

    /// Anchors resolving to an http(s) URL on another host
    pub external_links: usize,
}

impl ParsedPage {
    /// Number of `<a href>` elements, the outbound link count stored per page
    pub fn link_count(&self) -> u32 {
        u32::try_from(self.links.len()).unwrap_or(u32::MAX)
    }
}

/// Parses page bytes and extracts links and metadata
///
/// `base_url` is the URL the bytes were served from. It decides which
/// anchors count as internal or external; hrefs in [`ParsedPage::links`]
/// are left unresolved for the normalizer.
///
/// # Example
///
/// ```
/// use driftnet::crawler::parse_html;
/// use url::Url;
///
/// let html = br#"<html><head><title>T</title></head><body><p>hello world</p><img src="i.png"><a href="https://other.org/x">go</a></body></html>"#;
/// let base_url = Url::parse("https://example.org/").unwrap();
/// let parsed = parse_html(html, &base_url);
///
/// assert_eq!(parsed.title.as_deref(), Some("T"));
/// assert_eq!(parsed.word_count, 2);
/// assert_eq!(parsed.external_links, 1);
/// ```
pub fn parse_html(bytes: &[u8], base_url: &Url) -> ParsedPage {
    let html = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&html);

    let mut page = ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        ..ParsedPage::default()
    };

    extract_links(&document, base_url, &mut page);
    extract_headings(&document, &mut page);
    extract_paragraphs(&document, &mut page);
    page.image_count = select_all(&document, "img").len();

    page
}

fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Joins an element's text nodes with single spaces
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    select_all(document, "title")
        .first()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    select_all(document, "meta[name]")
        .into_iter()
        .find(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
}

/// Collects hrefs and classifies anchors as internal or external
fn extract_links(document: &Html, base_url: &Url, page: &mut ParsedPage) {
    let base_host = base_url.host_str().map(str::to_ascii_lowercase);

    for anchor in select_all(document, "a[href]") {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        page.links.push(href.to_string());

        let Ok(resolved) = base_url.join(href.trim()) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let host = resolved.host_str().map(str::to_ascii_lowercase);
        if host == base_host {
            page.internal_links += 1;
        } else {
            page.external_links += 1;
        }
    }
}

fn extract_headings(document: &Html, page: &mut ParsedPage) {
    for heading in select_all(document, "h1, h2, h3, h4, h5, h6") {
        page.heading_count += 1;

        let text = element_text(&heading);
        if !text.is_empty() {
            page.heading_titles.push(text);
        }
    }
}

fn extract_paragraphs(document: &Html, page: &mut ParsedPage) {
    let mut text = String::new();

    for paragraph in select_all(document, "p") {
        page.paragraph_count += 1;

        let words = element_text(&paragraph);
        if words.is_empty() {
            continue;
        }
        page.word_count += words.split(' ').count();

        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&words);
    }

    page.text_excerpt = truncate_excerpt(text);
}

fn truncate_excerpt(text: String) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.org/").unwrap()
    }

    fn parse(html: &str) -> ParsedPage {
        parse_html(html.as_bytes(), &base_url())
    }

    #[test]
    fn test_reference_page_metrics() {
        let parsed = parse(
            r#"<html><head><title>T</title></head><body><p>hello world</p><img src="i.png"><a href="https://other.org/x">go</a></body></html>"#,
        );

        assert_eq!(parsed.title.as_deref(), Some("T"));
        assert_eq!(parsed.paragraph_count, 1);
        assert_eq!(parsed.image_count, 1);
        assert_eq!(parsed.word_count, 2);
        assert_eq!(parsed.external_links, 1);
        assert_eq!(parsed.internal_links, 0);
        assert_eq!(parsed.text_excerpt, "hello world");
        assert_eq!(parsed.links, vec!["https://other.org/x"]);
        assert_eq!(parsed.link_count(), 1);
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let parsed = parse("<html><head><title>  Test \n Page  </title></head></html>");
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse("<html><head><title>   </title></head><body></body></html>");
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_description() {
        let parsed = parse(
            r#"<html><head><meta name="Description" content=" About the epic "></head></html>"#,
        );
        assert_eq!(parsed.description.as_deref(), Some("About the epic"));

        assert_eq!(parse("<html></html>").description, None);
    }

    #[test]
    fn test_links_are_raw_hrefs() {
        let parsed = parse(
            r##"<body>
                <a href="/a">A</a>
                <a href="b#frag">B</a>
                <a href="mailto:x@example.org">mail</a>
                <a>no href</a>
                <link rel="canonical" href="/canonical">
            </body>"##,
        );

        assert_eq!(parsed.links, vec!["/a", "b#frag", "mailto:x@example.org"]);
        assert_eq!(parsed.link_count(), 3);
    }

    #[test]
    fn test_internal_external_classification() {
        let parsed = parse(
            r#"<body>
                <a href="/local">1</a>
                <a href="https://example.org/abs">2</a>
                <a href="https://EXAMPLE.org/case">3</a>
                <a href="https://sub.example.org/">4</a>
                <a href="//other.org/">5</a>
                <a href="javascript:void(0)">6</a>
            </body>"#,
        );

        assert_eq!(parsed.internal_links, 3);
        assert_eq!(parsed.external_links, 2);
    }

    #[test]
    fn test_headings() {
        let parsed = parse(
            "<body><h1>Main <em>Title</em></h1><h3>  Sub </h3><h6></h6><header>x</header></body>",
        );

        assert_eq!(parsed.heading_count, 3);
        assert_eq!(parsed.heading_titles, vec!["Main Title", "Sub"]);
    }

    #[test]
    fn test_word_count_spans_nested_markup() {
        let parsed = parse("<p>one <b>two</b>three</p><p>  four\n five </p><p></p>");

        assert_eq!(parsed.paragraph_count, 3);
        assert_eq!(parsed.word_count, 5);
        assert_eq!(parsed.text_excerpt, "one two three four five");
    }

    #[test]
    fn test_excerpt_truncated_on_char_boundary() {
        let body = "é".repeat(600);
        let parsed = parse(&format!("<p>{}</p>", body));

        assert!(parsed.text_excerpt.ends_with("..."));
        assert_eq!(parsed.text_excerpt.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_excerpt_at_limit_is_untouched() {
        let body = "a".repeat(EXCERPT_CHARS);
        let parsed = parse(&format!("<p>{}</p>", body));
        assert_eq!(parsed.text_excerpt, body);
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let parsed = parse("<html><body><p>unclosed <a href='/x'>link<div></p></span>");
        assert_eq!(parsed.links, vec!["/x"]);
        assert!(parsed.paragraph_count >= 1);
        assert_eq!(parsed.word_count, 2);
    }

    #[test]
    fn test_binary_input_degrades_to_empty() {
        let parsed = parse_html(&[0xff, 0xfe, 0x00, 0x9c, 0x80], &base_url());
        assert!(parsed.links.is_empty());
        assert_eq!(parsed.title, None);
        assert_eq!(parsed.word_count, 0);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let html = format!(
            "{}<a href=\"/deep\">x</a>{}",
            "<div>".repeat(5_000),
            "</div>".repeat(5_000)
        );
        let parsed = parse(&html);
        assert_eq!(parsed.links, vec!["/deep"]);
    }
}
