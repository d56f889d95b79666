//! HTML link extraction
//!
//! Extractors receive an already parsed document and return references
//! exactly as written in the markup. Resolving, de-duplicating and scoping
//! happen later, in the frontier.
//!
//! # Extractors
//!
//! - [`AnchorExtractor`]: `<a href="...">`
//! - [`AjaxExtractor`]: `<a href="..." data-remote="true">`, with `.js`
//!   appended since such links are answered by a script endpoint
//! - [`AssetExtractor`]: stylesheets, scripts and images the page embeds

use scraper::{Html, Selector};

/// Produces candidate references from a parsed HTML document
pub trait HtmlExtractor: Send + Sync {
    fn extract(&self, document: &Html) -> Vec<String>;
}

/// Parses an HTML document
///
/// The HTML5 parser recovers from any malformed input, so this never fails.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts `href` values from anchors
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorExtractor;

impl HtmlExtractor for AnchorExtractor {
    fn extract(&self, document: &Html) -> Vec<String> {
        select_attr(document, "a[href]", "href")
    }
}

/// Extracts AJAX endpoints from anchors flagged with `data-remote="true"`
///
/// # Example
///
/// ```
/// use roundabout::crawler::{parse_document, AjaxExtractor, HtmlExtractor};
///
/// let doc = parse_document(r#"<a href="/api/items" data-remote="true">Items</a>"#);
/// assert_eq!(AjaxExtractor.extract(&doc), vec!["/api/items.js".to_string()]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AjaxExtractor;

impl HtmlExtractor for AjaxExtractor {
    fn extract(&self, document: &Html) -> Vec<String> {
        select_attr(document, r#"a[href][data-remote="true"]"#, "href")
            .into_iter()
            .map(|href| format!("{}.js", href))
            .collect()
    }
}

/// Extracts resources a page embeds: stylesheets, scripts and images
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetExtractor;

impl HtmlExtractor for AssetExtractor {
    fn extract(&self, document: &Html) -> Vec<String> {
        let mut links = select_attr(document, r#"link[rel~="stylesheet"][href]"#, "href");
        links.extend(select_attr(document, r#"link[rel~="icon"][href]"#, "href"));
        links.extend(select_attr(document, "script[src]", "src"));
        links.extend(select_attr(document, "img[src]", "src"));
        links
    }
}

/// Collects trimmed, non-empty `attr` values of elements matching `selector`
fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let mut values = Vec::new();

    if let Ok(selector) = Selector::parse(selector) {
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    values.push(value.to_string());
                }
            }
        }
    }

    values
}
