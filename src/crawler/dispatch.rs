//! Content-type dispatch
//!
//! Decides what happens to a fetched resource based on its declared media
//! type: HTML and CSS are mined for references and rewritten for the mirror,
//! a fixed set of binary-ish types is stored verbatim, everything else is
//! skipped.

use crate::crawler::css::{flatten_stylesheet, CssExtractor};
use crate::crawler::fetcher::FetchedResource;
use crate::crawler::parser::{parse_document, HtmlExtractor};
use crate::mirror::{Link, LinkRewriter};
use crate::url::{normalize_reference, ScopeFilter};

/// How a resource is processed, by media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    /// Stored byte-for-byte, never parsed
    Verbatim,
    /// Neither parsed nor stored; carries the media type for logging
    Unknown(String),
}

impl ContentKind {
    /// Classifies a raw `Content-Type` header
    ///
    /// Only the media type matters: parameters after the first `;` are
    /// ignored, and the comparison is case-insensitive. A missing header is
    /// [`ContentKind::Unknown`].
    ///
    /// ```
    /// use roundabout::crawler::ContentKind;
    ///
    /// assert_eq!(ContentKind::from_header(Some("Text/HTML; charset=utf-8")), ContentKind::Html);
    /// assert_eq!(ContentKind::from_header(Some("image/webp")), ContentKind::Verbatim);
    /// ```
    pub fn from_header(header: Option<&str>) -> Self {
        let media_type = header
            .and_then(|h| h.split(';').next())
            .map(|h| h.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match media_type.as_str() {
            "text/html" => ContentKind::Html,
            "text/css" => ContentKind::Css,
            "text/javascript" | "application/javascript" | "application/pdf" => {
                ContentKind::Verbatim
            }
            other if other.starts_with("image/") => ContentKind::Verbatim,
            _ => ContentKind::Unknown(media_type),
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, ContentKind::Html)
    }
}

/// The result of processing one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Do not store; nothing was extracted
    Skip { media_type: String },
    /// Store `body` (already rewritten for HTML and CSS)
    Store {
        body: Vec<u8>,
        /// References exactly as found, before normalization and scoping
        discovered: Vec<String>,
        is_html: bool,
    },
}

/// Routes fetched resources to extractors and the link rewriter
pub struct Dispatcher {
    rewriter: LinkRewriter,
    /// Extractors whose references are also rewritten in place
    page_extractors: Vec<Box<dyn HtmlExtractor>>,
    /// Extractors whose references are only followed
    hint_extractors: Vec<Box<dyn HtmlExtractor>>,
    css_extractor: Box<dyn CssExtractor>,
}

impl Dispatcher {
    pub fn new(
        rewriter: LinkRewriter,
        page_extractors: Vec<Box<dyn HtmlExtractor>>,
        hint_extractors: Vec<Box<dyn HtmlExtractor>>,
        css_extractor: Box<dyn CssExtractor>,
    ) -> Self {
        Self {
            rewriter,
            page_extractors,
            hint_extractors,
            css_extractor,
        }
    }

    /// Processes one resource
    ///
    /// Only links `filter` keeps in scope are rewritten; rejected and foreign
    /// links are left pointing at the live site.
    pub fn dispatch(&self, resource: &FetchedResource, filter: &ScopeFilter) -> Dispatch {
        match ContentKind::from_header(resource.content_type.as_deref()) {
            ContentKind::Html => self.dispatch_html(resource, filter),
            ContentKind::Css => self.dispatch_css(resource, filter),
            ContentKind::Verbatim => Dispatch::Store {
                body: resource.body.clone(),
                discovered: Vec::new(),
                is_html: false,
            },
            ContentKind::Unknown(media_type) => Dispatch::Skip { media_type },
        }
    }

    fn dispatch_html(&self, resource: &FetchedResource, filter: &ScopeFilter) -> Dispatch {
        // Lossy text is only used for extraction; the stored body keeps its bytes
        let text = resource.text();
        let document = parse_document(&text);

        let page_refs: Vec<String> = self
            .page_extractors
            .iter()
            .flat_map(|extractor| extractor.extract(&document))
            .collect();
        let hint_refs = self
            .hint_extractors
            .iter()
            .flat_map(|extractor| extractor.extract(&document));

        let body = self
            .rewriter
            .rewrite_html(&resource.body, &links(&page_refs, filter));

        let mut discovered = page_refs;
        discovered.extend(hint_refs);

        Dispatch::Store {
            body,
            discovered,
            is_html: true,
        }
    }

    fn dispatch_css(&self, resource: &FetchedResource, filter: &ScopeFilter) -> Dispatch {
        let text = resource.text();

        let refs = match flatten_stylesheet(&text) {
            Ok(declarations) => self.css_extractor.extract(&declarations),
            Err(e) => {
                tracing::debug!("Not extracting links from {}: {}", resource.url, e);
                Vec::new()
            }
        };

        let body = self
            .rewriter
            .rewrite_css(&resource.body, &links(&refs, filter));

        Dispatch::Store {
            body,
            discovered: refs,
            is_html: false,
        }
    }
}

/// Pairs each in-scope reference with its path relative to the crawl root
///
/// Fragment-only references (`#top`) point inside the page itself and are
/// never rewritten.
fn links(refs: &[String], filter: &ScopeFilter) -> Vec<Link> {
    let target = filter.target();
    refs.iter()
        .filter(|raw| !raw.starts_with('#'))
        .filter_map(|raw| {
            let absolute = normalize_reference(raw, target.base_url()).ok()?;
            if !filter.in_scope(&absolute) {
                return None;
            }
            Some(Link::new(raw.as_str(), target.relative(&absolute)))
        })
        .collect()
}
