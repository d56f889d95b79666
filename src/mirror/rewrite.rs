//! Link rewriting for the offline mirror
//!
//! Every internal link found in a stored HTML or CSS document is rewritten so
//! it points at the file the mirror writer produces for it. Targets are
//! rooted at the versioned subfolder (`/v2/...`), so the dated mirror
//! directory can be served or browsed as-is.

use std::collections::HashSet;

/// A link found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The reference exactly as written in the document
    pub raw: String,
    /// The resolved URL relative to the crawl root, always starting with `/`
    pub relative: String,
}

impl Link {
    pub fn new(raw: impl Into<String>, relative: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            relative: relative.into(),
        }
    }
}

/// Maps in-document links to their mirror locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewriter {
    subfolder: String,
}

impl LinkRewriter {
    /// `subfolder` is the versioned directory inside the dated mirror, e.g. `v2`
    pub fn new(subfolder: &str) -> Self {
        let trimmed = subfolder.trim_matches('/');
        let subfolder = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        Self { subfolder }
    }

    /// The subfolder prefix, with a leading `/` and no trailing one
    pub fn subfolder(&self) -> &str {
        &self.subfolder
    }

    /// Mirror target for a link found in HTML
    ///
    /// | relative | target |
    /// |---|---|
    /// | `/` | `/v2/index.html` |
    /// | `/?a=1` | `/v2/index.html?a=1` |
    /// | `/docs/` | `/v2/docs/index.html` |
    /// | `/foo/bar` | `/v2/foo/bar.html` |
    /// | `/style.css` | `/v2/style.css` |
    ///
    /// ```
    /// use roundabout::mirror::LinkRewriter;
    ///
    /// let rewriter = LinkRewriter::new("v2");
    /// assert_eq!(rewriter.html_target("/foo/bar"), "/v2/foo/bar.html");
    /// ```
    pub fn html_target(&self, relative: &str) -> String {
        let (path, query) = split_query(relative);
        let path = if path.is_empty() { "/" } else { path };

        let target = if path.ends_with('/') {
            format!("{}/{}index.html{}", self.subfolder, path, query)
        } else if has_extension(path) {
            format!("{}/{}{}", self.subfolder, path, query)
        } else {
            format!("{}/{}{}.html", self.subfolder, path, query)
        };

        squeeze_slashes(&target)
    }

    /// Mirror target for a `url(...)` reference found in CSS
    pub fn css_target(&self, relative: &str) -> String {
        squeeze_slashes(&format!("{}/{}", self.subfolder, relative))
    }

    /// Rewrites quoted occurrences of `links` in an HTML body
    ///
    /// Only `"link"` and `'link'` are replaced, so a short link such as `/`
    /// cannot clobber unrelated text. Links that never appear quoted are left
    /// alone. The raw form keeps its `#fragment` on the rewritten target.
    ///
    /// Works on bytes: documents that are not UTF-8 keep their encoding.
    pub fn rewrite_html(&self, body: &[u8], links: &[Link]) -> Vec<u8> {
        let mut body = body.to_vec();

        for link in unique_links(links) {
            let target = self.html_target(&link.relative);
            let raw_target = format!("{}{}", target, fragment(&link.raw));
            body = replace_quoted(&body, &link.raw, &raw_target);
            if link.relative != link.raw {
                body = replace_quoted(&body, &link.relative, &target);
            }
        }

        body
    }

    /// Rewrites `url(...)` references in a stylesheet body
    pub fn rewrite_css(&self, body: &[u8], links: &[Link]) -> Vec<u8> {
        let mut body = body.to_vec();

        for link in unique_links(links) {
            let target = format!("{}{}", self.css_target(&link.relative), fragment(&link.raw));
            for (open, close) in [("url(", ")"), ("url('", "')"), ("url(\"", "\")")] {
                let old = format!("{}{}{}", open, link.raw, close);
                let new = format!("{}{}{}", open, target, close);
                body = replace_all(&body, old.as_bytes(), new.as_bytes());
            }
        }

        body
    }
}

fn replace_quoted(body: &[u8], from: &str, to: &str) -> Vec<u8> {
    let mut body = body.to_vec();
    for quote in ['"', '\''] {
        let old = format!("{quote}{from}{quote}");
        let new = format!("{quote}{to}{quote}");
        body = replace_all(&body, old.as_bytes(), new.as_bytes());
    }
    body
}

/// Non-overlapping, left to right, like [`str::replace`]
fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(idx) = rest.windows(from.len()).position(|window| window == from) {
        out.extend_from_slice(&rest[..idx]);
        out.extend_from_slice(to);
        rest = &rest[idx + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// The `#...` tail of a reference, or `""`
fn fragment(reference: &str) -> &str {
    reference.find('#').map_or("", |idx| &reference[idx..])
}

/// First occurrence of each raw reference, in document order
fn unique_links(links: &[Link]) -> Vec<&Link> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter(|link| !link.raw.is_empty() && seen.insert(link.raw.as_str()))
        .collect()
}

/// Splits `/a/b?x=1` into `("/a/b", "?x=1")`
pub(crate) fn split_query(relative: &str) -> (&str, &str) {
    match relative.find('?') {
        Some(idx) => relative.split_at(idx),
        None => (relative, ""),
    }
}

/// True if the final path segment carries a file extension
pub(crate) fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < segment.len(),
        None => false,
    }
}

/// Collapses runs of `/` into a single `/`
pub(crate) fn squeeze_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_slash = false;

    for c in input.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }

    out
}
