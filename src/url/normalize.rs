use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves a reference found in a document to an absolute URL
///
/// # Normalization Steps
///
/// 1. Strip a trailing fragment (everything from the first `#`)
/// 2. If the reference is already absolute and has a host, keep it
/// 3. Otherwise resolve it against `base` with standard relative resolution
/// 4. An empty resolved path becomes `/`
///
/// References that cannot be resolved are reported as errors; callers drop
/// them rather than failing the crawl.
///
/// # Examples
///
/// ```
/// use roundabout::url::normalize_reference;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let url = normalize_reference("/docs/intro#setup", &base).unwrap();
/// assert_eq!(url, "https://example.com/docs/intro");
/// ```
pub fn normalize_reference(reference: &str, base: &Url) -> UrlResult<String> {
    let reference = strip_fragment(reference.trim());

    if let Ok(url) = Url::parse(reference) {
        if url.has_host() {
            return Ok(url.into());
        }
    }

    let mut absolute = base
        .join(reference)
        .map_err(|e| UrlError::Parse(format!("{}: {}", reference, e)))?;

    if absolute.path().is_empty() {
        absolute.set_path("/");
    }

    Ok(absolute.into())
}

fn strip_fragment(reference: &str) -> &str {
    match reference.find('#') {
        Some(idx) => &reference[..idx],
        None => reference,
    }
}
