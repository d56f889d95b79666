use crate::{UrlError, UrlResult};
use url::Url;

/// The root of a crawl
///
/// Immutable for the lifetime of a crawl. Every scope decision compares a
/// candidate's host against [`CrawlTarget::host`], and every mirror path is
/// derived from a URL with [`CrawlTarget::relative`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    base_url: Url,
    prefix: String,
    host: String,
}

impl CrawlTarget {
    /// Parses the crawl root
    ///
    /// # Examples
    ///
    /// ```
    /// use roundabout::url::CrawlTarget;
    ///
    /// let target = CrawlTarget::new("https://Example.com").unwrap();
    /// assert_eq!(target.host(), "example.com");
    /// assert_eq!(target.base_url().as_str(), "https://example.com/");
    /// ```
    pub fn new(base_url: &str) -> UrlResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base_url.scheme().to_string()));
        }

        let host = base_url
            .host_str()
            .map(|h| h.to_lowercase())
            .ok_or(UrlError::MissingHost)?;
        let prefix = base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            base_url,
            prefix,
            host,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `url` lives on the crawl host
    ///
    /// Anything that fails to parse, or has no host, is treated as foreign.
    pub fn same_host(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .map(|h| h.eq_ignore_ascii_case(&self.host))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Strips the base URL from an absolute URL, giving the path (and query)
    /// relative to the mirror root
    ///
    /// The result always starts with `/`. URLs outside the base prefix fall
    /// back to their own path and query.
    ///
    /// ```
    /// use roundabout::url::CrawlTarget;
    ///
    /// let target = CrawlTarget::new("https://example.com/").unwrap();
    /// assert_eq!(target.relative("https://example.com/"), "/");
    /// assert_eq!(target.relative("https://example.com/a/b?c=1"), "/a/b?c=1");
    /// ```
    pub fn relative(&self, url: &str) -> String {
        if let Some(rest) = url.strip_prefix(&self.prefix) {
            if rest.is_empty() {
                return "/".to_string();
            }
            if rest.starts_with('/') {
                return rest.to_string();
            }
            if rest.starts_with('?') {
                return format!("/{}", rest);
            }
        }

        match Url::parse(url) {
            Ok(parsed) => match parsed.query() {
                Some(query) => format!("{}?{}", parsed.path(), query),
                None => parsed.path().to_string(),
            },
            Err(_) => format!("/{}", url.trim_start_matches('/')),
        }
    }
}
