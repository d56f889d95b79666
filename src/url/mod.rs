//! URL handling module for Roundabout
//!
//! This module provides reference normalization, the crawl target (host
//! scoping and relative paths), reject-pattern matching, and the scope filter
//! that gates every candidate URL before it may be queued.

mod domain;
mod matcher;
mod normalize;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// Re-export main functions
pub use domain::CrawlTarget;
pub use matcher::matches_glob;
pub use normalize::normalize_reference;

/// Caller-supplied predicate; returning true keeps a URL out of the crawl
pub type RejectFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Builds a reject predicate from glob patterns
///
/// Returns `None` for an empty list.
pub fn reject_patterns(patterns: &[String]) -> Option<RejectFn> {
    if patterns.is_empty() {
        return None;
    }

    let patterns = patterns.to_vec();
    Some(Arc::new(move |url: &str| {
        patterns.iter().any(|pattern| matches_glob(pattern, url))
    }))
}

/// Decides whether a normalized URL may ever be fetched
///
/// A URL is skipped when it is on another host, when it has already been
/// visited, or when the reject predicate says so. The checks run in that
/// order, so a visited URL is never offered to the predicate again.
#[derive(Clone)]
pub struct ScopeFilter {
    target: CrawlTarget,
    reject: Option<RejectFn>,
}

impl ScopeFilter {
    pub fn new(target: CrawlTarget) -> Self {
        Self {
            target,
            reject: None,
        }
    }

    pub fn target(&self) -> &CrawlTarget {
        &self.target
    }

    /// Installs (or replaces) the reject predicate
    pub fn set_reject(&mut self, reject: Option<RejectFn>) {
        self.reject = reject;
    }

    pub fn should_skip(&self, url: &str, visited: &HashSet<String>) -> bool {
        if !self.target.same_host(url) {
            tracing::trace!("Out of scope (host): {}", url);
            return true;
        }

        if visited.contains(url) {
            tracing::trace!("Already visited: {}", url);
            return true;
        }

        self.rejects(url)
    }

    /// Same host and not rejected, regardless of whether it was visited
    ///
    /// Links failing this are never written to the mirror, so stored pages
    /// keep pointing at the live site for them.
    pub fn in_scope(&self, url: &str) -> bool {
        self.target.same_host(url) && !self.rejects(url)
    }

    fn rejects(&self, url: &str) -> bool {
        match &self.reject {
            Some(reject) if reject(url) => {
                tracing::debug!("Rejected by predicate: {}", url);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeFilter")
            .field("target", &self.target)
            .field("reject", &self.reject.is_some())
            .finish()
    }
}
