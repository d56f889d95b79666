//! Crawl frontier: pending queue and visited set
//!
//! The frontier is owned by the crawl loop and never shared, so it needs no
//! locking. It enforces the "fetched at most once" rule:
//! - a URL enters `pending` only after passing the scope filter
//! - a URL is moved to `visited` the moment it is popped for fetching
//! - `queued` mirrors `pending` so pushes have set-union semantics

use crate::url::{normalize_reference, ScopeFilter};
use std::collections::HashSet;

/// Pending URLs plus every URL already dispatched
#[derive(Debug, Default)]
pub struct Frontier {
    /// Popped from the back (LIFO)
    pending: Vec<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns raw references from one document into new crawl targets
    ///
    /// Empty references and duplicates are dropped (first occurrence wins),
    /// survivors are normalized against the crawl base and finally passed
    /// through the scope filter. References that fail to normalize are
    /// dropped.
    pub fn dedup<I, S>(&self, references: I, filter: &ScopeFilter) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = filter.target().base_url();
        let mut raw_seen = HashSet::new();
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for reference in references {
            let reference = reference.as_ref().trim();
            if reference.is_empty() || !raw_seen.insert(reference.to_string()) {
                continue;
            }

            let absolute = match normalize_reference(reference, base) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Dropping reference {:?}: {}", reference, e);
                    continue;
                }
            };

            if !seen.insert(absolute.clone()) {
                continue;
            }

            if !filter.should_skip(&absolute, &self.visited) {
                accepted.push(absolute);
            }
        }

        accepted
    }

    /// Adds URLs to the pending queue, ignoring ones already pending
    ///
    /// Returns how many were actually added.
    pub fn enqueue(&mut self, urls: impl IntoIterator<Item = String>) -> usize {
        let mut added = 0;
        for url in urls {
            if self.visited.contains(&url) || !self.queued.insert(url.clone()) {
                continue;
            }
            self.pending.push(url);
            added += 1;
        }
        added
    }

    /// Takes the next URL to fetch and marks it visited
    pub fn pop(&mut self) -> Option<String> {
        while let Some(url) = self.pending.pop() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Every dispatched URL, sorted
    pub fn sitemap(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().cloned().collect();
        urls.sort();
        urls
    }
}
