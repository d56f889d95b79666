//! Crawl statistics
//!
//! Counters collected by the crawl loop while it runs, and a printer for the
//! end-of-run summary.

use std::collections::HashMap;

/// What happened to one dispatched URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Fetched successfully and written to the mirror
    Stored,
    /// Fetched, but the content type is not one we mirror
    Skipped,
    /// Fetched with a non-success status; not stored
    HttpError,
    /// The fetch itself failed (timeout, connection error, ...)
    FetchFailed,
    /// Fetched, but writing to the mirror failed
    WriteFailed,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Number of URLs dispatched for fetching
    pub dispatched: u64,

    /// Count of completed fetches by outcome
    pub outcomes: HashMap<Outcome, u64>,

    /// Total bytes written into the mirror
    pub bytes_written: u64,

    /// New crawl targets contributed by extracted links
    pub links_discovered: u64,
}

impl CrawlStatistics {
    pub fn record(&mut self, outcome: Outcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of fetches that have resolved, whatever their outcome
    pub fn completed(&self) -> u64 {
        self.outcomes.values().sum()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs dispatched: {}", stats.dispatched);
    println!("  New links discovered: {}", stats.links_discovered);
    println!("  Bytes written: {}", stats.bytes_written);
    println!();

    println!("Resources by Outcome:");
    let mut outcome_counts: Vec<_> = stats.outcomes.iter().collect();
    outcome_counts.sort_by(|a, b| b.1.cmp(a.1));

    let completed = stats.completed();
    for (outcome, count) in outcome_counts {
        let percentage = if completed > 0 {
            (*count as f64 / completed as f64) * 100.0
        } else {
            0.0
        };
        println!("  {:?}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    println!(
        "Mirrored {} of {} fetched resources",
        stats.count(Outcome::Stored),
        completed
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut stats = CrawlStatistics::default();
        stats.record(Outcome::Stored);
        stats.record(Outcome::Stored);
        stats.record(Outcome::Skipped);

        assert_eq!(stats.count(Outcome::Stored), 2);
        assert_eq!(stats.count(Outcome::Skipped), 1);
        assert_eq!(stats.count(Outcome::FetchFailed), 0);
        assert_eq!(stats.completed(), 3);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = CrawlStatistics::default();
        assert_eq!(stats.completed(), 0);
        assert_eq!(stats.dispatched, 0);
        print_statistics(&stats);
    }
}
