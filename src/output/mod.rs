//! Output module for crawl reporting
//!
//! The mirror itself is written by [`crate::mirror`]; this module only keeps
//! track of what happened during a run and renders it for the terminal.

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics, Outcome};
