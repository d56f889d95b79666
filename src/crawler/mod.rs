//! Crawler module for fetching, dispatching and mirroring resources
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] seam
//! - HTML and CSS link extraction
//! - Content-type dispatch
//! - The frontier (pending queue and visited set)
//! - Completion tracking and work distribution
//! - Overall crawl coordination in [`Crawler`]

mod completion;
mod coordinator;
mod css;
mod dispatch;
mod distributor;
mod fetcher;
mod frontier;
mod parser;

pub use completion::{CompletionCallback, CompletionTracker};
pub use coordinator::{Crawler, CrawlerBuilder};
pub use css::{
    flatten_stylesheet, url_arguments, BackgroundImageExtractor, CssError, CssExtractor,
    Declaration, DEFAULT_MEDIA,
};
pub use dispatch::{ContentKind, Dispatch, Dispatcher};
pub use distributor::{CrawlHandle, Distributor, PeerDistributor};
pub use fetcher::{build_http_client, FetchError, FetchedResource, Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use parser::{parse_document, AjaxExtractor, AnchorExtractor, AssetExtractor, HtmlExtractor};

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Prepare the dated mirror directory
/// 2. Build the HTTP client
/// 3. Seed the frontier with the base URL
/// 4. Fetch, dispatch and store until the site is exhausted
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - The crawl drained
/// * `Err(MirrorError)` - Setup failed
pub async fn crawl(config: Config) -> Result<CrawlStatistics> {
    let mut crawler = Crawler::new(config)?;
    tracing::info!(
        "Mirroring {} into {} as {}",
        crawler.target().base_url(),
        crawler.store_path().display(),
        crawler.peer_url()
    );
    crawler.run().await
}
