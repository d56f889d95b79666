//! Crawler coordinator - main crawl orchestration logic
//!
//! A [`Crawler`] owns everything one crawl needs: the frontier, the scope
//! filter, the dispatcher, the mirror writer and the completion tracker.
//! [`Crawler::run`] drives a single loop task:
//! - pending URLs are popped and fetched concurrently, up to
//!   `max-concurrent-fetches` at a time
//! - fetch results are processed on the loop task only, so the frontier is
//!   never touched concurrently
//! - URLs pushed through a [`CrawlHandle`] are merged between results
//!
//! The loop returns once nothing is pending and nothing is in flight.
//! [`Crawler::serve`] keeps a node alive past that point, waking whenever a
//! handle pushes more work.

use crate::config::Config;
use crate::crawler::completion::CompletionTracker;
use crate::crawler::css::{BackgroundImageExtractor, CssExtractor};
use crate::crawler::dispatch::{Dispatch, Dispatcher};
use crate::crawler::distributor::{CrawlHandle, Distributor, PeerDistributor};
use crate::crawler::fetcher::{FetchError, FetchedResource, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{AjaxExtractor, AnchorExtractor, AssetExtractor, HtmlExtractor};
use crate::mirror::{LinkRewriter, LocalFs, MirrorFs, MirrorWriter};
use crate::output::{CrawlStatistics, Outcome};
use crate::url::{reject_patterns, CrawlTarget, RejectFn, ScopeFilter};
use crate::Result;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};

type FetchOutcome = (String, std::result::Result<FetchedResource, FetchError>);

enum Event {
    Fetched(std::result::Result<FetchOutcome, JoinError>),
    Pushed(Vec<String>),
}

/// Assembles a [`Crawler`], optionally replacing any of its collaborators
pub struct CrawlerBuilder {
    config: Config,
    fetcher: Option<Arc<dyn Fetcher>>,
    html_extractor: Option<Box<dyn HtmlExtractor>>,
    ajax_extractor: Option<Box<dyn HtmlExtractor>>,
    css_extractor: Option<Box<dyn CssExtractor>>,
    distributor: Option<Arc<dyn Distributor>>,
    peers: Vec<CrawlHandle>,
    fs: Option<Arc<dyn MirrorFs>>,
    reject: Option<RejectFn>,
    date: Option<NaiveDate>,
}

impl CrawlerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            fetcher: None,
            html_extractor: None,
            ajax_extractor: None,
            css_extractor: None,
            distributor: None,
            peers: Vec::new(),
            fs: None,
            reject: None,
            date: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replaces the anchor extractor; its references are rewritten in stored pages
    pub fn html_extractor(mut self, extractor: Box<dyn HtmlExtractor>) -> Self {
        self.html_extractor = Some(extractor);
        self
    }

    /// Replaces the AJAX extractor; its references are followed but not rewritten
    pub fn ajax_extractor(mut self, extractor: Box<dyn HtmlExtractor>) -> Self {
        self.ajax_extractor = Some(extractor);
        self
    }

    pub fn css_extractor(mut self, extractor: Box<dyn CssExtractor>) -> Self {
        self.css_extractor = Some(extractor);
        self
    }

    /// Replaces the distributor entirely, ignoring any [`Self::peers`]
    pub fn distributor(mut self, distributor: Arc<dyn Distributor>) -> Self {
        self.distributor = Some(distributor);
        self
    }

    /// Other nodes that share discovered URLs with this one, round-robin
    pub fn peers(mut self, peers: Vec<CrawlHandle>) -> Self {
        self.peers = peers;
        self
    }

    pub fn fs(mut self, fs: Arc<dyn MirrorFs>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Reject predicate used instead of the configured patterns
    pub fn reject<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(predicate));
        self
    }

    /// Run date used for the mirror directory; defaults to today
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds the crawler and seeds it with the base URL
    ///
    /// Prepares the mirror directory, removing an earlier mirror of the same
    /// day when `output.clean` is set.
    pub fn build(self) -> Result<Crawler> {
        let config = self.config;
        let target = CrawlTarget::new(&config.crawler.base_url)?;

        let mut filter = ScopeFilter::new(target);
        filter.set_reject(self.reject.or_else(|| reject_patterns(&config.crawler.reject)));

        let anchors: Box<dyn HtmlExtractor> = match self.html_extractor {
            Some(extractor) => extractor,
            None => Box::new(AnchorExtractor),
        };
        let mut page_extractors = vec![anchors];
        if config.crawler.follow_assets {
            page_extractors.push(Box::new(AssetExtractor));
        }
        let ajax: Box<dyn HtmlExtractor> = match self.ajax_extractor {
            Some(extractor) => extractor,
            None => Box::new(AjaxExtractor),
        };
        let css: Box<dyn CssExtractor> = match self.css_extractor {
            Some(extractor) => extractor,
            None => Box::new(BackgroundImageExtractor),
        };
        let dispatcher = Dispatcher::new(
            LinkRewriter::new(&config.output.subfolder),
            page_extractors,
            vec![ajax],
            css,
        );

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::from_config(
                &config.user_agent,
                Duration::from_secs(config.crawler.request_timeout),
            )?),
        };

        let fs: Arc<dyn MirrorFs> = match self.fs {
            Some(fs) => fs,
            None => Arc::new(LocalFs),
        };
        let date = self
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let writer = MirrorWriter::new(
            fs,
            Path::new(&config.output.mirror_root),
            date,
            &config.output.subfolder,
        );
        writer.prepare(config.output.clean)?;

        let completion = CompletionTracker::new();
        let (tx, inbox) = mpsc::unbounded_channel();
        let handle = CrawlHandle::new(
            tx,
            format!("{}:{}", config.node.host, config.node.port),
            completion.signal(),
        );

        let distributor: Arc<dyn Distributor> = match self.distributor {
            Some(distributor) => distributor,
            None => {
                let mut peers = vec![handle.clone()];
                peers.extend(self.peers);
                Arc::new(PeerDistributor::new(peers))
            }
        };

        let mut crawler = Crawler {
            filter,
            frontier: Frontier::new(),
            dispatcher,
            fetcher,
            writer,
            distributor,
            handle,
            inbox,
            completion,
            max_concurrent: config.crawler.max_concurrent_fetches.max(1) as usize,
        };

        let seed = crawler.filter.target().base_url().to_string();
        crawler.push([seed]);

        Ok(crawler)
    }
}

/// Crawls one site into a local mirror
pub struct Crawler {
    filter: ScopeFilter,
    frontier: Frontier,
    dispatcher: Dispatcher,
    fetcher: Arc<dyn Fetcher>,
    writer: MirrorWriter,
    distributor: Arc<dyn Distributor>,
    handle: CrawlHandle,
    inbox: mpsc::UnboundedReceiver<Vec<String>>,
    completion: CompletionTracker,
    max_concurrent: usize,
}

impl Crawler {
    pub fn builder(config: Config) -> CrawlerBuilder {
        CrawlerBuilder::new(config)
    }

    /// Builds a crawler with all default collaborators
    pub fn new(config: Config) -> Result<Self> {
        CrawlerBuilder::new(config).build()
    }

    pub fn target(&self) -> &CrawlTarget {
        self.filter.target()
    }

    /// Runs references through the dedup pipeline and queues the survivors
    ///
    /// Returns how many URLs were newly queued. Queuing anything makes a
    /// finished crawl not done again; call [`Crawler::run`] to process them.
    pub fn push<I, S>(&mut self, references: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = self.frontier.dedup(references, &self.filter);
        let added = self.frontier.enqueue(accepted);
        if added > 0 {
            self.completion.reopen();
            tracing::debug!("Queued {} new URLs", added);
        }
        added
    }

    /// Installs the reject predicate, replacing configured patterns
    pub fn reject<F>(&mut self, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter.set_reject(Some(Arc::new(predicate)));
    }

    /// Registers the callback fired each time the crawl drains
    pub fn on_complete<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.completion.set_on_complete(Box::new(callback))
    }

    /// Registers the callback fired whenever [`Crawler::run`] returns
    pub fn after_run<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.completion.set_after_run(Box::new(callback))
    }

    pub fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    /// Watch channel that turns `true` each time the crawl drains
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.completion.subscribe()
    }

    /// Every URL dispatched so far, sorted
    pub fn sitemap(&self) -> Vec<String> {
        self.frontier.sitemap()
    }

    /// `host:port` identity of this node
    pub fn peer_url(&self) -> &str {
        self.handle.peer_url()
    }

    /// Directory the mirror is written to
    pub fn store_path(&self) -> &Path {
        self.writer.store_path()
    }

    /// A handle for pushing URLs into this crawler, including while it runs
    pub fn handle(&self) -> CrawlHandle {
        self.handle.clone()
    }

    /// Crawls until nothing is pending and no fetch is in flight
    ///
    /// May be called again after further pushes; each call reports the
    /// statistics of its own drain.
    pub async fn run(&mut self) -> Result<CrawlStatistics> {
        let mut stats = CrawlStatistics::default();
        let mut in_flight: JoinSet<FetchOutcome> = JoinSet::new();
        let start_time = Instant::now();
        let mut last_reported = 0;

        self.drain_inbox();
        tracing::info!(
            "Starting crawl of {} with {} URLs pending",
            self.target().base_url(),
            self.frontier.pending_len()
        );

        loop {
            self.spawn_fetches(&mut in_flight, &mut stats);
            if in_flight.is_empty() {
                // Pushes that raced with the last result
                self.drain_inbox();
                if self.frontier.is_empty() {
                    break;
                }
                continue;
            }

            let event = tokio::select! {
                Some(joined) = in_flight.join_next() => Event::Fetched(joined),
                Some(urls) = self.inbox.recv() => Event::Pushed(urls),
                else => break,
            };

            match event {
                Event::Fetched(Ok((url, result))) => {
                    self.handle_fetched(url, result, &mut stats);
                }
                Event::Fetched(Err(e)) => {
                    tracing::error!("Fetch task failed: {}", e);
                    stats.record(Outcome::FetchFailed);
                }
                Event::Pushed(urls) => {
                    self.push(urls);
                }
            }

            let completed = stats.completed();
            if progress_due(completed, &mut last_reported) {
                let rate = completed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} resources fetched, {} pending, {} in flight, {:.2} resources/sec",
                    completed,
                    self.frontier.pending_len(),
                    in_flight.len(),
                    rate
                );
            }
        }

        self.completion.complete();
        tracing::info!(
            "Crawl drained: {} URLs fetched, {} stored in {:?}",
            stats.dispatched,
            stats.count(Outcome::Stored),
            start_time.elapsed()
        );
        self.completion.finish_run();

        Ok(stats)
    }

    /// Runs, then waits for a handle to push more work and runs again
    ///
    /// Never returns on its own while the crawler holds its own handle; drop
    /// or abort the task to stop the node.
    pub async fn serve(&mut self) -> Result<()> {
        loop {
            self.run().await?;

            tracing::debug!("{} idle, waiting for work", self.peer_url());
            match self.inbox.recv().await {
                Some(urls) => {
                    self.push(urls);
                }
                None => return Ok(()),
            }
        }
    }

    fn drain_inbox(&mut self) {
        while let Ok(urls) = self.inbox.try_recv() {
            self.push(urls);
        }
    }

    fn spawn_fetches(
        &mut self,
        in_flight: &mut JoinSet<FetchOutcome>,
        stats: &mut CrawlStatistics,
    ) {
        while in_flight.len() < self.max_concurrent {
            let Some(url) = self.frontier.pop() else {
                break;
            };

            tracing::debug!("Fetching {}", url);
            stats.dispatched += 1;

            let fetcher = Arc::clone(&self.fetcher);
            in_flight.spawn(async move {
                let result = fetcher.fetch(&url).await;
                (url, result)
            });
        }
    }

    fn handle_fetched(
        &mut self,
        url: String,
        result: std::result::Result<FetchedResource, FetchError>,
        stats: &mut CrawlStatistics,
    ) {
        let resource = match result {
            Ok(resource) => resource,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                stats.record(Outcome::FetchFailed);
                return;
            }
        };

        let (body, discovered, is_html) = match self.dispatcher.dispatch(&resource, &self.filter) {
            Dispatch::Store {
                body,
                discovered,
                is_html,
            } => (body, discovered, is_html),
            Dispatch::Skip { media_type } => {
                tracing::info!(
                    "Don't know how to handle content type {:?} of {}, skipping",
                    media_type,
                    url
                );
                stats.record(if resource.is_success() {
                    Outcome::Skipped
                } else {
                    Outcome::HttpError
                });
                return;
            }
        };

        let accepted = self.frontier.dedup(&discovered, &self.filter);
        if !accepted.is_empty() {
            tracing::debug!("{} new URLs found on {}", accepted.len(), url);
            stats.links_discovered += accepted.len() as u64;
            self.distributor.distribute(accepted);
        }

        if !resource.is_success() {
            tracing::warn!(
                "Status {} signals an error, not storing {}",
                resource.status_code,
                url
            );
            stats.record(Outcome::HttpError);
            return;
        }

        let relative = self.filter.target().relative(&url);
        match self.writer.store(&relative, is_html, &body) {
            Ok(_) => {
                stats.record(Outcome::Stored);
                stats.bytes_written += body.len() as u64;
            }
            Err(e) => {
                tracing::error!("Failed to store {}: {}", url, e);
                stats.record(Outcome::WriteFailed);
            }
        }
    }
}

/// True once per multiple of ten completed fetches
fn progress_due(completed: u64, last_reported: &mut u64) -> bool {
    if completed == *last_reported || completed % 10 != 0 {
        return false;
    }
    *last_reported = completed;
    true
}
