//! Work distribution between crawl nodes
//!
//! Every crawler owns an inbox. A [`CrawlHandle`] is the sending half of it,
//! tagged with the node's `host:port` identity. Accepted URLs are handed to a
//! [`Distributor`], which decides which inbox they land in. With the default
//! single-handle [`PeerDistributor`] everything goes back to this crawler.

use crate::crawler::completion::{reopen_signal, DoneSignal};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Sending half of a crawler's inbox
///
/// Cheap to clone. URLs pushed here go through the receiving crawler's
/// dedup pipeline before they are queued, whether it is running or not.
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    tx: mpsc::UnboundedSender<Vec<String>>,
    peer: String,
    done: DoneSignal,
}

impl CrawlHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Vec<String>>,
        peer: String,
        done: DoneSignal,
    ) -> Self {
        Self { tx, peer, done }
    }

    /// Queues references on the owning crawler
    ///
    /// A delivered batch marks that crawler not done until it has been
    /// processed. Returns false if the crawler no longer exists.
    pub fn push<I, S>(&self, urls: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return true;
        }
        if self.tx.send(urls).is_err() {
            return false;
        }
        reopen_signal(&self.done);
        true
    }

    /// `host:port` of the owning node
    pub fn peer_url(&self) -> &str {
        &self.peer
    }
}

/// Hands accepted URLs to some crawler's inbox
pub trait Distributor: Send + Sync {
    fn distribute(&self, urls: Vec<String>);
}

/// Spreads URLs round-robin across a fixed set of peers
#[derive(Debug)]
pub struct PeerDistributor {
    peers: Vec<CrawlHandle>,
    cursor: AtomicUsize,
}

impl PeerDistributor {
    pub fn new(peers: Vec<CrawlHandle>) -> Self {
        Self {
            peers,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn peers(&self) -> &[CrawlHandle] {
        &self.peers
    }
}

impl Distributor for PeerDistributor {
    fn distribute(&self, urls: Vec<String>) {
        if self.peers.is_empty() {
            tracing::warn!("No peers to distribute {} URLs to", urls.len());
            return;
        }

        let mut batches: Vec<Vec<String>> = vec![Vec::new(); self.peers.len()];
        for url in urls {
            let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.peers.len();
            batches[slot].push(url);
        }

        for (peer, batch) in self.peers.iter().zip(batches) {
            if batch.is_empty() {
                continue;
            }
            if !peer.push(batch) {
                tracing::warn!("Peer {} is gone; URLs dropped", peer.peer_url());
            }
        }
    }
}
