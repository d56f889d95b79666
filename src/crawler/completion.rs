//! Completion tracking for the crawl loop
//!
//! The crawl is done once the pending queue is empty and no fetch is in
//! flight. It stays done until new URLs arrive, whether pushed on the crawler
//! or through a [`crate::CrawlHandle`]. Observers can either register
//! callbacks or watch a [`tokio::sync::watch`] channel.

use crate::{MirrorError, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Callback fired on completion events
pub type CompletionCallback = Box<dyn FnMut() + Send>;

/// Shared done flag; `true` while the crawl is drained
pub(crate) type DoneSignal = Arc<watch::Sender<bool>>;

/// Flips `signal` back to not done, notifying watchers only on a change
pub(crate) fn reopen_signal(signal: &watch::Sender<bool>) -> bool {
    signal.send_if_modified(|done| std::mem::replace(done, false))
}

pub struct CompletionTracker {
    on_complete: Option<CompletionCallback>,
    after_run: Option<CompletionCallback>,
    signal: DoneSignal,
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            on_complete: None,
            after_run: None,
            signal: Arc::new(signal),
        }
    }

    pub fn is_done(&self) -> bool {
        *self.signal.borrow()
    }

    /// The done flag, shared with handles that may reopen it
    pub(crate) fn signal(&self) -> DoneSignal {
        Arc::clone(&self.signal)
    }

    /// Receiver that observes `true` while the crawl is drained
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Registers the callback fired each time the queue drains
    ///
    /// Only one may be registered.
    pub fn set_on_complete(&mut self, callback: CompletionCallback) -> Result<()> {
        if self.on_complete.is_some() {
            return Err(MirrorError::CallbackRegistered("on complete"));
        }
        self.on_complete = Some(callback);
        Ok(())
    }

    /// Registers the callback fired when [`crate::Crawler::run`] returns
    ///
    /// Only one may be registered.
    pub fn set_after_run(&mut self, callback: CompletionCallback) -> Result<()> {
        if self.after_run.is_some() {
            return Err(MirrorError::CallbackRegistered("after run"));
        }
        self.after_run = Some(callback);
        Ok(())
    }

    /// Work arrived; the next drain fires completion again
    pub fn reopen(&mut self) {
        reopen_signal(&self.signal);
    }

    /// Marks the crawl drained, firing `on complete` once per drain
    pub fn complete(&mut self) {
        if self.is_done() {
            return;
        }
        self.signal.send_replace(true);

        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    pub fn finish_run(&mut self) {
        if let Some(callback) = self.after_run.as_mut() {
            callback();
        }
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, CompletionCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback: CompletionCallback = Box::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_complete_fires_once_per_drain() {
        let mut tracker = CompletionTracker::new();
        let (count, callback) = counter();
        tracker.set_on_complete(callback).unwrap();

        tracker.complete();
        tracker.complete();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(tracker.is_done());

        tracker.reopen();
        assert!(!tracker.is_done());
        tracker.complete();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregistered_callbacks_are_fine() {
        let mut tracker = CompletionTracker::new();
        tracker.complete();
        tracker.finish_run();
        assert!(tracker.is_done());
    }

    #[test]
    fn test_second_registration_rejected() {
        let mut tracker = CompletionTracker::new();
        let (_, first) = counter();
        let (_, second) = counter();

        tracker.set_on_complete(first).unwrap();
        let result = tracker.set_on_complete(second);
        assert!(matches!(
            result,
            Err(MirrorError::CallbackRegistered("on complete"))
        ));

        let (_, first) = counter();
        let (_, second) = counter();
        tracker.set_after_run(first).unwrap();
        assert!(tracker.set_after_run(second).is_err());
    }

    #[test]
    fn test_after_run_fires_on_every_finish() {
        let mut tracker = CompletionTracker::new();
        let (count, callback) = counter();
        tracker.set_after_run(callback).unwrap();

        tracker.finish_run();
        tracker.finish_run();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_watch_signal_follows_state() {
        let mut tracker = CompletionTracker::new();
        let receiver = tracker.subscribe();
        assert!(!*receiver.borrow());

        tracker.complete();
        assert!(*receiver.borrow());

        tracker.reopen();
        assert!(!*receiver.borrow());
    }

    #[test]
    fn test_shared_signal_reopens_tracker() {
        let mut tracker = CompletionTracker::new();
        let (count, callback) = counter();
        tracker.set_on_complete(callback).unwrap();
        tracker.complete();

        let signal = tracker.signal();
        assert!(reopen_signal(&signal));
        assert!(!tracker.is_done());
        assert!(!reopen_signal(&signal));

        tracker.complete();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
