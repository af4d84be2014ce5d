//! Append-only log surfaced to the control surface
//!
//! Every lifecycle event (open, message, error, close, reconnect attempt,
//! dropped command) becomes one [`LogEntry`]. Entries are kept for the life of
//! the process and also fanned out to live subscribers.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;

const FEED_CAPACITY: usize = 256;

/// One human-readable log line
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    /// Seconds since the log was created
    pub at: f64,
    pub text: String,
}

/// Shared, cheaply cloneable log sequence
#[derive(Clone)]
pub struct LogBook {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    feed: broadcast::Sender<LogEntry>,
    started: Instant,
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBook {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            feed,
            started: Instant::now(),
        }
    }

    pub fn push(&self, text: impl Into<String>) {
        let entry = LogEntry {
            at: self.started.elapsed().as_secs_f64(),
            text: text.into(),
        };
        self.entries.lock().push(entry.clone());
        // No subscribers is fine
        let _ = self.feed.send(entry);
    }

    /// Snapshot of every entry so far, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries whose text contains `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.text.contains(needle))
            .count()
    }

    /// Live feed of entries pushed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.feed.subscribe()
    }
}
