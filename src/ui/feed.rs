//! Activity feed
//!
//! Entries are inferred by the client from what it did, not confirmed by the
//! server. They are broadcast to every subscriber and mirrored to tracing.
//! A subscriber that falls more than the channel capacity behind skips the
//! oldest entries.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{info, warn};

const FEED_CAPACITY: usize = 64;

/// Styling class of a feed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Action,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

pub struct ActivityFeed {
    tx: broadcast::Sender<LogEntry>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn push(&self, kind: LogKind, message: impl Into<String>) {
        let entry = LogEntry {
            at: Local::now(),
            kind,
            message: message.into(),
        };

        match kind {
            LogKind::Error => warn!(target: "feed", "{}", entry.message),
            _ => info!(target: "feed", "{}", entry.message),
        }

        // No subscribers is fine
        let _ = self.tx.send(entry);
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}
