//! Timed notices shown to the user
//!
//! The session raises a notice when a document fails to load, when a page
//! fails to render, and once per document for the edit tip. A host shows
//! [`Notices::current`] and calls [`Notices::update`] to expire old ones.

use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub expires_at: Instant,
}

impl Notice {
    pub fn time_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Newest-first notice queue.
///
/// Raising a message that is already queued moves it to the front with a
/// fresh expiry, so a page that keeps failing shows a single error.
#[derive(Debug)]
pub struct Notices {
    queue: Vec<Notice>,
    default_duration: Duration,
    /// One-shot messages raised since the last rearm
    raised_once: HashSet<String>,
}

impl Notices {
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            queue: Vec::new(),
            default_duration,
            raised_once: HashSet::new(),
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, level: NoticeLevel) {
        self.notify_for(message, level, self.default_duration);
    }

    pub fn notify_for(
        &mut self,
        message: impl Into<String>,
        level: NoticeLevel,
        duration: Duration,
    ) {
        let message = message.into();
        self.queue.retain(|n| n.message != message);
        self.queue.insert(
            0,
            Notice {
                message,
                level,
                expires_at: Instant::now() + duration,
            },
        );
    }

    /// Raise `message` unless it was raised since the last [`Notices::rearm`].
    /// Returns whether it was raised.
    pub fn notify_once(&mut self, message: &str, level: NoticeLevel, duration: Duration) -> bool {
        if !self.raised_once.insert(message.to_string()) {
            return false;
        }
        self.notify_for(message, level, duration);
        true
    }

    /// Let one-shot messages be raised again, e.g. for a newly opened document
    pub fn rearm(&mut self) {
        self.raised_once.clear();
    }

    /// Drop expired notices, returns true if any were removed
    pub fn update(&mut self) -> bool {
        self.expire(Instant::now())
    }

    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.expires_at > now);
        self.queue.len() != before
    }

    /// The most recent notice
    pub fn current(&self) -> Option<&Notice> {
        self.queue.first()
    }

    pub fn all(&self) -> &[Notice] {
        &self.queue
    }
}
