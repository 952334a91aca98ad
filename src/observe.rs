//! Structured events for failures the caller does not see.
//!
//! Decrypt skips and persistence failures never reach the caller of
//! `history()` or `convert()`; they are handed to an [`Observer`] instead.
//! [`TracingObserver`] is the production observer.

use parking_lot::Mutex;

/// Which ledger sink an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Primary,
    Secondary,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A conversion succeeded; plaintext is deliberately not carried
    Converted { packages: usize },
    DecodeFailed { error: String },
    EncryptFailed { error: String },
    PersistenceFailed { sink: SinkKind, error: String },
    /// `index` is the record's position in the primary sink
    DecryptSkipped { index: usize, error: String },
    /// A stored entry that is not a record; `position` is 1-based
    UnreadableSkipped { sink: SinkKind, position: usize },
}

pub trait Observer: Send + Sync {
    fn observe(&self, event: &Event);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, event: &Event) {
        match event {
            Event::Converted { packages } => {
                tracing::info!(packages, "converted measurement input")
            }
            Event::DecodeFailed { error } => {
                tracing::warn!(%error, "rejected measurement input")
            }
            Event::EncryptFailed { error } => {
                tracing::error!(%error, "history record not encrypted")
            }
            Event::PersistenceFailed { sink, error } => {
                tracing::error!(%sink, %error, "history record not persisted")
            }
            Event::DecryptSkipped { index, error } => {
                tracing::warn!(index, %error, "skipping undecryptable history record")
            }
            Event::UnreadableSkipped { sink, position } => {
                tracing::warn!(%sink, position, "skipping unreadable history entry")
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn decrypt_skips(&self) -> usize {
        self.count(|e| matches!(e, Event::DecryptSkipped { .. }))
    }

    pub fn unreadable_skips(&self) -> usize {
        self.count(|e| matches!(e, Event::UnreadableSkipped { .. }))
    }

    pub fn persistence_failures(&self) -> usize {
        self.count(|e| matches!(e, Event::PersistenceFailed { .. }))
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl Observer for RecordingObserver {
    fn observe(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}
