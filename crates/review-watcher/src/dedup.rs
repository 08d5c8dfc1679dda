//! Suppresses notifications that would repeat the last delivered one.
//!
//! Only the latest delivered digest is kept per subject, so memory is bounded by the number of
//! tracked homeworks and a status that comes back after a different one is announced again.

use std::collections::HashMap;

/// What a notification is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A homework, keyed by its id (or its name when the API sends no id)
    Item(String),
    /// Reports about malformed upstream payloads
    ApplicationError,
}

/// Identifies the content of a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// What the notification is about
    pub subject: Subject,
    /// Status code for homeworks, full text for error reports
    pub digest: String,
}

/// In-memory record of the last delivered notification per subject
#[derive(Debug, Default)]
pub struct Deduplicator {
    last_sent: HashMap<Subject, String>,
}

impl Deduplicator {
    /// Create an empty deduplicator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` iff the same digest was the last one recorded for this subject
    #[must_use]
    pub fn should_send(&self, fingerprint: &Fingerprint) -> bool {
        self.last_sent
            .get(&fingerprint.subject)
            .is_none_or(|digest| *digest != fingerprint.digest)
    }

    /// Remember a delivered notification. Call only after delivery succeeded.
    pub fn record_sent(&mut self, fingerprint: Fingerprint) {
        self.last_sent.insert(fingerprint.subject, fingerprint.digest);
    }

    /// Number of subjects with a recorded notification
    #[must_use]
    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    /// No notification has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}
