//! Turns a homework into the text sent to the student.

use review_api::types::{HOMEWORK_NAME_KEY, ReviewStatus, STATUS_KEY};
use serde_json::Value;

use crate::WatchError;
use crate::dedup::{Fingerprint, Subject};
use crate::validator::TrackedItem;

/// Longest status value quoted back in an error
const MAX_STATUS_CHARS: usize = 64;

/// A message ready to be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message text
    pub text: String,
    /// What the message is about, for deduplication
    pub fingerprint: Fingerprint,
}

impl Notification {
    /// Report about a response the watcher could not make sense of
    #[must_use]
    pub fn error_report(error: &WatchError) -> Self {
        let text = error.to_string();
        Self {
            fingerprint: Fingerprint {
                subject: Subject::ApplicationError,
                digest: text.clone(),
            },
            text,
        }
    }
}

/// Build the status-change message for a homework.
///
/// # Errors
///
/// - [`WatchError::MissingExpectedKeys`] when `homework_name` or `status` is absent
/// - [`WatchError::UnexpectedShape`] when `homework_name` is not a string
/// - [`WatchError::UnknownStatus`] when the status is not one of the documented ones
pub fn translate(item: &TrackedItem) -> Result<Notification, WatchError> {
    let name = item
        .raw
        .get(HOMEWORK_NAME_KEY)
        .ok_or(WatchError::MissingExpectedKeys(HOMEWORK_NAME_KEY))?
        .as_str()
        .ok_or(WatchError::UnexpectedShape(HOMEWORK_NAME_KEY))?;
    let status = item
        .raw
        .get(STATUS_KEY)
        .ok_or(WatchError::MissingExpectedKeys(STATUS_KEY))?;
    let status = match *status {
        Value::String(ref status) => status
            .parse::<ReviewStatus>()
            .map_err(|err| WatchError::UnknownStatus(truncated(&err.0)))?,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            return Err(WatchError::UnknownStatus(truncated(&status.to_string())));
        }
    };

    let subject = Subject::Item(item.id.clone().unwrap_or_else(|| name.to_owned()));
    Ok(Notification {
        text: format!("Status changed for \"{name}\": {}", status.verdict()),
        fingerprint: Fingerprint {
            subject,
            digest: status.as_str().to_owned(),
        },
    })
}

fn truncated(status: &str) -> String {
    match status.char_indices().nth(MAX_STATUS_CHARS) {
        Some((end, _)) => format!("{}...", status.get(..end).unwrap_or_default()),
        None => status.to_owned(),
    }
}
