//! Checks the shape of a review-status response and extracts the tracked homeworks.

use review_api::types::{CURRENT_DATE_KEY, HOMEWORKS_KEY, ID_KEY, RawResponse};
use serde_json::{Map, Value};

use crate::WatchError;

/// A single homework as returned by the API.
///
/// Only the id is lifted out; name and status stay in `raw` and are checked by the
/// [`crate::translator`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    /// Homework id; the API sends either a string or a number
    pub id: Option<String>,
    /// The homework object as received
    pub raw: Map<String, Value>,
}

impl TrackedItem {
    /// Wrap a homework object
    #[must_use]
    pub fn new(raw: Map<String, Value>) -> Self {
        let id = raw.get(ID_KEY).and_then(|id| match *id {
            Value::String(ref id) => Some(id.clone()),
            Value::Number(ref id) => Some(id.to_string()),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        });
        Self { id, raw }
    }
}

/// Result of a successful validation
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The `homeworks` list is empty: nothing changed since the watermark
    NoNewStatus,
    /// Homeworks in upstream order, newest first
    Items(Vec<TrackedItem>),
}

/// Validate the envelope and extract the homeworks.
///
/// # Errors
///
/// - [`WatchError::MalformedResponse`] when the body is not a JSON object
/// - [`WatchError::MissingExpectedKeys`] when `homeworks` is absent
/// - [`WatchError::UnexpectedShape`] when `homeworks` is not a list of objects
pub fn validate(raw: &RawResponse) -> Result<Validation, WatchError> {
    let Value::Object(ref envelope) = *raw else {
        return Err(WatchError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_type(raw)
        )));
    };
    let homeworks = envelope
        .get(HOMEWORKS_KEY)
        .ok_or(WatchError::MissingExpectedKeys(HOMEWORKS_KEY))?;
    let Value::Array(ref homeworks) = *homeworks else {
        return Err(WatchError::UnexpectedShape(HOMEWORKS_KEY));
    };
    if homeworks.is_empty() {
        return Ok(Validation::NoNewStatus);
    }

    let items = homeworks
        .iter()
        .map(|homework| match *homework {
            Value::Object(ref homework) => Ok(TrackedItem::new(homework.clone())),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                Err(WatchError::UnexpectedShape(HOMEWORKS_KEY))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(count = items.len(), "extracted homeworks");
    Ok(Validation::Items(items))
}

/// Name of the JSON type, without the value itself
const fn json_type(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The server time to query from next time, if the response carries a usable one.
#[must_use]
pub fn current_date(raw: &RawResponse) -> Option<u64> {
    raw.get(CURRENT_DATE_KEY).and_then(Value::as_u64)
}
