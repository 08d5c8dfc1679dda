//! Types for the review-status API
//!
//! The response envelope is kept as an opaque JSON value. Its shape is checked by the caller so
//! that missing keys and wrong shapes can be reported separately from transport errors.

use core::fmt::{Display, Formatter};
use core::str::FromStr;

/// Parsed, but otherwise unchecked, response body
pub type RawResponse = serde_json::Value;

/// Name of the field holding the list of tracked homeworks
pub const HOMEWORKS_KEY: &str = "homeworks";
/// Name of the field holding the server time to use as the next `from_date`
pub const CURRENT_DATE_KEY: &str = "current_date";
/// Name of the homework field with a human readable name
pub const HOMEWORK_NAME_KEY: &str = "homework_name";
/// Name of the homework field with the review status
pub const STATUS_KEY: &str = "status";
/// Name of the homework field with its id
pub const ID_KEY: &str = "id";

/// Review status of a single homework
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    /// The reviewer accepted the work
    Approved,
    /// The work is being reviewed right now
    Reviewing,
    /// The reviewer returned the work with comments
    Rejected,
}

impl ReviewStatus {
    /// Human readable sentence sent to the student for this status
    #[must_use]
    pub const fn verdict(self) -> &'static str {
        match self {
            Self::Approved => "The work has been reviewed: the reviewer liked everything. Hooray!",
            Self::Reviewing => "The work has been taken for review by the reviewer.",
            Self::Rejected => "The work has been reviewed: the reviewer has comments.",
        }
    }

    /// Status code as it appears on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status code is not one of the documented ones
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("undocumented review status `{0}`")]
pub struct UnknownReviewStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = UnknownReviewStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownReviewStatus(other.to_owned())),
        }
    }
}
