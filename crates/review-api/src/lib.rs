//! Crate for interacting with the review-status API.
//! Used by the watcher to poll homework review statuses for a single student.

mod client;
pub use client::*;
mod error;
pub use error::ReviewApiError;
pub mod types;
pub use redact;
pub use reqwest::StatusCode;
