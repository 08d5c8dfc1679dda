//! Watches the review status of homeworks and notifies the student through Telegram.
//!
//! One poll cycle fetches every status change since the current watermark, checks the response
//! envelope, turns the newest homework into a notification text and delivers it unless the same
//! text was the last one delivered for that homework.

pub mod config;
pub mod dedup;
mod error;
pub mod interfaces;
pub mod scheduler;
pub mod snapshot;
pub mod translator;
pub mod validator;
pub mod watermark;

pub use error::WatchError;
pub use {review_api, telegram_api};
