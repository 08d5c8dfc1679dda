//! Minimal Telegram Bot API client.
//!
//! Only `sendMessage` is bound: the watcher needs nothing else from the channel.

mod client;
pub use client::TelegramClient;
mod error;
pub use error::TelegramApiError;
