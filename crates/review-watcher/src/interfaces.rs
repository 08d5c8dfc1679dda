//! Seams between the poll loop and the outside world.
//!
//! The scheduler only talks to these traits so a cycle can be driven without any I/O.

use core::future::Future;

use review_api::ReviewApiClient;
use review_api::types::RawResponse;
use telegram_api::TelegramClient;

use crate::WatchError;

/// Source of homework status changes
pub trait FetchStatuses {
    /// Fetch every status change since `from_date` (Unix seconds).
    ///
    /// Only [`WatchError::EndpointUnavailable`] and [`WatchError::MalformedResponse`] are
    /// expected here.
    fn fetch(&self, from_date: u64) -> impl Future<Output = Result<RawResponse, WatchError>> + Send;
}

/// Channel the student is notified through
pub trait DeliverNotification {
    /// Deliver `text` to `channel_id`; any failure is a [`WatchError::DeliveryFailed`]
    fn deliver(
        &self,
        channel_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), WatchError>> + Send;
}

impl FetchStatuses for ReviewApiClient {
    async fn fetch(&self, from_date: u64) -> Result<RawResponse, WatchError> {
        Ok(self.fetch_statuses(from_date).await?)
    }
}

impl DeliverNotification for TelegramClient {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<(), WatchError> {
        Ok(self.send_message(channel_id, text).await?)
    }
}
