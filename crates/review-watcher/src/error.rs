#![expect(missing_docs, reason = "the error macro already is descriptive enough")]

use review_api::ReviewApiError;
use telegram_api::TelegramApiError;

/// Everything that can go wrong while watching review statuses.
///
/// Variants hold rendered messages instead of sources so that an error can be stored in the
/// status snapshot and compared in tests.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("missing required configuration value {0}")]
    ConfigMissing(&'static str),
    #[error("review api endpoint is unavailable: {0}")]
    EndpointUnavailable(String),
    #[error("malformed review api response: {0}")]
    MalformedResponse(String),
    #[error("missing expected key `{0}` in review api response")]
    MissingExpectedKeys(&'static str),
    #[error("unexpected shape of `{0}` in review api response")]
    UnexpectedShape(&'static str),
    #[error("undocumented homework status `{0}`")]
    UnknownStatus(String),
    #[error("notification was not delivered: {0}")]
    DeliveryFailed(String),
}

impl WatchError {
    /// Fetch-level failures: the cycle is retried after the retry interval and the watermark
    /// stays where it is.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            *self,
            Self::EndpointUnavailable(_) | Self::MalformedResponse(_)
        )
    }
}

impl From<ReviewApiError> for WatchError {
    fn from(err: ReviewApiError) -> Self {
        match err {
            ReviewApiError::MalformedResponse(_) => Self::MalformedResponse(err.to_string()),
            ReviewApiError::ReqwestWithMiddleware(_)
            | ReviewApiError::Reqwest(_)
            | ReviewApiError::InvalidToken(_)
            | ReviewApiError::EndpointUnavailable { .. } => {
                Self::EndpointUnavailable(err.to_string())
            }
        }
    }
}

impl From<TelegramApiError> for WatchError {
    fn from(err: TelegramApiError) -> Self {
        Self::DeliveryFailed(err.to_string())
    }
}
