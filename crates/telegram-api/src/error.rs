#![expect(missing_docs, reason = "the error macro already is descriptive enough")]

/// Error variants for the Telegram Bot API
///
/// None of the variants carry the request url: it embeds the bot token.
#[derive(thiserror::Error, Debug)]
pub enum TelegramApiError {
    #[error("Reqwest error {0}")]
    Reqwest(reqwest::Error),
    #[error("Url parse error {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("telegram rejected the message ({status}): {description}")]
    Rejected {
        status: reqwest::StatusCode,
        description: String,
    },
}

impl From<reqwest::Error> for TelegramApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(err.without_url())
    }
}
