use core::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::TelegramApiError;

/// Client for the Telegram Bot API
#[derive(Clone, Debug)]
pub struct TelegramClient {
    inner: reqwest::Client,
    // `<api>/bot<token>/sendMessage`
    send_message_url: redact::Secret<url::Url>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    /// Create a new [`TelegramClient`] for the bot identified by `token`.
    ///
    /// `api_url` is the Bot API root, normally `https://api.telegram.org/`.
    ///
    /// # Errors
    ///
    /// If the url cannot be built or the reqwest client cannot be constructed
    #[instrument(skip(token), name = "creating telegram client")]
    pub fn new(
        api_url: &url::Url,
        token: &redact::Secret<String>,
        timeout: Duration,
    ) -> Result<Self, TelegramApiError> {
        let send_message_url =
            api_url.join(&format!("bot{}/sendMessage", token.expose_secret()))?;
        let inner = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            inner,
            send_message_url: redact::Secret::new(send_message_url),
        })
    }

    /// Send `text` to the chat `chat_id`.
    ///
    /// # Errors
    ///
    /// - transport failures
    /// - [`TelegramApiError::Rejected`] when the API answers with a non-success status or with
    ///   `"ok": false`
    #[instrument(name = "send_message", skip(self, text), err)]
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramApiError> {
        let response = self
            .inner
            .post(self.send_message_url.expose_secret().clone())
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // The Bot API answers with JSON even on errors; anything else came from a proxy.
        match serde_json::from_slice::<ApiResponse>(&body) {
            Ok(ApiResponse { ok: true, .. }) if status.is_success() => {
                tracing::debug!("message delivered");
                Ok(())
            }
            Ok(ApiResponse { description, .. }) => Err(TelegramApiError::Rejected {
                status,
                description: description.unwrap_or_else(|| "no description".to_owned()),
            }),
            Err(_) => Err(TelegramApiError::Rejected {
                status,
                description: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}
