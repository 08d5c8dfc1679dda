use core::time::Duration;

use bin_util::ValidateConfig;
use eyre::ensure;
use redact::Secret;
use serde::Deserialize;

use crate::WatchError;
use crate::scheduler::LoopSettings;

/// Top-level configuration of the watcher.
///
/// Loaded from an optional TOML file with environment variables layered on top, so `API_TOKEN`
/// fills `api_token`. The three credentials are optional here only so that a missing one can be
/// named precisely by [`Config::credentials`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Token for the review-status API
    #[serde(default)]
    pub api_token: Option<Secret<String>>,
    /// Telegram bot token
    #[serde(default)]
    pub notify_token: Option<Secret<String>>,
    /// Chat the notifications are sent to
    #[serde(
        default,
        deserialize_with = "common_serde_utils::optional_string_or_number"
    )]
    pub notify_channel_id: Option<String>,

    /// Review-status endpoint
    #[serde(default = "config_defaults::review_api_url")]
    pub review_api_url: url::Url,
    /// Telegram Bot API root
    #[serde(default = "config_defaults::telegram_api_url")]
    pub telegram_api_url: url::Url,

    /// Pause between cycles that reached the api
    #[serde(
        rename = "poll_interval_secs",
        default = "config_defaults::poll_interval",
        deserialize_with = "common_serde_utils::duration_secs_decode"
    )]
    pub poll_interval: Duration,
    /// Pause after the api could not be reached
    #[serde(
        rename = "retry_interval_secs",
        default = "config_defaults::retry_interval",
        deserialize_with = "common_serde_utils::duration_secs_decode"
    )]
    pub retry_interval: Duration,
    /// Client-side timeout of a single HTTP request
    #[serde(
        rename = "request_timeout_secs",
        default = "config_defaults::request_timeout",
        deserialize_with = "common_serde_utils::duration_secs_decode"
    )]
    pub request_timeout: Duration,

    /// `from_date` of the first fetch; the start time of the process when absent
    #[serde(default)]
    pub initial_from_date: Option<u64>,
    /// Deliver a report when the api response cannot be understood
    #[serde(default = "config_defaults::report_errors")]
    pub report_errors: bool,

    /// Port of the health and status server; the server is not started when absent
    #[serde(default)]
    pub health_check_port: Option<u16>,
    /// Consecutive transient failures after which the health probes fail
    #[serde(default = "config_defaults::unhealthy_after_failures")]
    pub unhealthy_after_failures: usize,
}

/// The values without which the watcher cannot start
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Token for the review-status API
    pub api_token: Secret<String>,
    /// Telegram bot token
    pub notify_token: Secret<String>,
    /// Chat the notifications are sent to
    pub channel_id: String,
}

impl Config {
    /// Extract the required credentials, checked in a fixed order.
    ///
    /// # Errors
    ///
    /// [`WatchError::ConfigMissing`] naming the first value that is absent or blank
    pub fn credentials(&self) -> Result<Credentials, WatchError> {
        let api_token = required(
            self.api_token.as_ref().map(|token| token.expose_secret().as_str()),
            "API_TOKEN",
        )?;
        let notify_token = required(
            self.notify_token
                .as_ref()
                .map(|token| token.expose_secret().as_str()),
            "NOTIFY_TOKEN",
        )?;
        let channel_id = required(self.notify_channel_id.as_deref(), "NOTIFY_CHANNEL_ID")?;
        Ok(Credentials {
            api_token: Secret::new(api_token),
            notify_token: Secret::new(notify_token),
            channel_id,
        })
    }

    /// Settings of the poll loop
    #[must_use]
    pub fn loop_settings(&self, channel_id: &str) -> LoopSettings {
        LoopSettings::builder()
            .channel_id(channel_id)
            .poll_interval(self.poll_interval)
            .retry_interval(self.retry_interval)
            .report_errors(self.report_errors)
            .build()
    }

    /// `from_date` of the first fetch
    #[must_use]
    pub fn initial_watermark(&self) -> u64 {
        self.initial_from_date.unwrap_or_else(|| {
            u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
        })
    }
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, WatchError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(WatchError::ConfigMissing(name))
}

impl ValidateConfig for Config {
    fn validate(&self) -> eyre::Result<()> {
        self.credentials()?;
        ensure!(
            !self.poll_interval.is_zero(),
            "poll_interval_secs must be positive"
        );
        ensure!(
            !self.retry_interval.is_zero(),
            "retry_interval_secs must be positive"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request_timeout_secs must be positive"
        );
        ensure!(
            self.unhealthy_after_failures > 0,
            "unhealthy_after_failures must be positive"
        );
        Ok(())
    }
}

pub(crate) mod config_defaults {
    use core::time::Duration;

    pub(crate) fn review_api_url() -> url::Url {
        url::Url::parse("https://practicum.yandex.ru/api/user_api/homework_statuses/")
            .expect("default review api url is valid")
    }

    pub(crate) fn telegram_api_url() -> url::Url {
        url::Url::parse("https://api.telegram.org/").expect("default telegram api url is valid")
    }

    pub(crate) const fn poll_interval() -> Duration {
        Duration::from_secs(600)
    }

    pub(crate) const fn retry_interval() -> Duration {
        Duration::from_secs(600)
    }

    pub(crate) const fn request_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub(crate) const fn report_errors() -> bool {
        true
    }

    pub(crate) const fn unhealthy_after_failures() -> usize {
        5
    }
}
