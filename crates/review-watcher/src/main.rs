//! # Review Watcher
//!
//! Polls the review-status API and tells the student through a Telegram bot whenever the
//! review status of their latest homework changes.
//!
//! This binary provides:
//! - the poll loop with in-process deduplication of notifications
//! - an optional health check and status server
//! - graceful shutdown on ctrl+c
//!
//! ## Usage
//!
//! ```bash
//! API_TOKEN=... NOTIFY_TOKEN=... NOTIFY_CHANNEL_ID=... review-watcher --config-path watcher.toml
//! ```
//!
//! ## Configuration
//!
//! Values are read from an optional TOML file, then from the environment (a `.env` file is
//! loaded first when present). See [`review_watcher::config::Config`] for the keys.

use std::path::PathBuf;
use std::sync::Arc;

use bin_util::health_check;
use clap::Parser;
use review_watcher::config::Config;
use review_watcher::review_api::ReviewApiClient;
use review_watcher::scheduler::Scheduler;
use review_watcher::telegram_api::TelegramClient;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "review-watcher", about = "Homework review status notifier")]
struct Cli {
    #[arg(
        long,
        short,
        env = "REVIEW_WATCHER_CONFIG",
        default_value = "review-watcher.toml",
        help = "Config path"
    )]
    config_path: PathBuf,
}

fn main() -> eyre::Result<()> {
    #[cfg(debug_assertions)]
    bin_util::ensure_backtrace_set();
    _ = dotenvy::dotenv();
    color_eyre::install()?;
    bin_util::telemetry::init(&["review_watcher", "review_api", "telegram_api", "bin_util"])?;

    let cli = Cli::parse();
    let config = match bin_util::try_deserialize::<Config>(&cli.config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, config_path = ?cli.config_path, "cannot start");
            return Err(err);
        }
    };
    let cancel_token = bin_util::register_cancel();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config, cancel_token))
}

async fn run(config: Config, cancel_token: CancellationToken) -> eyre::Result<()> {
    let credentials = config.credentials()?;
    let fetcher = ReviewApiClient::new(
        config.review_api_url.clone(),
        &credentials.api_token,
        config.request_timeout,
    )?;
    let notifier = TelegramClient::new(
        &config.telegram_api_url,
        &credentials.notify_token,
        config.request_timeout,
    )?;
    let scheduler = Scheduler::new(
        fetcher,
        notifier,
        config.loop_settings(&credentials.channel_id),
        config.initial_watermark(),
    );

    let server = config.health_check_port.map(|port| {
        let reader = scheduler.snapshot_reader(config.unhealthy_after_failures);
        let server = health_check::Server::new(port, Arc::new(reader));
        let server_token = cancel_token.clone();
        tracing::debug!(port, "starting health check server");
        tokio::spawn(async move {
            let result = server.run(server_token.clone()).await;
            if result.is_err() {
                server_token.cancel();
            }
            result
        })
    });

    scheduler.run(cancel_token.clone()).await;
    cancel_token.cancel();

    if let Some(server) = server {
        server.await??;
    }
    tracing::info!("review watcher has been shut down");
    Ok(())
}
