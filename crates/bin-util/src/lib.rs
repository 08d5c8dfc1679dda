//! Binary utils

pub mod health_check;
pub mod telemetry;

use std::path::Path;

use eyre::Context as _;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Post-deserialization checks that serde cannot express
pub trait ValidateConfig {
    /// Check the loaded values.
    ///
    /// # Errors
    /// When a value is missing or out of range
    fn validate(&self) -> eyre::Result<()>;
}

/// Load `T` from an optional TOML file layered under the process environment, then validate it.
///
/// Environment variables win over the file and are matched case-insensitively to field names,
/// so `API_TOKEN` fills `api_token`. A missing file is not an error: everything may come from
/// the environment.
///
/// # Errors
/// When the file is unreadable, a value has the wrong type, or [`ValidateConfig::validate`]
/// fails
pub fn try_deserialize<T: DeserializeOwned + ValidateConfig>(config_path: &Path) -> eyre::Result<T> {
    if !config_path.exists() {
        tracing::debug!(?config_path, "config file not found, using environment only");
    }

    let config = config::Config::builder()
        .add_source(
            config::File::from(config_path)
                .format(config::FileFormat::Toml)
                .required(false),
        )
        .add_source(config::Environment::default().try_parsing(true))
        .build()
        .wrap_err("cannot read config sources")?
        .try_deserialize::<T>()
        .wrap_err("invalid config content")?;
    config.validate()?;
    Ok(config)
}

/// Ensures backtrace is enabled
pub fn ensure_backtrace_set() {
    // SAFETY: called at the start of `main`, before any other thread exists
    unsafe {
        std::env::set_var("RUST_BACKTRACE", "full");
    }
}

/// Register cancel token and ctrl+c handler
///
/// # Panics
///   on failure to register ctr+c handler
#[allow(
    clippy::print_stdout,
    reason = "not a tracing msg, should always display"
)]
#[must_use]
pub fn register_cancel() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    ctrlc::set_handler(move || {
        if ctrlc_token.is_cancelled() {
            #[expect(clippy::restriction, reason = "immediate exit")]
            std::process::exit(1);
        } else {
            println!("\nGraceful shutdown initiated. Press Ctrl+C again for immediate exit...");
            ctrlc_token.cancel();
        }
    })
    .expect("Failed to register ctrl+c handler");
    cancel_token
}
