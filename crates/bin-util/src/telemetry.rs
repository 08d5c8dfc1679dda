//! Tracing subscriber setup shared by the binaries.
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

/// Install the global tracing subscriber.
///
/// Every crate in `crates` logs at `info` by default; `RUST_LOG` directives are applied on top.
/// A `RUST_LOG` directive that cannot be parsed is skipped with a warning on stderr.
/// Debug builds print human readable lines, release builds print JSON with the current span.
///
/// # Errors
/// When a global subscriber is already installed
pub fn init(crates: &[&str]) -> eyre::Result<()> {
    let filter = env_filter(
        crates,
        std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
    );

    let output_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_ansi(cfg!(debug_assertions))
        .with_file(true)
        .with_writer(std::io::stderr);

    // use json logging for release builds
    let subscriber = Registry::default().with(filter).with(ErrorLayer::default());
    if cfg!(debug_assertions) {
        subscriber.with(output_layer.boxed()).try_init()?;
    } else {
        subscriber
            .with(output_layer.json().with_current_span(true).boxed())
            .try_init()?;
    }

    Ok(())
}

fn env_filter(crates: &[&str], env_directives: Option<&str>) -> EnvFilter {
    let directives = ["hyper=error", "reqwest=error", "axum=warn"]
        .into_iter()
        .map(ToOwned::to_owned)
        .chain(crates.iter().map(|crate_name| format!("{crate_name}=info")))
        .chain(env_directives.map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    EnvFilter::builder().parse_lossy(directives.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crates_default_to_info() {
        let filter = env_filter(&["review_watcher", "bin_util"], None).to_string();

        assert!(filter.contains("review_watcher=info"));
        assert!(filter.contains("bin_util=info"));
        assert!(filter.contains("hyper=error"));
    }

    #[test]
    fn test_invalid_env_directive_is_skipped() {
        let filter = env_filter(
            &["review_watcher"],
            Some("review_api=notalevel,review_watcher=debug,,telegram_api=trace"),
        )
        .to_string();

        assert!(filter.contains("review_watcher=debug"));
        assert!(filter.contains("telegram_api=trace"));
        assert!(!filter.contains("notalevel"));
    }
}
