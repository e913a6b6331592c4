//! Tracing subscriber setup for the binary
//!
//! Diagnostics go to stderr so stdout stays free for JSON records.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Build the filter. `RUST_LOG` wins over the configured level.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|err| {
            eprintln!("invalid log level {:?} ({err}); using info", config.level);
            EnvFilter::new("info")
        })
    })
}

/// Install the global subscriber.
///
/// When `config.directory` is set a daily rolling file is written there as
/// well; the returned guard must be held until exit so buffered lines reach
/// the file.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(true).with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = daily(dir, format!("{}.log", config.file_prefix));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter(config))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(level = %config.level, json = config.json, directory = ?config.directory, "Logging initialised");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_falls_back() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "adcplink=loud".into(),
            ..LoggingConfig::default()
        };
        assert_eq!(filter(&config).to_string(), "info");
    }
}
