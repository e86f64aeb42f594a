//! Logging and tracing initialization.
//!
//! Warnings and errors always reach the console. When a log file is
//! configured it receives everything at the configured level and the
//! console drops to warnings only; without one, the console carries the
//! configured level itself.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::SuncastResult;

/// Initialize the tracing subscriber with the given configuration.
///
/// Fails only when the log file cannot be opened. A subscriber that is
/// already installed is left in place.
pub fn init_logging(config: &LoggingConfig) -> SuncastResult<()> {
    let file_layer: Option<Box<dyn Layer<Registry> + Send + Sync>> = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true);
            let layer = if config.json {
                layer.json().with_filter(level_filter(&config.level)).boxed()
            } else {
                layer.with_filter(level_filter(&config.level)).boxed()
            };
            Some(layer)
        }
        None => None,
    };

    let console_filter = if file_layer.is_some() {
        EnvFilter::new("warn")
    } else {
        level_filter(&config.level)
    };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .ok();
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suncast.log");
        let config = LoggingConfig {
            level: "debug".to_string(),
            json: true,
            file: Some(path.clone()),
        };
        init_logging(&config).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_logging_rejects_unwritable_file() {
        let config = LoggingConfig {
            level: "info".to_string(),
            json: false,
            file: Some("/nonexistent-dir/suncast.log".into()),
        };
        assert!(init_logging(&config).is_err());
    }
}
