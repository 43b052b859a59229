use anyhow::{Context, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::domain::models::LoggingConfig;

const LOG_FILE_PREFIX: &str = "approvals.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
///
/// Console output goes to stderr so command output on stdout stays
/// machine-readable. Keep the value alive for the lifetime of the process;
/// dropping it flushes and stops the file writer.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber described by `config`.
    ///
    /// `RUST_LOG` overrides the configured level.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let (layers, guard) = build_layers(config)?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(
            level = %config.level,
            format = %config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );
        Ok(Self { _guard: guard })
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
}

fn build_layers(config: &LoggingConfig) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>)> {
    let level = parse_log_level(&config.level)?;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = match config.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_target(true)
            .with_filter(env_filter(level))
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(env_filter(level))
            .boxed(),
        other => anyhow::bail!("Invalid log format: {other}"),
    };
    layers.push(console);

    let guard = match &config.log_dir {
        Some(log_dir) => {
            let appender = match config.rotation.as_str() {
                "hourly" => rolling::hourly(log_dir, LOG_FILE_PREFIX),
                "never" => rolling::never(log_dir, LOG_FILE_PREFIX),
                _ => rolling::daily(log_dir, LOG_FILE_PREFIX),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);

            // Files are always JSON for later ingestion.
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(env_filter(level))
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    Ok((layers, guard))
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_build_layers_with_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            log_dir: Some(dir.path().display().to_string()),
            rotation: "never".to_string(),
        };
        let (layers, guard) = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 2);
        assert!(guard.is_some());
    }

    #[test]
    fn test_build_layers_rejects_unknown_format() {
        let config = LoggingConfig { format: "xml".to_string(), ..LoggingConfig::default() };
        assert!(build_layers(&config).is_err());
    }
}
