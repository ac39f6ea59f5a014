//! Telemetry for the ALDPI agent
//!
//! - `metrics` - Prometheus counters and histograms for pipeline runs
//! - `event` - `PipelineEvent` records appended to a JSON-lines log
//!
//! Telemetry never changes a command's outcome: a failed event write is
//! logged and counted, the command result stands.

pub mod event;
pub mod metrics;

pub use event::{calculate_inputs_hash, EventLog, Operation, PipelineEvent};
pub use metrics::{OperationTimer, PipelineMetrics, PipelineMetricsRegistry};

use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Failed to serialize event: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Failed to write event log: {0}")]
    EventLogFailed(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Enable Prometheus metrics
    pub enable_metrics: bool,

    /// Append a `PipelineEvent` per command to this file
    pub event_log: Option<PathBuf>,

    /// Write the metrics text exposition here after each command
    pub metrics_out: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            event_log: None,
            metrics_out: None,
        }
    }
}

impl TelemetryConfig {
    /// Create a new config builder
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            enable_metrics: lookup("ALDPI_ENABLE_METRICS")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            event_log: lookup("ALDPI_EVENT_LOG")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            metrics_out: lookup("ALDPI_METRICS_OUT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Builder for TelemetryConfig
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TelemetryConfig::default(),
        }
    }

    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.config.enable_metrics = enable;
        self
    }

    pub fn event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.event_log = Some(path.into());
        self
    }

    pub fn metrics_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.metrics_out = Some(path.into());
        self
    }

    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so that JSON and YAML output on stdout stays clean.
/// `RUST_LOG` takes precedence over the verbosity flags.
pub fn init_logging(verbose: u8, quiet: bool, json: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aldpi_core={lvl},aldpi_cli={lvl},warn", lvl = default_level)));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // a second init (tests) is not an error worth surfacing
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert!(config.enable_metrics);
        assert!(config.event_log.is_none());
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::builder()
            .enable_metrics(false)
            .event_log("/tmp/events.jsonl")
            .build();
        assert!(!config.enable_metrics);
        assert_eq!(config.event_log, Some(PathBuf::from("/tmp/events.jsonl")));
        assert!(config.metrics_out.is_none());
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("ALDPI_ENABLE_METRICS", "false"),
            ("ALDPI_EVENT_LOG", "events.jsonl"),
            ("ALDPI_METRICS_OUT", " "),
        ]
        .into_iter()
        .collect();

        let config = TelemetryConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(!config.enable_metrics);
        assert_eq!(config.event_log, Some(PathBuf::from("events.jsonl")));
        assert!(config.metrics_out.is_none());
    }

    #[test]
    fn test_unparseable_flag_keeps_default() {
        let config = TelemetryConfig::from_lookup(|k| {
            (k == "ALDPI_ENABLE_METRICS").then(|| "maybe".to_string())
        });
        assert!(config.enable_metrics);
    }
}
