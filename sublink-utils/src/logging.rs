//! Logging infrastructure for sublink
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::fs::File;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Identity, SubscriberExt},
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{paths, Result, SublinkError};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SUBLINK_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr (for the station console)
    Stderr,
    /// Log to both stderr and file (for the vehicle daemon)
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "debug", "sublink_station=debug,tokio=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "sublink.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the control station (stderr, the console is the UI)
    pub fn station() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: false,
            file_name: Some("station.log".into()),
        }
    }

    /// Create config for the vehicle daemon (stderr and file)
    pub fn vehicle() -> Self {
        Self {
            output: LogOutput::Both,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: true,
            file_name: Some("vehicle.log".into()),
        }
    }

    /// Override the filter, keeping everything else
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    init_logging_with_layer(config, None::<Identity>)
}

/// Initialize logging with an extra layer installed next to the formatters
///
/// The extra layer sees every event; the configured filter only applies to
/// the formatting layers.
pub fn init_logging_with_layer<L>(config: LogConfig, extra: Option<L>) -> Result<()>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter = parse_filter(&config.filter)?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    let file_name = config.file_name.as_deref().unwrap_or("sublink.log");
    let registry = tracing_subscriber::registry().with(extra);

    match config.output {
        LogOutput::Stderr => {
            registry
                .with(fmt_layer.with_writer(std::io::stderr).with_filter(filter))
                .try_init()
                .map_err(|e| SublinkError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(file_name)?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(parse_filter(&config.filter)?);

            registry
                .with(fmt_layer.with_writer(std::io::stderr).with_filter(filter))
                .with(file_layer)
                .try_init()
                .map_err(|e| SublinkError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| SublinkError::config(format!("Invalid log filter: {}", e)))
}

fn open_log_file(file_name: &str) -> Result<File> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|e| SublinkError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| SublinkError::FileWrite {
            path: log_path,
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.span_events);
        assert!(!config.file_line);
    }

    #[test]
    fn test_log_config_station() {
        let config = LogConfig::station();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.file_name.as_deref(), Some("station.log"));
    }

    #[test]
    fn test_log_config_vehicle() {
        let config = LogConfig::vehicle();
        assert_eq!(config.output, LogOutput::Both);
        assert!(config.file_line);
        assert_eq!(config.file_name.as_deref(), Some("vehicle.log"));
    }

    #[test]
    fn test_log_config_vehicle_with_env() {
        let original = env::var(LOG_ENV).ok();
        env::set_var(LOG_ENV, "sublink_vehicle=trace");

        let config = LogConfig::vehicle();
        assert_eq!(config.filter, "sublink_vehicle=trace");

        match original {
            Some(val) => env::set_var(LOG_ENV, val),
            None => env::remove_var(LOG_ENV),
        }
    }

    #[test]
    fn test_with_filter_override() {
        let config = LogConfig::station().with_filter("warn");
        assert_eq!(config.filter, "warn");
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_parse_filter_valid() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("sublink_station=debug,tokio=warn").is_ok());
    }

    #[test]
    fn test_parse_filter_invalid() {
        let err = parse_filter("sublink_station=notalevel").unwrap_err();
        assert!(matches!(err, SublinkError::Config(_)));
        assert!(err.to_string().contains("Invalid log filter"));
    }
}
