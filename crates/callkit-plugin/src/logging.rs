//! Global `tracing` subscriber installation
//!
//! Hosts that already run their own subscriber can skip this module; every
//! crate in the workspace only emits through `tracing` macros.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingSettings;
use crate::error::{CallKitError, CallKitResult};

/// Resolved subscriber options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    /// JSON lines on stdout instead of the human-readable format
    pub json: bool,
    /// Source file and line on every record
    pub file_info: bool,
    /// Records for span enter and exit
    pub spans: bool,
}

impl LoggingConfig {
    /// Resolve loaded settings, rejecting an unknown level name
    pub fn from_settings(settings: &LoggingSettings) -> CallKitResult<Self> {
        Ok(Self {
            level: parse_log_level(&settings.level)?,
            json: settings.json,
            file_info: settings.file_info,
            spans: settings.spans,
        })
    }
}

/// Install the process-wide subscriber.
///
/// `RUST_LOG` directives are honoured on top of the configured level. Fails
/// with [`CallKitError::Logging`] when a global subscriber is already set.
pub fn setup_logging(config: LoggingConfig) -> CallKitResult<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());
    let span_events = if config.spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| CallKitError::logging(format!("subscriber already installed: {e}")))?;

    tracing::info!(version = crate::VERSION, level = %config.level, "Call service logging ready");
    Ok(())
}

/// Parse a level name such as `debug` or `WARN`
pub fn parse_log_level(level: &str) -> CallKitResult<Level> {
    Level::from_str(level).map_err(|_| CallKitError::config(format!("Invalid log level: {level}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("loud").unwrap_err().code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "trace".into(),
            json: true,
            file_info: false,
            spans: true,
        };
        let config = LoggingConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config,
            LoggingConfig {
                level: Level::TRACE,
                json: true,
                file_info: false,
                spans: true,
            }
        );
    }
}
