//! Service configuration
//!
//! Settings are layered: built-in defaults, then an optional file (format
//! picked from its extension), then `CALLKIT__*` environment variables, e.g.
//! `CALLKIT__DEDUP__DUPLICATE_WINDOW_MS=1500`.

use std::path::Path;
use std::time::Duration;

use callkit_core::{
    DEFAULT_DUPLICATE_WINDOW, DEFAULT_EVENT_CAPACITY, DEFAULT_STALE_WINDOW, UNKNOWN_CALLER_NAME,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CallKitError, CallKitResult};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CALLKIT";

/// Top-level configuration for the call service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallKitConfig {
    /// Duplicate action suppression
    pub dedup: DedupSettings,
    /// Ongoing-call indicator refresh
    pub ongoing: OngoingSettings,
    /// Event channel sizing
    pub events: EventSettings,
    /// Placeholders for missing payload fields
    pub defaults: DefaultSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Duplicate action suppression windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    pub duplicate_window_ms: u64,
    pub stale_window_ms: u64,
}

impl DedupSettings {
    pub fn duplicate_window(&self) -> Duration {
        Duration::from_millis(self.duplicate_window_ms)
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_millis(self.stale_window_ms)
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            duplicate_window_ms: DEFAULT_DUPLICATE_WINDOW.as_millis() as u64,
            stale_window_ms: DEFAULT_STALE_WINDOW.as_millis() as u64,
        }
    }
}

/// Ongoing-call indicator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OngoingSettings {
    /// How often the elapsed-time display is refreshed
    pub update_interval_ms: u64,
}

impl OngoingSettings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

impl Default for OngoingSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: 1000,
        }
    }
}

/// Event channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Events buffered per subscriber before the slowest one starts lagging
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Placeholder values used when a payload leaves fields out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    pub unknown_caller_name: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            unknown_caller_name: UNKNOWN_CALLER_NAME.to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Include file and line information
    pub file_info: bool,
    /// Log span enter and exit
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
            spans: false,
        }
    }
}

impl Default for CallKitConfig {
    fn default() -> Self {
        Self {
            dedup: DedupSettings::default(),
            ongoing: OngoingSettings::default(),
            events: EventSettings::default(),
            defaults: DefaultSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl CallKitConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an optional file and the environment, then validate it
    pub fn load(path: Option<&Path>) -> CallKitResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading call service configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the windows and sizes make sense together
    pub fn validate(&self) -> CallKitResult<()> {
        if self.dedup.duplicate_window_ms == 0 {
            return Err(CallKitError::config("dedup.duplicate_window_ms must be greater than zero"));
        }
        if self.dedup.stale_window_ms <= self.dedup.duplicate_window_ms {
            return Err(CallKitError::config(format!(
                "dedup.stale_window_ms ({}) must be larger than dedup.duplicate_window_ms ({})",
                self.dedup.stale_window_ms, self.dedup.duplicate_window_ms
            )));
        }
        if self.ongoing.update_interval_ms == 0 {
            return Err(CallKitError::config("ongoing.update_interval_ms must be greater than zero"));
        }
        if self.events.channel_capacity == 0 {
            return Err(CallKitError::config("events.channel_capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Set the duplicate suppression window
    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.dedup.duplicate_window_ms = window.as_millis() as u64;
        self
    }

    /// Set the stale history window
    pub fn with_stale_window(mut self, window: Duration) -> Self {
        self.dedup.stale_window_ms = window.as_millis() as u64;
        self
    }

    /// Set the ongoing-call refresh interval
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.ongoing.update_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events.channel_capacity = capacity;
        self
    }

    /// Set the placeholder shown for unnamed callers
    pub fn with_unknown_caller_name(mut self, name: impl Into<String>) -> Self {
        self.defaults.unknown_caller_name = name.into();
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }
}
