//! Global subscriber installation
//!
//! Kept in its own test binary: the subscriber is process-wide.

use callkit_plugin::config::LoggingSettings;
use callkit_plugin::{LoggingConfig, setup_logging};

#[test]
fn second_install_reports_logging_error() {
    let settings = LoggingSettings {
        level: "debug".into(),
        json: false,
        file_info: true,
        spans: true,
    };
    let config = LoggingConfig::from_settings(&settings).unwrap();

    setup_logging(config.clone()).unwrap();
    tracing::debug!("subscriber installed");

    let err = setup_logging(config).unwrap_err();
    assert_eq!(err.code(), "LOGGING_ERROR");
}
