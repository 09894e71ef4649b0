//! Configuration layering: defaults, file, environment

use std::io::Write;
use std::time::Duration;

use callkit_plugin::CallKitConfig;
use serial_test::serial;

fn clear_env() {
    for key in [
        "CALLKIT__DEDUP__DUPLICATE_WINDOW_MS",
        "CALLKIT__DEDUP__STALE_WINDOW_MS",
        "CALLKIT__DEFAULTS__UNKNOWN_CALLER_NAME",
    ] {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn defaults_without_sources() {
    clear_env();
    let config = CallKitConfig::load(None).unwrap();
    assert_eq!(config, CallKitConfig::default());
}

#[test]
#[serial]
fn file_overrides_defaults() {
    clear_env();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[dedup]
duplicate_window_ms = 1500

[ongoing]
update_interval_ms = 500

[logging]
level = "debug"
"#
    )
    .unwrap();

    let config = CallKitConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.dedup.duplicate_window(), Duration::from_millis(1500));
    assert_eq!(config.dedup.stale_window(), Duration::from_secs(10));
    assert_eq!(config.ongoing.update_interval(), Duration::from_millis(500));
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn environment_overrides_file() {
    clear_env();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{ "dedup": {{ "duplicate_window_ms": 1500 }} }}"#).unwrap();
    unsafe {
        std::env::set_var("CALLKIT__DEDUP__DUPLICATE_WINDOW_MS", "3000");
        std::env::set_var("CALLKIT__DEFAULTS__UNKNOWN_CALLER_NAME", "Private");
    }

    let config = CallKitConfig::load(Some(file.path()));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.dedup.duplicate_window_ms, 3000);
    assert_eq!(config.defaults.unknown_caller_name, "Private");
}

#[test]
#[serial]
fn invalid_values_fail_validation() {
    clear_env();
    unsafe { std::env::set_var("CALLKIT__DEDUP__STALE_WINDOW_MS", "1000") };

    let result = CallKitConfig::load(None);
    clear_env();

    assert_eq!(result.unwrap_err().code(), "CONFIG_ERROR");
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let result = CallKitConfig::load(Some(dir.path().join("absent.toml").as_path()));
    assert_eq!(result.unwrap_err().code(), "CONFIG_ERROR");
}
