//! # CallKit Plugin - Native Call Notification Service
//!
//! This crate is the application-facing side of native call UX. It wires
//! [`callkit_core`]'s session registry and action deduplicator to the
//! platform collaborators that render alerts, play ringtones and keep an
//! ongoing-call indicator up to date.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use callkit_plugin::{CallKit, CallKitConfig, NoopCallUi};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CallKitConfig::load(None)?;
//!     let callkit = CallKit::new(config, Arc::new(NoopCallUi))?;
//!
//!     // Push handler received a call
//!     callkit.show_incoming_call(&json!({ "id": "c1", "callerName": "Alice" }))?;
//!
//!     // User tapped "Answer" on the notification
//!     callkit.handle_action_signal(Some("ANSWER"), Some("c1"));
//!     assert!(callkit.is_call_active());
//!
//!     callkit.handle_method("endCall", &json!("c1"))?;
//!     callkit.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`CallKit`]: one explicitly constructed service instance per process
//! - [`ActionRouter`]: answer/decline/hangup signals, deduplicated
//! - [`CallUi`] and [`UiDispatcher`]: best-effort platform calls applied by a
//!   background task
//! - [`OngoingCallTicker`]: elapsed-time refresh of the ongoing indicator
//! - [`LaunchSlot`]: why the application was brought to the foreground

#![doc(html_root_url = "https://docs.rs/callkit-plugin/0.1.0")]

pub mod config;
pub mod error;
pub mod launch;
pub mod logging;
pub mod router;
pub mod service;
pub mod ticker;
pub mod ui;

// Re-export main types
pub use config::CallKitConfig;
pub use error::{CallKitError, CallKitResult};
pub use launch::{CallActionLaunch, LaunchSlot};
pub use logging::{LoggingConfig, setup_logging};
pub use router::{ActionOutcome, ActionRouter};
pub use service::CallKit;
pub use ticker::{OngoingCallTicker, format_call_duration};
pub use ui::{CallUi, NoopCallUi, OngoingCallUpdate, UiCommand, UiDispatcher};

pub use callkit_core::{
    ActiveCallSummary, CallAction, CallData, CallEvent, CallState, EndReason, EventStream,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load configuration, install logging and start the service
///
/// Convenience for hosts that do not set up tracing themselves.
pub fn init(
    config_path: Option<&std::path::Path>,
    ui: std::sync::Arc<dyn CallUi>,
) -> CallKitResult<CallKit> {
    let config = CallKitConfig::load(config_path)?;
    setup_logging(LoggingConfig::from_settings(&config.logging)?)?;
    CallKit::new(config, ui)
}
