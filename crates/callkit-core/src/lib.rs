//! # CallKit Core - Call Session State for Native Call Notifications
//!
//! This crate holds the bookkeeping that native call-notification UX depends on:
//! - **Session registry**: which calls are ringing, in progress or over, plus the
//!   current incoming-call pointer
//! - **Action deduplication**: dropping repeated answer/decline/hangup signals
//!   delivered by more than one platform path
//! - **Call events**: `onCallAnswered`, `onCallRejected` and `onCallEnded`
//!   published on a broadcast channel
//!
//! Nothing in here blocks or awaits. Rendering notifications, playing ringtones
//! and launching screens are left to collaborators that run after a registry
//! operation has returned.
//!
//! ## Quick Start
//!
//! ```rust
//! use callkit_core::{ActionDeduplicator, CallAction, CallData, CallSessionRegistry};
//! use serde_json::json;
//!
//! let registry = CallSessionRegistry::new();
//! let dedup = ActionDeduplicator::default();
//!
//! let call = CallData::from_payload(&json!({ "id": "c1", "callerName": "Alice" })).unwrap();
//! registry.set_incoming_call(call);
//! assert!(!registry.has_active_call());
//!
//! if !dedup.should_suppress(CallAction::Answer, "c1") {
//!     assert!(registry.answer(Some("c1")));
//! }
//! // Second tap on the same button
//! assert!(dedup.should_suppress(CallAction::Answer, "c1"));
//!
//! let summary = registry.get_active_summary().unwrap();
//! assert_eq!(summary.caller_name, "Alice");
//! assert_eq!(summary.state.as_str(), "active");
//! ```

#![doc(html_root_url = "https://docs.rs/callkit-core/0.1.0")]

pub mod dedup;
pub mod error;
pub mod events;
pub mod registry;
pub mod types;

// Re-export main types
pub use dedup::{ActionDeduplicator, DEFAULT_DUPLICATE_WINDOW, DEFAULT_STALE_WINDOW};
pub use error::{CallCoreError, CallCoreResult};
pub use events::{CallEvent, DEFAULT_EVENT_CAPACITY, EndReason, EventEmitter, EventStream};
pub use registry::CallSessionRegistry;
pub use types::{
    ActiveCallSummary, CallAction, CallData, CallId, CallSession, CallState, ExtraValue,
    UNKNOWN_CALLER_NAME,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
