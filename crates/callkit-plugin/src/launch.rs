//! Record of the last action that brought the application to the foreground
//!
//! When the user answers from a notification, the application may start cold
//! and needs to know why it was launched. The router stores the action here
//! and the application collects it once it is ready.

use callkit_core::{CallAction, CallData};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Action and call that launched the foreground experience
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallActionLaunch {
    pub action: CallAction,
    pub call_data: CallData,
    /// When the action was recorded
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl CallActionLaunch {
    /// Launch record stamped now
    pub fn new(action: CallAction, call_data: CallData) -> Self {
        Self {
            action,
            call_data,
            timestamp: Utc::now(),
        }
    }
}

/// Single-slot holder for the most recent [`CallActionLaunch`]
#[derive(Debug, Default)]
pub struct LaunchSlot {
    slot: Mutex<Option<CallActionLaunch>>,
}

impl LaunchSlot {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a launch, replacing any uncollected one
    pub fn set(&self, launch: CallActionLaunch) {
        *self.slot.lock() = Some(launch);
    }

    /// Collect and clear the stored launch
    pub fn take(&self) -> Option<CallActionLaunch> {
        self.slot.lock().take()
    }

    /// Look at the stored launch without clearing it
    pub fn peek(&self) -> Option<CallActionLaunch> {
        self.slot.lock().clone()
    }

    /// Whether a launch is waiting to be collected
    pub fn has(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop the stored launch without reading it
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_slot() {
        let slot = LaunchSlot::new();
        assert!(!slot.has());

        slot.set(CallActionLaunch::new(CallAction::Answer, CallData::new("c1", "Alice")));
        assert!(slot.has());
        assert_eq!(slot.peek().unwrap().call_data.id, "c1");

        let launch = slot.take().unwrap();
        assert_eq!(launch.action, CallAction::Answer);
        assert!(!slot.has());
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_launch_serializes_for_application() {
        let launch = CallActionLaunch::new(CallAction::Answer, CallData::new("c1", "Alice"));
        let json = serde_json::to_value(&launch).unwrap();

        assert_eq!(json["action"], "ANSWER");
        assert_eq!(json["callData"]["id"], "c1");
        assert_eq!(json["callData"]["callerName"], "Alice");
        assert_eq!(json["timestamp"], launch.timestamp.timestamp_millis());
    }
}
