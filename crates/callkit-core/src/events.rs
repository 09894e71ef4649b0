//! Call events emitted towards the application layer
//!
//! Every successful registry transition produces exactly one [`CallEvent`].
//! Events are published on a broadcast channel so any number of listeners
//! (a method-channel bridge, a logger, tests) can observe them; publishing
//! never blocks and silently drops the event when nobody is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::CallCoreError;
use crate::types::CallId;

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The user pressed the hangup control
    Hangup,
    /// The call was ended by the application
    Ended,
    /// The call was refused before it was answered.
    ///
    /// Part of the `onCallEnded` reason vocabulary the application may send
    /// back through `endCall`; the registry's own reject path reports
    /// `onCallRejected` instead.
    Rejected,
}

impl EndReason {
    /// Wire name of the reason
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Hangup => "hangup",
            EndReason::Ended => "ended",
            EndReason::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndReason {
    type Err = CallCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hangup" => Ok(EndReason::Hangup),
            "ended" => Ok(EndReason::Ended),
            "rejected" => Ok(EndReason::Rejected),
            other => Err(CallCoreError::UnknownEndReason {
                reason: other.to_owned(),
            }),
        }
    }
}

/// Event emitted after a call state transition
///
/// Serializes to the callback shape the application bridge expects, e.g.
/// `{"method":"onCallEnded","callId":"c1","reason":"hangup","timestamp":1700000000000}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method")]
pub enum CallEvent {
    /// A ringing call was answered
    #[serde(rename = "onCallAnswered", rename_all = "camelCase")]
    Answered {
        /// Call that was answered
        call_id: CallId,
        /// When the transition happened
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },

    /// A ringing call was rejected
    #[serde(rename = "onCallRejected", rename_all = "camelCase")]
    Rejected {
        /// Call that was rejected
        call_id: CallId,
        /// When the transition happened
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },

    /// A live call ended
    #[serde(rename = "onCallEnded", rename_all = "camelCase")]
    Ended {
        /// Call that ended
        call_id: CallId,
        /// Why it ended
        reason: EndReason,
        /// When the transition happened
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
}

impl CallEvent {
    /// Answered event stamped now
    pub fn answered(call_id: impl Into<CallId>) -> Self {
        CallEvent::Answered {
            call_id: call_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Rejected event stamped now
    pub fn rejected(call_id: impl Into<CallId>) -> Self {
        CallEvent::Rejected {
            call_id: call_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Ended event stamped now
    pub fn ended(call_id: impl Into<CallId>, reason: EndReason) -> Self {
        CallEvent::Ended {
            call_id: call_id.into(),
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Name of the application callback this event maps to
    pub fn method_name(&self) -> &'static str {
        match self {
            CallEvent::Answered { .. } => "onCallAnswered",
            CallEvent::Rejected { .. } => "onCallRejected",
            CallEvent::Ended { .. } => "onCallEnded",
        }
    }

    /// Call the event refers to
    pub fn call_id(&self) -> &str {
        match self {
            CallEvent::Answered { call_id, .. }
            | CallEvent::Rejected { call_id, .. }
            | CallEvent::Ended { call_id, .. } => call_id,
        }
    }

    /// When the event was produced
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CallEvent::Answered { timestamp, .. }
            | CallEvent::Rejected { timestamp, .. }
            | CallEvent::Ended { timestamp, .. } => *timestamp,
        }
    }
}

/// Event stream type
pub type EventStream = BroadcastStream<CallEvent>;

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast publisher for call events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<CallEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: CallEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events as a stream
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe to events with a plain broadcast receiver
    pub fn receiver(&self) -> broadcast::Receiver<CallEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_callback_name() {
        let event = CallEvent::ended("c1", EndReason::Hangup);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["method"], "onCallEnded");
        assert_eq!(json["callId"], "c1");
        assert_eq!(json["reason"], "hangup");
        assert_eq!(json["timestamp"], event.timestamp().timestamp_millis());
        assert_eq!(event.method_name(), "onCallEnded");
    }

    #[test]
    fn test_emit_without_receivers_is_silent() {
        let emitter = EventEmitter::new(4);
        assert_eq!(emitter.receiver_count(), 0);
        emitter.emit(CallEvent::answered("c1"));
    }

    #[test]
    fn test_receivers_get_every_event() {
        let emitter = EventEmitter::default();
        let mut first = emitter.receiver();
        let mut second = emitter.receiver();

        emitter.emit(CallEvent::rejected("c2"));

        assert_eq!(first.try_recv().unwrap().method_name(), "onCallRejected");
        assert_eq!(second.try_recv().unwrap().call_id(), "c2");
    }

    #[test]
    fn test_end_reason_round_trips_through_strings() {
        for reason in [EndReason::Hangup, EndReason::Ended, EndReason::Rejected] {
            assert_eq!(reason.as_str().parse::<EndReason>().unwrap(), reason);
        }
        assert!("timeout".parse::<EndReason>().is_err());
    }
}
