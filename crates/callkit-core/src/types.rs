//! Call identity, session and action types
//!
//! [`CallData`] is the immutable identity of a call as handed over by the
//! application (or by a push handler running without the application). A
//! [`CallSession`] wraps it with the lifecycle state tracked by the registry.
//!
//! # Payload defaulting
//!
//! Incoming-call payloads are never rejected for missing fields. A dropped
//! incoming call is worse than one with placeholder text, so
//! [`CallData::from_payload`] fills in a generated id, an unknown-caller name
//! and empty defaults instead:
//!
//! ```rust
//! use callkit_core::CallData;
//! use serde_json::json;
//!
//! let call = CallData::from_payload(&json!({ "callerNumber": "+15550100" })).unwrap();
//! assert_eq!(call.caller_name, "Unknown");
//! assert_eq!(call.caller_number, "+15550100");
//! assert!(!call.id.is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{CallCoreError, CallCoreResult};

/// Opaque call identifier assigned by the application before session creation
pub type CallId = String;

/// Placeholder shown when an incoming payload carries no caller name
pub const UNKNOWN_CALLER_NAME: &str = "Unknown";

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// Incoming call is being presented and has not been acted on
    Ringing,
    /// Call was answered and is in progress
    Active,
    /// Call is over; terminal
    Ended,
}

impl CallState {
    /// Wire representation used in snapshots (`ringing`, `active`, `ended`)
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Ringing => "ringing",
            CallState::Active => "active",
            CallState::Ended => "ended",
        }
    }

    /// Whether the session has not yet reached its terminal state
    pub fn is_live(&self) -> bool {
        !matches!(self, CallState::Ended)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User or system action delivered for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallAction {
    /// Accept a ringing call
    Answer,
    /// Refuse a ringing call
    Decline,
    /// Terminate a call in progress
    Hangup,
}

impl CallAction {
    /// Wire name of the action (`ANSWER`, `DECLINE`, `HANGUP`)
    pub fn as_str(&self) -> &'static str {
        match self {
            CallAction::Answer => "ANSWER",
            CallAction::Decline => "DECLINE",
            CallAction::Hangup => "HANGUP",
        }
    }
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallAction {
    type Err = CallCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = s.trim();
        if action.eq_ignore_ascii_case("ANSWER") {
            Ok(CallAction::Answer)
        } else if action.eq_ignore_ascii_case("DECLINE") {
            Ok(CallAction::Decline)
        } else if action.eq_ignore_ascii_case("HANGUP") {
            Ok(CallAction::Hangup)
        } else {
            Err(CallCoreError::unknown_action(s))
        }
    }
}

/// Primitive value carried in a call's `extra` map
///
/// The core never interprets these; they travel with the call for the
/// application's own use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl ExtraValue {
    /// Convert an arbitrary JSON value into a primitive extra value.
    ///
    /// `null` becomes an empty string and nested arrays or objects are kept
    /// as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => ExtraValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ExtraValue::Int(i),
                None => ExtraValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ExtraValue::Text(s.clone()),
            Value::Null => ExtraValue::Text(String::new()),
            other => ExtraValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Text(value.to_owned())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Text(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Bool(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        ExtraValue::Int(value)
    }
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        ExtraValue::Float(value)
    }
}

/// Immutable identity of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallData {
    /// Unique call identifier
    pub id: CallId,
    /// Display name of the caller
    pub caller_name: String,
    /// Display number of the caller
    #[serde(default)]
    pub caller_number: String,
    /// Avatar URL, if the application supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_avatar: Option<String>,
    /// Whether this is a video call
    #[serde(default)]
    pub is_video_call: bool,
    /// Application-defined values carried through untouched
    #[serde(default)]
    pub extra: BTreeMap<String, ExtraValue>,
}

impl CallData {
    /// Create call data with the given id and caller name
    pub fn new(id: impl Into<CallId>, caller_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caller_name: caller_name.into(),
            caller_number: String::new(),
            caller_avatar: None,
            is_video_call: false,
            extra: BTreeMap::new(),
        }
    }

    /// Set the caller number
    pub fn with_caller_number(mut self, number: impl Into<String>) -> Self {
        self.caller_number = number.into();
        self
    }

    /// Set the caller avatar URL
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.caller_avatar = Some(avatar.into());
        self
    }

    /// Mark the call as a video call
    pub fn with_video(mut self, is_video_call: bool) -> Self {
        self.is_video_call = is_video_call;
        self
    }

    /// Attach an application-defined value
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build call data from an application payload, defaulting missing fields.
    ///
    /// Fails only when the payload is not a JSON object at all.
    pub fn from_payload(payload: &Value) -> CallCoreResult<Self> {
        Self::from_payload_with(payload, UNKNOWN_CALLER_NAME)
    }

    /// Same as [`CallData::from_payload`] with a custom unknown-caller placeholder
    pub fn from_payload_with(payload: &Value, unknown_caller_name: &str) -> CallCoreResult<Self> {
        let map = payload.as_object().ok_or_else(|| {
            CallCoreError::invalid_payload(format!("expected an object, got {}", json_kind(payload)))
        })?;

        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);

        let id = text("id")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let caller_name = text("callerName")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| unknown_caller_name.to_owned());
        let extra = map
            .get("extra")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(key, value)| (key.clone(), ExtraValue::from_json(value)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            caller_name,
            caller_number: text("callerNumber").unwrap_or_default(),
            caller_avatar: text("callerAvatar").filter(|avatar| !avatar.is_empty()),
            is_video_call: map.get("isVideoCall").and_then(Value::as_bool).unwrap_or(false),
            extra,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A call tracked by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    data: CallData,
    state: CallState,
    started_at: DateTime<Utc>,
}

impl CallSession {
    /// New session for an incoming call that is being presented
    pub fn ringing(data: CallData) -> Self {
        Self::with_state(data, CallState::Ringing)
    }

    /// New session for a call answered outside the ringing phase
    pub fn active(data: CallData) -> Self {
        Self::with_state(data, CallState::Active)
    }

    fn with_state(data: CallData, state: CallState) -> Self {
        Self {
            data,
            state,
            started_at: Utc::now(),
        }
    }

    /// Call identifier
    pub fn call_id(&self) -> &str {
        &self.data.id
    }

    /// Call identity
    pub fn data(&self) -> &CallData {
        &self.data
    }

    /// Current lifecycle state
    pub fn state(&self) -> CallState {
        self.state
    }

    /// When the session was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn set_state(&mut self, state: CallState) {
        self.state = state;
    }

    /// Read-only projection handed to the application layer
    pub fn summary(&self) -> ActiveCallSummary {
        ActiveCallSummary {
            id: self.data.id.clone(),
            caller_name: self.data.caller_name.clone(),
            caller_number: self.data.caller_number.clone(),
            caller_avatar: self.data.caller_avatar.clone().unwrap_or_default(),
            is_video_call: self.data.is_video_call,
            state: self.state,
            extra: self.data.extra.clone(),
        }
    }
}

/// Snapshot of a live call as exposed to the application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCallSummary {
    /// Call identifier
    pub id: CallId,
    /// Display name of the caller
    pub caller_name: String,
    /// Display number of the caller
    pub caller_number: String,
    /// Avatar URL or empty string
    pub caller_avatar: String,
    /// Whether this is a video call
    pub is_video_call: bool,
    /// Lifecycle state, serialized as `ringing`, `active` or `ended`
    pub state: CallState,
    /// Application-defined values
    pub extra: BTreeMap<String, ExtraValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_defaults_missing_identity() {
        let call = CallData::from_payload(&json!({})).unwrap();

        assert!(Uuid::parse_str(&call.id).is_ok());
        assert_eq!(call.caller_name, UNKNOWN_CALLER_NAME);
        assert_eq!(call.caller_number, "");
        assert_eq!(call.caller_avatar, None);
        assert!(!call.is_video_call);
        assert!(call.extra.is_empty());
    }

    #[test]
    fn test_payload_keeps_supplied_fields() {
        let call = CallData::from_payload(&json!({
            "id": "c1",
            "callerName": "Alice",
            "callerNumber": "+15550101",
            "callerAvatar": "https://example.com/alice.png",
            "isVideoCall": true,
            "extra": { "room": "r-42", "priority": 3, "score": 0.5, "vip": true }
        }))
        .unwrap();

        assert_eq!(call.id, "c1");
        assert_eq!(call.caller_name, "Alice");
        assert_eq!(call.caller_number, "+15550101");
        assert_eq!(call.caller_avatar.as_deref(), Some("https://example.com/alice.png"));
        assert!(call.is_video_call);
        assert_eq!(call.extra["room"], ExtraValue::Text("r-42".into()));
        assert_eq!(call.extra["priority"], ExtraValue::Int(3));
        assert_eq!(call.extra["score"], ExtraValue::Float(0.5));
        assert_eq!(call.extra["vip"], ExtraValue::Bool(true));
    }

    #[test]
    fn test_payload_with_wrong_types_falls_back() {
        let call = CallData::from_payload_with(
            &json!({ "id": 17, "callerName": "  ", "isVideoCall": "yes" }),
            "Private number",
        )
        .unwrap();

        assert_ne!(call.id, "17");
        assert_eq!(call.caller_name, "Private number");
        assert!(!call.is_video_call);
    }

    #[test]
    fn test_payload_flattens_non_primitive_extras() {
        let call = CallData::from_payload(&json!({
            "id": "c9",
            "extra": { "missing": null, "tags": ["a", "b"] }
        }))
        .unwrap();

        assert_eq!(call.extra["missing"], ExtraValue::Text(String::new()));
        assert_eq!(call.extra["tags"], ExtraValue::Text("[\"a\",\"b\"]".into()));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = CallData::from_payload(&json!("c1")).unwrap_err();
        assert!(matches!(err, CallCoreError::InvalidPayload { .. }));
    }

    #[test]
    fn test_call_action_parsing() {
        assert_eq!("ANSWER".parse::<CallAction>().unwrap(), CallAction::Answer);
        assert_eq!("decline".parse::<CallAction>().unwrap(), CallAction::Decline);
        assert_eq!(" HANGUP ".parse::<CallAction>().unwrap(), CallAction::Hangup);
        assert_eq!(
            "MUTE".parse::<CallAction>().unwrap_err(),
            CallCoreError::unknown_action("MUTE")
        );
    }

    #[test]
    fn test_summary_serializes_state_as_string() {
        let session = CallSession::active(CallData::new("c1", "Alice").with_extra("room", "r-1"));
        let json = serde_json::to_value(session.summary()).unwrap();

        assert_eq!(json["id"], "c1");
        assert_eq!(json["callerName"], "Alice");
        assert_eq!(json["callerAvatar"], "");
        assert_eq!(json["state"], "active");
        assert_eq!(json["extra"]["room"], "r-1");
    }
}
