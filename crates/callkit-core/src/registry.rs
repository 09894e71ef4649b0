//! Call session registry
//!
//! Single source of truth for call state, shared by the notification, audio
//! and action-handling collaborators that must agree on whether a call is
//! ringing, in progress or over.
//!
//! # State machine
//!
//! ```text
//!         set_incoming_call
//!  (none) ----------------> Ringing
//!                              |  answer            |  reject
//!                              v                    v
//!  create_active_session -> Active               Ended (terminal)
//!                              |  end
//!                              v
//!                           Ended (terminal)
//! ```
//!
//! Every operation is total: a missing or wrongly-stated session is reported
//! with `false` / `None` and the registry is left untouched.
//!
//! # Selecting a call without an id
//!
//! [`answer`](CallSessionRegistry::answer), [`reject`](CallSessionRegistry::reject)
//! and [`end`](CallSessionRegistry::end) accept an optional call id. Without one
//! they act on the unique live session; when several calls are live the
//! operation refuses to guess and returns `false`.
//!
//! ```rust
//! use callkit_core::{CallData, CallSessionRegistry, CallState};
//!
//! let registry = CallSessionRegistry::new();
//! registry.set_incoming_call(CallData::new("c1", "Alice"));
//!
//! assert!(registry.answer(None));
//! assert_eq!(registry.get_session("c1").unwrap().state(), CallState::Active);
//! assert!(registry.end(Some("c1")));
//! assert_eq!(registry.cleanup_ended(), 1);
//! ```

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::events::{CallEvent, EndReason, EventEmitter, EventStream};
use crate::types::{ActiveCallSummary, CallData, CallId, CallSession, CallState};

/// In-memory registry of call sessions keyed by call id
#[derive(Debug)]
pub struct CallSessionRegistry {
    /// Sessions by call id, including ended ones until swept
    sessions: DashMap<CallId, CallSession>,
    /// Most recent incoming call still being presented
    incoming: RwLock<Option<CallData>>,
    events: EventEmitter,
}

impl CallSessionRegistry {
    /// Create an empty registry with a default event channel
    pub fn new() -> Self {
        Self::with_emitter(EventEmitter::default())
    }

    /// Create an empty registry publishing on the given emitter
    pub fn with_emitter(events: EventEmitter) -> Self {
        Self {
            sessions: DashMap::new(),
            incoming: RwLock::new(None),
            events,
        }
    }

    /// Event publisher used for transition events
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Register a ringing session and make it the current incoming call.
    ///
    /// Registering the same id twice replaces the earlier session, even an
    /// ended one: a new alert under a reused id starts a new call.
    pub fn set_incoming_call(&self, call: CallData) {
        let call_id = call.id.clone();
        let previous = self
            .sessions
            .insert(call_id.clone(), CallSession::ringing(call.clone()));
        *self.incoming.write() = Some(call);
        match previous.map(|session| session.state()) {
            Some(CallState::Ended) => {
                debug!(call_id = %call_id, "Ended call id reused; registered as a new ringing call")
            }
            Some(state) => debug!(call_id = %call_id, previous = ?state, "Replaced live call session"),
            None => debug!(call_id = %call_id, "Set incoming call"),
        }
    }

    /// Current incoming call, if one is being presented
    pub fn get_incoming_call(&self) -> Option<CallData> {
        self.incoming.read().clone()
    }

    /// Forget the current incoming call without touching any session
    pub fn clear_incoming_call(&self) {
        *self.incoming.write() = None;
    }

    /// Whether any session is answered and in progress
    pub fn has_active_call(&self) -> bool {
        self.sessions
            .iter()
            .any(|entry| entry.value().state() == CallState::Active)
    }

    /// Whether any session has not ended yet (ringing or active)
    pub fn has_live_call(&self) -> bool {
        self.sessions
            .iter()
            .any(|entry| entry.value().state().is_live())
    }

    /// Snapshot of the call in progress.
    ///
    /// An active session is preferred; otherwise a ringing one is reported.
    /// With several concurrent calls the choice among equals is unspecified.
    pub fn get_active_summary(&self) -> Option<ActiveCallSummary> {
        let mut ringing = None;
        for entry in self.sessions.iter() {
            match entry.value().state() {
                CallState::Active => return Some(entry.value().summary()),
                CallState::Ringing if ringing.is_none() => {
                    ringing = Some(entry.value().summary());
                }
                _ => {}
            }
        }
        ringing
    }

    /// Copy of the session registered under `call_id`
    pub fn get_session(&self, call_id: &str) -> Option<CallSession> {
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    /// Copies of every registered session
    pub fn sessions(&self) -> Vec<CallSession> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of registered sessions, ended ones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry holds no sessions at all
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Move a ringing call to `Active` and emit `onCallAnswered`.
    pub fn answer(&self, call_id: Option<&str>) -> bool {
        let Some(call_id) = self.resolve(call_id, "answer") else {
            return false;
        };
        if !self.transition(&call_id, CallState::Ringing, CallState::Active) {
            debug!(call_id = %call_id, "No ringing call to answer");
            return false;
        }
        self.clear_incoming_if(&call_id);
        self.events.emit(CallEvent::answered(call_id.clone()));
        debug!(call_id = %call_id, "Call answered");
        true
    }

    /// Move a ringing call to `Ended` and emit `onCallRejected`.
    pub fn reject(&self, call_id: Option<&str>) -> bool {
        let Some(call_id) = self.resolve(call_id, "reject") else {
            return false;
        };
        if !self.transition(&call_id, CallState::Ringing, CallState::Ended) {
            debug!(call_id = %call_id, "No ringing call to reject");
            return false;
        }
        self.clear_incoming_if(&call_id);
        self.events.emit(CallEvent::rejected(call_id.clone()));
        debug!(call_id = %call_id, "Call rejected");
        true
    }

    /// End a live call with reason `ended`.
    pub fn end(&self, call_id: Option<&str>) -> bool {
        self.end_with_reason(call_id, EndReason::Ended)
    }

    /// Move any live call to `Ended` and emit `onCallEnded` with `reason`.
    pub fn end_with_reason(&self, call_id: Option<&str>, reason: EndReason) -> bool {
        let Some(call_id) = self.resolve(call_id, "end") else {
            return false;
        };
        let ended = match self.sessions.get_mut(&call_id) {
            Some(mut session) if session.state().is_live() => {
                session.set_state(CallState::Ended);
                true
            }
            _ => false,
        };
        if !ended {
            debug!(call_id = %call_id, "No live call to end");
            return false;
        }
        self.clear_incoming_if(&call_id);
        self.events.emit(CallEvent::ended(call_id.clone(), reason));
        debug!(call_id = %call_id, reason = %reason, "Call ended");
        true
    }

    /// Insert a session that is already in progress, replacing any entry
    /// with the same id.
    pub fn create_active_session(&self, call: CallData) {
        let call_id = call.id.clone();
        self.sessions
            .insert(call_id.clone(), CallSession::active(call));
        self.clear_incoming_if(&call_id);
        debug!(call_id = %call_id, "Created ongoing call session");
    }

    /// Drop every ended session. Returns how many were removed.
    pub fn cleanup_ended(&self) -> usize {
        let ended: Vec<CallId> = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().state().is_live())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for call_id in ended {
            if self
                .sessions
                .remove_if(&call_id, |_, session| !session.state().is_live())
                .is_some()
            {
                debug!(call_id = %call_id, "Cleaned up ended call");
                removed += 1;
            }
        }
        removed
    }

    /// Turn an optional selector into a concrete call id.
    fn resolve(&self, call_id: Option<&str>, operation: &'static str) -> Option<CallId> {
        if let Some(call_id) = call_id {
            return Some(call_id.to_owned());
        }

        let live: Vec<CallId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().state().is_live())
            .map(|entry| entry.key().clone())
            .take(2)
            .collect();

        match live.as_slice() {
            [only] => Some(only.clone()),
            [] => {
                debug!(operation, "No live call to act on");
                None
            }
            _ => {
                warn!(
                    operation,
                    "Several live calls and no call id given; an explicit call id is required"
                );
                None
            }
        }
    }

    fn transition(&self, call_id: &str, from: CallState, to: CallState) -> bool {
        match self.sessions.get_mut(call_id) {
            Some(mut session) if session.state() == from => {
                session.set_state(to);
                true
            }
            _ => false,
        }
    }

    fn clear_incoming_if(&self, call_id: &str) {
        let mut incoming = self.incoming.write();
        if incoming.as_ref().is_some_and(|call| call.id == call_id) {
            *incoming = None;
        }
    }
}

impl Default for CallSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
