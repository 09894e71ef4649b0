//! Routing of answer/decline/hangup signals
//!
//! Signals reach the service from several independent paths: notification
//! buttons, full-screen call UI, platform broadcasts. They all funnel through
//! [`ActionRouter::route`], which drops duplicates before touching the
//! registry. Routing never fails from the caller's point of view; the
//! returned [`ActionOutcome`] only says what happened.

use std::fmt;
use std::sync::Arc;

use callkit_core::{ActionDeduplicator, CallAction, CallSessionRegistry, EndReason};
use tracing::{debug, error, warn};

use crate::launch::{CallActionLaunch, LaunchSlot};
use crate::ticker::OngoingCallTicker;
use crate::ui::{UiCommand, UiDispatcher};

/// What became of a routed signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The registry transition was applied
    Applied,
    /// Same action for the same call was just handled
    Suppressed,
    /// No session was in the state the action needs
    NoMatchingSession,
    /// The signal carried no call id
    MissingCallId,
    /// The signal named an action we do not handle
    UnknownAction(String),
}

impl ActionOutcome {
    /// Whether the signal changed call state
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Applied => f.write_str("applied"),
            ActionOutcome::Suppressed => f.write_str("suppressed"),
            ActionOutcome::NoMatchingSession => f.write_str("no matching session"),
            ActionOutcome::MissingCallId => f.write_str("missing call id"),
            ActionOutcome::UnknownAction(action) => write!(f, "unknown action {action}"),
        }
    }
}

/// Applies action signals to the registry and drives the matching UI cleanup
#[derive(Debug, Clone)]
pub struct ActionRouter {
    registry: Arc<CallSessionRegistry>,
    dedup: Arc<ActionDeduplicator>,
    dispatcher: UiDispatcher,
    ticker: Arc<OngoingCallTicker>,
    launches: Arc<LaunchSlot>,
}

impl ActionRouter {
    /// Router over the service's shared components
    pub fn new(
        registry: Arc<CallSessionRegistry>,
        dedup: Arc<ActionDeduplicator>,
        dispatcher: UiDispatcher,
        ticker: Arc<OngoingCallTicker>,
        launches: Arc<LaunchSlot>,
    ) -> Self {
        Self {
            registry,
            dedup,
            dispatcher,
            ticker,
            launches,
        }
    }

    /// Route a signal whose fields came straight off the platform
    pub fn route_raw(&self, action: Option<&str>, call_id: Option<&str>) -> ActionOutcome {
        let Some(call_id) = call_id.filter(|id| !id.trim().is_empty()) else {
            error!(action = ?action, "Cannot route call action: call id is missing");
            return ActionOutcome::MissingCallId;
        };
        let action = match action.unwrap_or_default().parse::<CallAction>() {
            Ok(action) => action,
            Err(_) => {
                let raw = action.unwrap_or_default().to_owned();
                warn!(action = %raw, call_id = %call_id, "Unknown call action");
                return ActionOutcome::UnknownAction(raw);
            }
        };
        self.route(action, call_id)
    }

    /// Route a parsed signal
    pub fn route(&self, action: CallAction, call_id: &str) -> ActionOutcome {
        debug!(action = %action, call_id = %call_id, "Received call action");

        if self.dedup.should_suppress(action, call_id) {
            debug!(action = %action, call_id = %call_id, "Action already processed, ignoring duplicate");
            return ActionOutcome::Suppressed;
        }

        let applied = match action {
            CallAction::Answer => self.answer(call_id),
            CallAction::Decline => self.decline(call_id),
            CallAction::Hangup => self.hangup(call_id),
        };

        if applied {
            ActionOutcome::Applied
        } else {
            debug!(action = %action, call_id = %call_id, "No session matched call action");
            ActionOutcome::NoMatchingSession
        }
    }

    fn answer(&self, call_id: &str) -> bool {
        let session = self.registry.get_session(call_id);

        self.dispatcher
            .dispatch(UiCommand::DismissIncoming(call_id.to_owned()));
        self.dispatcher.dispatch(UiCommand::StopRinging);

        if let Some(session) = session {
            let call = session.data().clone();
            self.launches
                .set(CallActionLaunch::new(CallAction::Answer, call.clone()));
            self.dispatcher.dispatch(UiCommand::LaunchForeground {
                action: CallAction::Answer,
                call,
            });
        }

        self.registry.answer(Some(call_id))
    }

    fn decline(&self, call_id: &str) -> bool {
        self.dispatcher
            .dispatch(UiCommand::DismissIncoming(call_id.to_owned()));
        self.dispatcher.dispatch(UiCommand::StopRinging);

        self.registry.reject(Some(call_id))
    }

    fn hangup(&self, call_id: &str) -> bool {
        self.dispatcher
            .dispatch(UiCommand::DismissIncoming(call_id.to_owned()));
        self.dispatcher.dispatch(UiCommand::StopRinging);

        let ended = self
            .registry
            .end_with_reason(Some(call_id), EndReason::Hangup);
        if ended && self.ticker.stop_if_ended(&self.registry).is_some() {
            self.dispatcher.dispatch(UiCommand::DismissOngoing);
        }
        ended
    }
}
