//! The application-facing call service
//!
//! [`CallKit`] is created once at start-up and shared (usually behind an
//! `Arc`) with every entry point that needs call state: the method bridge,
//! notification action handlers, push handlers. It owns the session registry,
//! the action deduplicator, the launch slot, the ongoing-call ticker and the
//! UI dispatcher.
//!
//! Requests made explicitly by the application report failure (for example
//! [`CallKitError::NoActiveCall`]); passive action signals never do.

use std::sync::Arc;

use callkit_core::{
    ActionDeduplicator, ActiveCallSummary, CallAction, CallCoreError, CallData, CallEvent, CallId,
    CallSessionRegistry, CallState, EndReason, EventEmitter, EventStream,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CallKitConfig;
use crate::error::{CallKitError, CallKitResult};
use crate::launch::{CallActionLaunch, LaunchSlot};
use crate::router::{ActionOutcome, ActionRouter};
use crate::ticker::OngoingCallTicker;
use crate::ui::{CallUi, UiCommand, UiDispatcher};

/// Call notification service
#[derive(Debug)]
pub struct CallKit {
    config: CallKitConfig,
    registry: Arc<CallSessionRegistry>,
    launches: Arc<LaunchSlot>,
    ticker: Arc<OngoingCallTicker>,
    dispatcher: UiDispatcher,
    router: ActionRouter,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CallKit {
    /// Create the service on the current tokio runtime
    pub fn new(config: CallKitConfig, ui: Arc<dyn CallUi>) -> CallKitResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CallKitError::runtime(format!("call service needs a tokio runtime: {e}")))?;
        Self::with_handle(config, ui, handle)
    }

    /// Create the service with background work spawned on `handle`
    pub fn with_handle(
        config: CallKitConfig,
        ui: Arc<dyn CallUi>,
        handle: Handle,
    ) -> CallKitResult<Self> {
        config.validate()?;

        let registry = Arc::new(CallSessionRegistry::with_emitter(EventEmitter::new(
            config.events.channel_capacity,
        )));
        let dedup = Arc::new(ActionDeduplicator::new(
            config.dedup.duplicate_window(),
            config.dedup.stale_window(),
        ));
        let launches = Arc::new(LaunchSlot::new());
        let ticker = Arc::new(OngoingCallTicker::new(
            handle.clone(),
            config.ongoing.update_interval(),
        ));
        let (dispatcher, worker) = UiDispatcher::spawn(&handle, ui);
        let router = ActionRouter::new(
            registry.clone(),
            dedup,
            dispatcher.clone(),
            ticker.clone(),
            launches.clone(),
        );

        info!(
            duplicate_window_ms = config.dedup.duplicate_window_ms,
            stale_window_ms = config.dedup.stale_window_ms,
            "Call service started"
        );

        Ok(Self {
            config,
            registry,
            launches,
            ticker,
            dispatcher,
            router,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Validated configuration the service was built with
    pub fn config(&self) -> &CallKitConfig {
        &self.config
    }

    /// Session registry backing this service
    pub fn registry(&self) -> &Arc<CallSessionRegistry> {
        &self.registry
    }

    /// Router for action signals from notification buttons and broadcasts
    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    /// Subscribe to call events as a stream
    pub fn subscribe(&self) -> EventStream {
        self.registry.subscribe()
    }

    /// Subscribe to call events with a plain broadcast receiver
    pub fn event_receiver(&self) -> broadcast::Receiver<CallEvent> {
        self.registry.events().receiver()
    }

    /// Turn an application payload into call data, defaulting missing fields
    pub fn call_data_from_payload(&self, payload: &Value) -> CallKitResult<CallData> {
        if payload.is_null() {
            return Err(CallKitError::invalid_arguments("call arguments required"));
        }
        Ok(CallData::from_payload_with(
            payload,
            &self.config.defaults.unknown_caller_name,
        )?)
    }

    /// Register and present an incoming call described by `payload`
    pub fn show_incoming_call(&self, payload: &Value) -> CallKitResult<CallData> {
        let call = self.call_data_from_payload(payload)?;
        self.present_incoming_call(call.clone());
        Ok(call)
    }

    /// Register and present an incoming call
    pub fn present_incoming_call(&self, call: CallData) {
        info!(call_id = %call.id, caller = %call.caller_name, "Showing incoming call");
        self.registry.set_incoming_call(call.clone());
        self.dispatcher.dispatch(UiCommand::ShowIncoming(call.clone()));
        self.dispatcher.dispatch(UiCommand::StartRinging(call));
    }

    /// Current incoming call, if one is being presented
    pub fn incoming_call(&self) -> Option<CallData> {
        self.registry.get_incoming_call()
    }

    /// Route a parsed action signal
    pub fn handle_action(&self, action: CallAction, call_id: &str) -> ActionOutcome {
        self.router.route(action, call_id)
    }

    /// Route an action signal as delivered by the platform
    pub fn handle_action_signal(&self, action: Option<&str>, call_id: Option<&str>) -> ActionOutcome {
        self.router.route_raw(action, call_id)
    }

    /// Answer a ringing call on the application's request
    pub fn answer_call(&self, call_id: Option<&str>) -> CallKitResult<()> {
        self.dismiss_alert(self.alert_target(call_id));
        if self.registry.answer(call_id) {
            Ok(())
        } else {
            Err(CallKitError::no_active_call("answer"))
        }
    }

    /// Reject a ringing call on the application's request.
    ///
    /// Returns whether a call was rejected; nothing to reject is not an error.
    pub fn reject_call(&self, call_id: Option<&str>) -> bool {
        self.dismiss_alert(self.alert_target(call_id));
        let rejected = self.registry.reject(call_id);
        if !rejected {
            debug!(call_id = ?call_id, "No ringing call to reject");
        }
        rejected
    }

    /// End a live call on the application's request
    pub fn end_call(&self, call_id: Option<&str>) -> CallKitResult<()> {
        self.end_call_with_reason(call_id, EndReason::Ended)
    }

    /// End a live call, reporting `reason` in `onCallEnded`.
    ///
    /// The ongoing indicator is only torn down when the call it shows is the
    /// one that ended; a failed request leaves every UI element in place.
    pub fn end_call_with_reason(&self, call_id: Option<&str>, reason: EndReason) -> CallKitResult<()> {
        let alert = self.alert_target(call_id);
        if !self.registry.end_with_reason(call_id, reason) {
            return Err(CallKitError::no_active_call("end"));
        }
        self.dismiss_alert(alert);
        if let Some(ended) = self.ticker.stop_if_ended(&self.registry) {
            debug!(call_id = %ended, "Hiding ongoing call indicator");
            self.dispatcher.dispatch(UiCommand::DismissOngoing);
        }
        Ok(())
    }

    /// Whether a call has been answered and is in progress
    pub fn is_call_active(&self) -> bool {
        self.registry.has_active_call()
    }

    /// Snapshot of the call in progress, or of the ringing call if none is
    pub fn active_call_data(&self) -> Option<ActiveCallSummary> {
        self.registry.get_active_summary()
    }

    /// Show the ongoing-call indicator for the call in `payload`
    pub fn force_show_ongoing(&self, payload: &Value) -> CallKitResult<CallData> {
        let call = self.call_data_from_payload(payload)?;
        self.show_ongoing(call.clone());
        Ok(call)
    }

    /// Mark `call` as in progress and start refreshing its ongoing indicator.
    ///
    /// A ringing session is answered; an unknown or ended one is replaced by
    /// a fresh active session.
    pub fn show_ongoing(&self, call: CallData) {
        match self.registry.get_session(&call.id).map(|session| session.state()) {
            Some(CallState::Ringing) => {
                self.registry.answer(Some(call.id.as_str()));
            }
            Some(CallState::Active) => {}
            Some(CallState::Ended) | None => self.registry.create_active_session(call.clone()),
        }

        self.dispatcher
            .dispatch(UiCommand::DismissIncoming(call.id.clone()));
        self.dispatcher.dispatch(UiCommand::StopRinging);
        info!(call_id = %call.id, "Showing ongoing call indicator");
        self.ticker.start(call, self.dispatcher.clone());
    }

    /// Show the indicator for a call the user placed and the remote accepted.
    ///
    /// Outgoing calls are not tracked by the registry; the indicator replaces
    /// any ongoing one and is removed with [`hide_ongoing`](Self::hide_ongoing).
    pub fn start_outgoing_call(&self, payload: &Value) -> CallKitResult<CallData> {
        let call = self.call_data_from_payload(payload)?;
        if let Some(previous) = self.ticker.stop() {
            debug!(call_id = %previous, "Outgoing call replaces ongoing indicator");
        }
        info!(call_id = %call.id, callee = %call.caller_name, "Showing outgoing call indicator");
        self.dispatcher.dispatch(UiCommand::ShowOutgoing(call.clone()));
        Ok(call)
    }

    /// Stop refreshing and remove the ongoing-call indicator
    pub fn hide_ongoing(&self) {
        if let Some(call_id) = self.ticker.stop() {
            debug!(call_id = %call_id, "Hiding ongoing call indicator");
        }
        self.dispatcher.dispatch(UiCommand::DismissOngoing);
    }

    /// Collect and clear the action that last launched the application
    pub fn take_call_action_launch(&self) -> Option<CallActionLaunch> {
        self.launches.take()
    }

    /// Whether a launch is waiting to be collected
    pub fn has_call_action_launch(&self) -> bool {
        self.launches.has()
    }

    /// Discard any uncollected launch
    pub fn clear_call_action_launch(&self) {
        self.launches.clear();
    }

    /// Drop ended sessions. Returns how many were removed.
    pub fn cleanup_ended_calls(&self) -> usize {
        let removed = self.registry.cleanup_ended();
        if removed > 0 {
            debug!(removed, "Cleaned up ended calls");
        }
        removed
    }

    /// Serve a method call from the application bridge
    pub fn handle_method(&self, method: &str, args: &Value) -> CallKitResult<Value> {
        debug!(method, "Handling method call");
        let result = match method {
            "showIncomingCall" => {
                self.show_incoming_call(args)?;
                json!(true)
            }
            "showIncomingCallWithConfig" => {
                if args.is_null() {
                    return Err(CallKitError::invalid_arguments(
                        "configuration and call data required",
                    ));
                }
                let call_data = args
                    .get("callData")
                    .filter(|call_data| call_data.is_object())
                    .ok_or_else(|| CallCoreError::invalid_payload("callData object required"))?;
                if args.get("config").is_some() {
                    debug!("Presentation config ignored");
                }
                self.show_incoming_call(call_data)?;
                json!(true)
            }
            "answerCall" => {
                self.answer_call(call_id_arg(args)?.as_deref())?;
                json!(true)
            }
            "rejectCall" => {
                let call_id = call_id_arg(args)?;
                json!(self.reject_call(call_id.as_deref()))
            }
            "endCall" => {
                let call_id = call_id_arg(args)?;
                let reason = match args.get("reason").and_then(Value::as_str) {
                    Some(reason) => reason
                        .parse::<EndReason>()
                        .map_err(|e| CallKitError::invalid_arguments(e.to_string()))?,
                    None => EndReason::Ended,
                };
                self.end_call_with_reason(call_id.as_deref(), reason)?;
                json!(true)
            }
            "isCallActive" => json!(self.is_call_active()),
            "getActiveCallData" => serde_json::to_value(self.active_call_data())?,
            "getIncomingCallData" => serde_json::to_value(self.incoming_call())?,
            "handleCallAction" => {
                let action = args.get("action").and_then(Value::as_str);
                let call_id = args.get("callId").and_then(Value::as_str);
                json!(self.handle_action_signal(action, call_id).to_string())
            }
            "getLastCallActionLaunch" => serde_json::to_value(self.take_call_action_launch())?,
            "hasCallActionLaunchData" => json!(self.has_call_action_launch()),
            "clearCallActionLaunchData" => {
                self.clear_call_action_launch();
                json!(true)
            }
            "forceShowOngoingNotification" => {
                self.force_show_ongoing(args)?;
                json!(true)
            }
            "hideOngoingNotification" | "stopCallForegroundService" => {
                self.hide_ongoing();
                json!(true)
            }
            "startOutgoingCallNotification" => {
                self.start_outgoing_call(args)?;
                json!(true)
            }
            "cleanupEndedCalls" => json!(self.cleanup_ended_calls()),
            other => {
                warn!(method = other, "Unsupported method call");
                return Err(CallKitError::not_implemented(other));
            }
        };
        Ok(result)
    }

    /// Wait until every queued UI command has been applied
    pub async fn flush_ui(&self) {
        self.dispatcher.flush().await;
    }

    /// Stop background work after draining queued UI commands
    pub async fn shutdown(&self) {
        self.ticker.stop();
        self.dispatcher.flush().await;
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
        info!("Call service stopped");
    }

    /// Alert a request refers to: the named call, or the one being presented
    fn alert_target(&self, call_id: Option<&str>) -> Option<CallId> {
        call_id
            .map(str::to_owned)
            .or_else(|| self.registry.get_incoming_call().map(|call| call.id))
    }

    fn dismiss_alert(&self, target: Option<CallId>) {
        if let Some(target) = target {
            self.dispatcher.dispatch(UiCommand::DismissIncoming(target));
        }
        self.dispatcher.dispatch(UiCommand::StopRinging);
    }
}

impl Drop for CallKit {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.abort();
        }
    }
}

/// Extract an optional call id from method arguments.
///
/// Accepts `null`, a bare string, or an object with `callId` (or `id`).
fn call_id_arg(args: &Value) -> CallKitResult<Option<String>> {
    let call_id = match args {
        Value::Null => None,
        Value::String(call_id) => Some(call_id.as_str()),
        Value::Object(map) => map
            .get("callId")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str),
        _ => return Err(CallKitError::invalid_arguments("call id must be a string")),
    };
    Ok(call_id
        .filter(|call_id| !call_id.trim().is_empty())
        .map(str::to_owned))
}
