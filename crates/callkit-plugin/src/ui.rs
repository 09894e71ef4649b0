//! Platform UI collaborators and the command dispatcher
//!
//! Everything the service asks of the platform (alerts, ongoing-call
//! indicator, ringtone, launching a screen) goes through [`CallUi`]. Calls are
//! never made inline: the service posts a [`UiCommand`] to a
//! [`UiDispatcher`], whose background task applies commands in order. A
//! collaborator that fails or panics is logged and skipped, so registry state
//! never depends on whether a notification was actually rendered.
//!
//! # Implementing a collaborator
//!
//! ```rust
//! use async_trait::async_trait;
//! use callkit_plugin::{CallData, CallUi};
//!
//! struct LoggingUi;
//!
//! #[async_trait]
//! impl CallUi for LoggingUi {
//!     async fn show_incoming_call(&self, call: &CallData) -> anyhow::Result<()> {
//!         println!("{} is calling", call.caller_name);
//!         Ok(())
//!     }
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callkit_core::{CallAction, CallData, CallId};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::ticker::format_call_duration;

/// Snapshot pushed to the ongoing-call indicator
#[derive(Debug, Clone, PartialEq)]
pub struct OngoingCallUpdate {
    /// Call being shown
    pub call: CallData,
    /// Time since the indicator was started
    pub elapsed: Duration,
    /// `elapsed` formatted for display
    pub display: String,
}

impl OngoingCallUpdate {
    /// Update for `call` after `elapsed`
    pub fn new(call: CallData, elapsed: Duration) -> Self {
        Self {
            display: format_call_duration(elapsed),
            call,
            elapsed,
        }
    }
}

/// Platform side of call presentation
///
/// Every method defaults to doing nothing so implementations only override
/// what their platform supports.
#[async_trait]
pub trait CallUi: Send + Sync + 'static {
    /// Present the incoming-call alert
    async fn show_incoming_call(&self, _call: &CallData) -> anyhow::Result<()> {
        Ok(())
    }

    /// Remove the incoming-call alert
    async fn dismiss_incoming_call(&self, _call_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Show or refresh the persistent ongoing-call indicator
    async fn show_ongoing_call(&self, _update: &OngoingCallUpdate) -> anyhow::Result<()> {
        Ok(())
    }

    /// Show the persistent indicator for an outgoing call the remote accepted.
    ///
    /// Shares its slot with the ongoing indicator, so
    /// [`dismiss_ongoing_call`](CallUi::dismiss_ongoing_call) removes it too.
    async fn show_outgoing_call(&self, _call: &CallData) -> anyhow::Result<()> {
        Ok(())
    }

    /// Remove the ongoing-call indicator
    async fn dismiss_ongoing_call(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Start ringtone and vibration
    async fn start_ringing(&self, _call: &CallData) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop ringtone and vibration
    async fn stop_ringing(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Bring the application's call screen to the foreground
    async fn launch_foreground(&self, _action: CallAction, _call: &CallData) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Collaborator that ignores every request
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallUi;

impl CallUi for NoopCallUi {}

/// Request for the platform UI
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    ShowIncoming(CallData),
    DismissIncoming(CallId),
    ShowOngoing(OngoingCallUpdate),
    ShowOutgoing(CallData),
    DismissOngoing,
    StartRinging(CallData),
    StopRinging,
    LaunchForeground { action: CallAction, call: CallData },
}

impl UiCommand {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            UiCommand::ShowIncoming(_) => "show_incoming",
            UiCommand::DismissIncoming(_) => "dismiss_incoming",
            UiCommand::ShowOngoing(_) => "show_ongoing",
            UiCommand::ShowOutgoing(_) => "show_outgoing",
            UiCommand::DismissOngoing => "dismiss_ongoing",
            UiCommand::StartRinging(_) => "start_ringing",
            UiCommand::StopRinging => "stop_ringing",
            UiCommand::LaunchForeground { .. } => "launch_foreground",
        }
    }

    async fn apply(self, ui: &dyn CallUi) -> anyhow::Result<()> {
        match self {
            UiCommand::ShowIncoming(call) => ui.show_incoming_call(&call).await,
            UiCommand::DismissIncoming(call_id) => ui.dismiss_incoming_call(&call_id).await,
            UiCommand::ShowOngoing(update) => ui.show_ongoing_call(&update).await,
            UiCommand::ShowOutgoing(call) => ui.show_outgoing_call(&call).await,
            UiCommand::DismissOngoing => ui.dismiss_ongoing_call().await,
            UiCommand::StartRinging(call) => ui.start_ringing(&call).await,
            UiCommand::StopRinging => ui.stop_ringing().await,
            UiCommand::LaunchForeground { action, call } => ui.launch_foreground(action, &call).await,
        }
    }
}

#[derive(Debug)]
enum Message {
    Command(UiCommand),
    Flush(oneshot::Sender<()>),
}

/// Handle for posting commands to the UI worker
#[derive(Debug, Clone)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<Message>,
}

impl UiDispatcher {
    /// Spawn the worker on `handle` and return a dispatcher feeding it
    pub fn spawn(handle: &Handle, ui: Arc<dyn CallUi>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(ui, rx));
        (Self { tx }, worker)
    }

    /// Queue a command. Returns `false` once the worker has stopped.
    pub fn dispatch(&self, command: UiCommand) -> bool {
        let name = command.name();
        match self.tx.send(Message::Command(command)) {
            Ok(()) => true,
            Err(_) => {
                warn!(command = name, "UI worker stopped; dropping command");
                false
            }
        }
    }

    /// Wait until every command queued before this call has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Whether the worker is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_worker(ui: Arc<dyn CallUi>, mut rx: mpsc::UnboundedReceiver<Message>) {
    debug!("UI worker started");
    while let Some(message) = rx.recv().await {
        let command = match message {
            Message::Command(command) => command,
            Message::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let name = command.name();
        match AssertUnwindSafe(command.apply(ui.as_ref())).catch_unwind().await {
            Ok(Ok(())) => debug!(command = name, "UI command applied"),
            Ok(Err(e)) => warn!(command = name, error = %e, "UI command failed"),
            Err(_) => error!(command = name, "UI collaborator panicked"),
        }
    }
    debug!("UI worker stopped");
}
