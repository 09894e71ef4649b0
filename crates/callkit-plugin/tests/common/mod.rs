//! Shared helpers for call service integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use callkit_plugin::{CallAction, CallData, CallKit, CallKitConfig, CallUi, OngoingCallUpdate};
use parking_lot::Mutex;

/// Collaborator call as observed by [`RecordingUi`]
#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    ShowIncoming(String),
    DismissIncoming(String),
    ShowOngoing(String, String),
    ShowOutgoing(String),
    DismissOngoing,
    StartRinging(String),
    StopRinging,
    LaunchForeground(CallAction, String),
}

/// Collaborator that records every request
#[derive(Debug, Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&UiCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: UiCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl CallUi for RecordingUi {
    async fn show_incoming_call(&self, call: &CallData) -> anyhow::Result<()> {
        self.record(UiCall::ShowIncoming(call.id.clone()));
        Ok(())
    }

    async fn dismiss_incoming_call(&self, call_id: &str) -> anyhow::Result<()> {
        self.record(UiCall::DismissIncoming(call_id.to_owned()));
        Ok(())
    }

    async fn show_ongoing_call(&self, update: &OngoingCallUpdate) -> anyhow::Result<()> {
        self.record(UiCall::ShowOngoing(update.call.id.clone(), update.display.clone()));
        Ok(())
    }

    async fn show_outgoing_call(&self, call: &CallData) -> anyhow::Result<()> {
        self.record(UiCall::ShowOutgoing(call.id.clone()));
        Ok(())
    }

    async fn dismiss_ongoing_call(&self) -> anyhow::Result<()> {
        self.record(UiCall::DismissOngoing);
        Ok(())
    }

    async fn start_ringing(&self, call: &CallData) -> anyhow::Result<()> {
        self.record(UiCall::StartRinging(call.id.clone()));
        Ok(())
    }

    async fn stop_ringing(&self) -> anyhow::Result<()> {
        self.record(UiCall::StopRinging);
        Ok(())
    }

    async fn launch_foreground(&self, action: CallAction, call: &CallData) -> anyhow::Result<()> {
        self.record(UiCall::LaunchForeground(action, call.id.clone()));
        Ok(())
    }
}

/// Collaborator whose every request fails
#[derive(Debug, Default)]
pub struct FailingUi;

#[async_trait]
impl CallUi for FailingUi {
    async fn show_incoming_call(&self, _call: &CallData) -> anyhow::Result<()> {
        anyhow::bail!("notifications are disabled for this app")
    }

    async fn start_ringing(&self, _call: &CallData) -> anyhow::Result<()> {
        anyhow::bail!("audio focus denied")
    }

    async fn dismiss_incoming_call(&self, _call_id: &str) -> anyhow::Result<()> {
        anyhow::bail!("notification manager unavailable")
    }
}

/// Service wired to a fresh [`RecordingUi`]
pub fn recording_service() -> (CallKit, Arc<RecordingUi>) {
    let ui = Arc::new(RecordingUi::default());
    let callkit = CallKit::new(CallKitConfig::default(), ui.clone()).unwrap();
    (callkit, ui)
}
