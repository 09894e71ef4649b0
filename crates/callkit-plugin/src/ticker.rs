//! Ongoing-call duration ticker

use std::sync::Arc;
use std::time::Duration;

use callkit_core::{CallData, CallId, CallSessionRegistry};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::ui::{OngoingCallUpdate, UiCommand, UiDispatcher};

/// Format a call duration as `MM:SS`, or `HH:MM:SS` from one hour up
pub fn format_call_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

struct Running {
    call_id: CallId,
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    running: Option<Running>,
}

impl Slot {
    fn is_current(&self, generation: u64) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| running.generation == generation)
    }

    fn stop(&mut self) -> Option<CallId> {
        let running = self.running.take()?;
        running.task.abort();
        Some(running.call_id)
    }
}

/// Periodically refreshes the ongoing-call indicator with the elapsed time
///
/// At most one call is ticking; starting another replaces it. A tick is only
/// dispatched while its ticker is still the current one, checked under the
/// same lock `stop` takes, so nothing a stopped ticker sends can land after
/// the caller's dismiss.
pub struct OngoingCallTicker {
    handle: Handle,
    interval: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl OngoingCallTicker {
    /// Ticker that spawns on `handle` and refreshes every `interval`
    pub fn new(handle: Handle, interval: Duration) -> Self {
        Self {
            handle,
            interval,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Start ticking for `call`, stopping any previous ticker
    pub fn start(&self, call: CallData, dispatcher: UiDispatcher) {
        let call_id = call.id.clone();
        let interval = self.interval;
        let shared = self.slot.clone();

        // Held across the spawn so the task never sees the previous generation
        let mut slot = self.slot.lock();
        slot.generation += 1;
        let generation = slot.generation;

        let task = self.handle.spawn(async move {
            let started = Instant::now();
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let update = OngoingCallUpdate::new(call.clone(), started.elapsed());
                let delivered = {
                    let slot = shared.lock();
                    slot.is_current(generation)
                        && dispatcher.dispatch(UiCommand::ShowOngoing(update))
                };
                if !delivered {
                    break;
                }
            }
        });

        if let Some(previous) = slot.stop() {
            debug!(call_id = %previous, "Replaced ongoing call ticker");
        }
        slot.running = Some(Running {
            call_id: call_id.clone(),
            generation,
            task,
        });
        debug!(call_id = %call_id, "Started ongoing call ticker");
    }

    /// Stop ticking. Returns the call that was ticking, if any.
    pub fn stop(&self) -> Option<CallId> {
        let call_id = self.slot.lock().stop()?;
        debug!(call_id = %call_id, "Stopped ongoing call ticker");
        Some(call_id)
    }

    /// Stop ticking only if the call being shown is no longer live in `registry`.
    ///
    /// Returns the call that was stopped.
    pub fn stop_if_ended(&self, registry: &CallSessionRegistry) -> Option<CallId> {
        let mut slot = self.slot.lock();
        let call_id = slot.running.as_ref()?.call_id.clone();
        let live = registry
            .get_session(&call_id)
            .is_some_and(|session| session.state().is_live());
        if live {
            return None;
        }
        slot.stop();
        debug!(call_id = %call_id, "Stopped ticker for ended call");
        Some(call_id)
    }

    /// Call currently ticking
    pub fn current_call(&self) -> Option<CallId> {
        self.slot
            .lock()
            .running
            .as_ref()
            .map(|running| running.call_id.clone())
    }

    /// Whether any call is ticking
    pub fn is_running(&self) -> bool {
        self.slot.lock().running.is_some()
    }
}

impl std::fmt::Debug for OngoingCallTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OngoingCallTicker")
            .field("interval", &self.interval)
            .field("current_call", &self.current_call())
            .finish()
    }
}

impl Drop for OngoingCallTicker {
    fn drop(&mut self) {
        self.slot.lock().stop();
    }
}
