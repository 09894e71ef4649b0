//! Duplicate action suppression
//!
//! Platform notification frameworks can deliver the same action signal more
//! than once: a double tap, a redelivered intent, an activity relaunch. The
//! [`ActionDeduplicator`] answers "is this the same action for the same call
//! that we just handled?" so the second delivery can be dropped.
//!
//! Two windows drive the decision:
//!
//! - `duplicate_window`: a repeated `(action, call id)` pair arriving within
//!   this long after the last recorded action is suppressed.
//! - `stale_window`: once this long has passed since the last recorded action,
//!   everything tracked so far is forgotten.
//!
//! Both windows are measured from the last *recorded* action, across all
//! calls. Suppressed signals are not recorded, so a burst of repeats cannot
//! keep itself alive.

use std::collections::HashSet;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::types::{CallAction, CallId};

/// Repeats closer than this to the last handled action are dropped
pub const DEFAULT_DUPLICATE_WINDOW: Duration = Duration::from_millis(2000);

/// Tracked actions are forgotten after this much inactivity
pub const DEFAULT_STALE_WINDOW: Duration = Duration::from_millis(10_000);

#[derive(Debug, Default)]
struct DedupState {
    recent: HashSet<(CallAction, CallId)>,
    last_action: Option<Instant>,
}

/// Suppresses repeated action signals for the same call
#[derive(Debug)]
pub struct ActionDeduplicator {
    duplicate_window: Duration,
    stale_window: Duration,
    state: Mutex<DedupState>,
}

impl ActionDeduplicator {
    /// Create a deduplicator with explicit windows
    pub fn new(duplicate_window: Duration, stale_window: Duration) -> Self {
        Self {
            duplicate_window,
            stale_window,
            state: Mutex::new(DedupState::default()),
        }
    }

    /// Window inside which a repeated signal is suppressed
    pub fn duplicate_window(&self) -> Duration {
        self.duplicate_window
    }

    /// Inactivity after which tracked signals are forgotten
    pub fn stale_window(&self) -> Duration {
        self.stale_window
    }

    /// Decide whether `(action, call_id)` is a duplicate.
    ///
    /// Returns `true` when the signal should be dropped. Otherwise the signal
    /// is recorded and `false` is returned.
    pub fn should_suppress(&self, action: CallAction, call_id: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();

        let since_last = state.last_action.map(|last| now.saturating_duration_since(last));

        if since_last.is_some_and(|elapsed| elapsed > self.stale_window) && !state.recent.is_empty() {
            debug!(tracked = state.recent.len(), "Forgetting stale call actions");
            state.recent.clear();
        }

        let key = (action, call_id.to_owned());
        if state.recent.contains(&key)
            && since_last.is_some_and(|elapsed| elapsed < self.duplicate_window)
        {
            debug!(action = %action, call_id = %call_id, "Suppressing duplicate call action");
            return true;
        }

        state.recent.insert(key);
        state.last_action = Some(now);
        false
    }

    /// Number of distinct signals currently remembered
    pub fn tracked_len(&self) -> usize {
        self.state.lock().recent.len()
    }

    /// Forget every recorded signal
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.recent.clear();
        state.last_action = None;
    }
}

impl Default for ActionDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_WINDOW, DEFAULT_STALE_WINDOW)
    }
}
