//! End-to-end call scenarios against the registry and deduplicator

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use callkit_core::{
    ActionDeduplicator, CallAction, CallData, CallEvent, CallSessionRegistry, CallState,
};
use serde_json::json;

#[test]
fn answered_call_becomes_active() {
    let registry = CallSessionRegistry::new();
    let call = CallData::from_payload(&json!({
        "id": "c1",
        "callerName": "Alice",
        "isVideoCall": false
    }))
    .unwrap();

    registry.set_incoming_call(call);
    assert!(!registry.has_active_call());
    assert!(registry.has_live_call());

    assert!(registry.answer(Some("c1")));
    assert!(registry.has_active_call());

    let summary = registry.get_active_summary().unwrap();
    assert_eq!(summary.caller_name, "Alice");
    assert_eq!(summary.state, CallState::Active);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["state"], "active");
}

#[test]
fn rejected_call_is_ended_and_pointer_cleared() {
    let registry = CallSessionRegistry::new();
    registry.set_incoming_call(CallData::new("c2", "Bob"));

    assert!(registry.reject(Some("c2")));

    assert_eq!(registry.get_incoming_call(), None);
    assert_eq!(registry.get_session("c2").unwrap().state(), CallState::Ended);
    assert!(!registry.has_live_call());
}

#[tokio::test(start_paused = true)]
async fn rapid_double_decline_rejects_once() {
    let registry = CallSessionRegistry::new();
    let dedup = ActionDeduplicator::default();
    let mut events = registry.events().receiver();
    registry.set_incoming_call(CallData::new("c3", "Carol"));

    let mut rejects = 0;
    for _ in 0..2 {
        if !dedup.should_suppress(CallAction::Decline, "c3") && registry.reject(Some("c3")) {
            rejects += 1;
        }
        tokio::time::advance(Duration::from_millis(500)).await;
    }

    assert_eq!(rejects, 1);
    assert!(matches!(events.try_recv().unwrap(), CallEvent::Rejected { .. }));
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn dedup_forgets_after_stale_window() {
    let dedup = ActionDeduplicator::default();

    assert!(!dedup.should_suppress(CallAction::Answer, "call-1"));
    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(dedup.should_suppress(CallAction::Answer, "call-1"));
    tokio::time::advance(Duration::from_secs(10)).await;
    assert!(!dedup.should_suppress(CallAction::Answer, "call-1"));
}

#[test]
fn concurrent_answers_only_one_wins() {
    let registry = Arc::new(CallSessionRegistry::new());
    registry.set_incoming_call(CallData::new("c4", "Dave"));
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                if registry.answer(Some("c4")) {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(registry.get_session("c4").unwrap().state(), CallState::Active);
}

#[test]
fn concurrent_pointer_reads_see_whole_values() {
    let registry = Arc::new(CallSessionRegistry::new());
    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..200 {
                registry.set_incoming_call(CallData::new(format!("c{i}"), format!("Caller {i}")));
                registry.clear_incoming_call();
            }
        })
    };

    for _ in 0..200 {
        if let Some(call) = registry.get_incoming_call() {
            let n = call.id.trim_start_matches('c');
            assert_eq!(call.caller_name, format!("Caller {n}"));
        }
    }
    writer.join().unwrap();
}

#[test]
fn housekeeping_sweeps_only_ended_sessions() {
    let registry = CallSessionRegistry::new();
    registry.set_incoming_call(CallData::new("a", "A"));
    registry.set_incoming_call(CallData::new("b", "B"));
    registry.create_active_session(CallData::new("c", "C"));

    assert!(registry.reject(Some("a")));
    assert!(registry.end(Some("c")));

    assert_eq!(registry.cleanup_ended(), 2);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get_session("b").unwrap().state(), CallState::Ringing);
}
