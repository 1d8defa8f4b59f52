//! End-to-end tests for the wired lock runtime: acquire/conflict/release
//! cycles, subscriber delivery, and background reclamation.

use std::time::Duration;

use blueprint_common::BlueprintError;
use blueprint_lock::{LockActor, LockConfig, LockRuntime};

fn runtime() -> LockRuntime {
    LockRuntime::with_config(LockConfig::new(60000, 5000).unwrap())
}

fn alice() -> LockActor {
    LockActor::new("u1", "alice")
}

fn bob() -> LockActor {
    LockActor::new("u2", "bob")
}

#[tokio::test]
async fn editing_session_lifecycle() {
    let runtime = runtime();
    let service = runtime.service();

    let granted = service.acquire_at("ep-1", &alice(), 0).unwrap();
    assert_eq!(granted.expires_at_ms, 60000);
    assert!(service.is_held_by_at("ep-1", "u1", 1000));

    let conflict = service.acquire_at("ep-1", &bob(), 1000).unwrap_err();
    match conflict {
        BlueprintError::ResourceLocked {
            owner_label,
            expires_at,
            ..
        } => {
            assert_eq!(owner_label, "alice");
            assert_eq!(expires_at.timestamp_millis(), 60000);
        }
        other => panic!("expected ResourceLocked, got {other:?}"),
    }

    service.release("ep-1", "u1");

    let taken = service.acquire_at("ep-1", &bob(), 2001).unwrap();
    assert_eq!(taken.owner_id, "u2");
    assert_eq!(taken.expires_at_ms, 62001);
}

#[tokio::test]
async fn subscriber_observes_transitions_in_order() {
    let runtime = runtime();
    let mut rx = runtime.subscribe("ep-1", "sess-1");

    // sync on join: the resource starts unlocked
    assert!(rx.recv().await.unwrap().lock.is_none());

    let service = runtime.service();
    service.acquire_at("ep-1", &alice(), 0).unwrap();
    // a conflicting attempt publishes nothing
    service.acquire_at("ep-1", &bob(), 1000).unwrap_err();
    service.release("ep-1", "u1");
    service.acquire_at("ep-1", &bob(), 2001).unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.lock.unwrap().owner_id, "u1");

    let second = rx.recv().await.unwrap();
    assert!(second.lock.is_none());

    let third = rx.recv().await.unwrap();
    assert_eq!(third.lock.unwrap().owner_id, "u2");

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn late_subscriber_sees_current_lock_immediately() {
    let runtime = runtime();
    runtime.service().acquire("ep-1", &alice()).unwrap();

    let mut rx = runtime.subscribe("ep-1", "sess-2");
    let initial = rx.recv().await.unwrap();
    assert_eq!(initial.resource_id, "ep-1");
    assert_eq!(initial.lock.unwrap().owner_label, "alice");
}

#[tokio::test]
async fn disconnect_drops_all_subscriptions() {
    let runtime = runtime();
    let mut rx1 = runtime.subscribe("ep-1", "sess-1");
    let mut rx2 = runtime.subscribe("ep-2", "sess-1");
    rx1.recv().await.unwrap();
    rx2.recv().await.unwrap();

    runtime.unsubscribe_all("sess-1");
    runtime.service().acquire("ep-1", &alice()).unwrap();
    runtime.service().acquire("ep-2", &bob()).unwrap();

    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_err());
}

#[tokio::test]
async fn abandoned_lock_is_reclaimed_and_broadcast_once() {
    // short TTL and sweep interval so the abandoned lock expires quickly
    let runtime = LockRuntime::with_config(LockConfig::new(30, 20).unwrap());
    let mut rx = runtime.subscribe("ep-1", "sess-1");
    assert!(rx.recv().await.unwrap().lock.is_none());

    runtime.service().acquire("ep-1", &alice()).unwrap();
    assert_eq!(rx.recv().await.unwrap().lock.unwrap().owner_id, "u1");

    runtime.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    runtime.shutdown();

    // exactly one cleared broadcast for the reclaimed lock
    let cleared = rx.recv().await.unwrap();
    assert!(cleared.lock.is_none());
    assert!(rx.try_recv().is_err());

    assert!(!runtime.service().is_held_by("ep-1", "u1"));
    assert_eq!(runtime.service().stats().expired_swept, 1);

    // the slot is immediately acquirable again
    assert!(runtime.service().acquire("ep-1", &bob()).is_ok());
}

#[tokio::test]
async fn bootstrap_requires_complete_configuration() {
    let settings = ::config::Config::builder()
        .set_override("blueprint.lock.duration_ms", 60000)
        .unwrap()
        .build()
        .unwrap();

    let err = LockRuntime::bootstrap(&settings).err().unwrap();
    assert!(err.to_string().contains("lock configuration"));

    let settings = ::config::Config::builder()
        .set_override("blueprint.lock.duration_ms", 60000)
        .unwrap()
        .set_override("blueprint.lock.cleanup_interval_ms", 5000)
        .unwrap()
        .build()
        .unwrap();
    assert!(LockRuntime::bootstrap(&settings).is_ok());
}
