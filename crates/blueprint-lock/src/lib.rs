//! Blueprint Lock - In-memory edit-lock core for the Blueprint platform
//!
//! Provides exclusive, time-bounded editing rights over opaque resources:
//! - Acquire with refresh-on-reacquire semantics and conflict reporting
//! - Owner-checked, idempotent-safe release
//! - Ownership queries used as authorization preconditions by edit guards
//! - Background reclamation of abandoned locks
//! - Real-time fan-out of lock-state transitions to subscribed sessions
//!
//! Locks are per-process state with no durability; a horizontally scaled
//! deployment would need a shared store with atomic conditional writes and
//! TTL behind the same seams.

pub mod config;
pub mod model;
pub mod service;
pub mod store;
pub mod subscriber;
pub mod sweeper;

pub use config::LockConfig;
pub use model::{EditLock, LockActor, LockEvent, LockEventPayload};
pub use service::{LockService, LockStats};
pub use store::LockStore;
pub use subscriber::{LockEventSink, LockSubscriberManager, SUBSCRIBER_CHANNEL_CAPACITY};
pub use sweeper::ExpiredLockSweeper;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

/// Wired-up lock subsystem: store, service, subscriber registry, and sweeper,
/// with a start/shutdown lifecycle owned by the host process.
pub struct LockRuntime {
    service: Arc<LockService>,
    subscribers: Arc<LockSubscriberManager>,
    sweeper: ExpiredLockSweeper,
}

impl LockRuntime {
    /// Build from the host application's layered settings source.
    /// Missing or invalid lock configuration fails startup here.
    pub fn bootstrap(settings: &::config::Config) -> anyhow::Result<Self> {
        let cfg = LockConfig::resolve(settings).context("resolving lock configuration")?;
        Ok(Self::with_config(cfg))
    }

    pub fn with_config(cfg: LockConfig) -> Self {
        let store = Arc::new(LockStore::new());
        let subscribers = Arc::new(LockSubscriberManager::new());
        let sink: Arc<dyn LockEventSink> = subscribers.clone();
        let service = Arc::new(LockService::new(store, sink, cfg.lock_duration_ms));
        let sweeper = ExpiredLockSweeper::new(service.clone(), cfg.cleanup_interval_ms);
        Self {
            service,
            subscribers,
            sweeper,
        }
    }

    /// Start the background sweep task
    pub fn start(&self) {
        self.sweeper.start();
    }

    /// Stop the background sweep task; no timers outlive shutdown
    pub fn shutdown(&self) {
        self.sweeper.stop();
    }

    pub fn service(&self) -> &Arc<LockService> {
        &self.service
    }

    pub fn subscribers(&self) -> &Arc<LockSubscriberManager> {
        &self.subscribers
    }

    /// Register a session's interest in a resource. The returned receiver
    /// immediately yields the resource's current lock state, then every
    /// subsequent transition, in order.
    pub fn subscribe(&self, resource_id: &str, session_id: &str) -> mpsc::Receiver<LockEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let current = self.service.status(resource_id);
        self.subscribers.subscribe(resource_id, session_id, tx, current);
        rx
    }

    pub fn unsubscribe(&self, resource_id: &str, session_id: &str) {
        self.subscribers.unsubscribe(resource_id, session_id);
    }

    /// Drop every subscription held by a session (transport disconnect)
    pub fn unsubscribe_all(&self, session_id: &str) {
        self.subscribers.unsubscribe_all(session_id);
    }
}
