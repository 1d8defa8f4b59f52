//! Lock subscription management
//!
//! Tracks which real-time sessions are watching which resources and fans
//! lock-state events out to them. Any viewer may subscribe to observe lock
//! state, not just the lock holder. Decoupled from the transport: a session
//! is just an id plus an event channel handed in by the gateway.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::{EditLock, LockEvent};

/// Per-subscriber channel capacity. A slow consumer that falls this far
/// behind starts losing events rather than blocking publishers.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

/// Narrow publish capability the lock service depends on, independent of any
/// concrete transport or registry.
pub trait LockEventSink: Send + Sync {
    /// Fan the event out to all current subscribers of its resource.
    /// Best-effort, at-most-once; never fails back into the caller.
    fn publish(&self, event: LockEvent);
}

/// Manages lock subscriptions across all sessions
pub struct LockSubscriberManager {
    /// Map from resource id to session_id -> event sender
    resource_subscribers: DashMap<String, HashMap<String, mpsc::Sender<LockEvent>>>,

    /// Map from session id to set of resource ids
    /// Used for efficient cleanup when a session disconnects
    session_resources: DashMap<String, HashSet<String>>,
}

impl Default for LockSubscriberManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockSubscriberManager {
    pub fn new() -> Self {
        Self {
            resource_subscribers: DashMap::new(),
            session_resources: DashMap::new(),
        }
    }

    /// Register a session's interest in a resource and immediately send it
    /// the current lock state (sync on join), so a client connecting to an
    /// already-locked resource never renders a stale view.
    pub fn subscribe(
        &self,
        resource_id: &str,
        session_id: &str,
        tx: mpsc::Sender<LockEvent>,
        current: Option<EditLock>,
    ) {
        let initial = match current {
            Some(ref lock) => LockEvent::changed(lock),
            None => LockEvent::cleared(resource_id),
        };
        Self::deliver(resource_id, session_id, &tx, initial);

        self.resource_subscribers
            .entry(resource_id.to_string())
            .or_default()
            .insert(session_id.to_string(), tx);

        self.session_resources
            .entry(session_id.to_string())
            .or_default()
            .insert(resource_id.to_string());

        debug!(resource_id = %resource_id, session_id = %session_id, "Lock subscription added");
    }

    /// Unsubscribe a session from a specific resource
    pub fn unsubscribe(&self, resource_id: &str, session_id: &str) {
        if let Some(mut subscribers) = self.resource_subscribers.get_mut(resource_id) {
            subscribers.remove(session_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.resource_subscribers.remove(resource_id);
            }
        }

        if let Some(mut resources) = self.session_resources.get_mut(session_id) {
            resources.remove(resource_id);
        }
    }

    /// Unsubscribe a session from all resources (called on disconnect)
    pub fn unsubscribe_all(&self, session_id: &str) {
        if let Some((_, resource_ids)) = self.session_resources.remove(session_id) {
            for resource_id in resource_ids {
                if let Some(mut subscribers) = self.resource_subscribers.get_mut(&resource_id) {
                    subscribers.remove(session_id);
                    if subscribers.is_empty() {
                        drop(subscribers);
                        self.resource_subscribers.remove(&resource_id);
                    }
                }
            }
            debug!(session_id = %session_id, "All lock subscriptions removed");
        }
    }

    /// Number of sessions watching a resource
    pub fn subscriber_count(&self, resource_id: &str) -> usize {
        self.resource_subscribers
            .get(resource_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Number of resources with at least one watcher
    pub fn resource_count(&self) -> usize {
        self.resource_subscribers.len()
    }

    /// Number of sessions with at least one subscription
    pub fn session_count(&self) -> usize {
        self.session_resources.len()
    }

    fn deliver(
        resource_id: &str,
        session_id: &str,
        tx: &mpsc::Sender<LockEvent>,
        event: LockEvent,
    ) {
        // A full or closed receiver is skipped; one slow subscriber must not
        // affect lock state or other subscribers.
        if let Err(e) = tx.try_send(event) {
            warn!(
                resource_id = %resource_id,
                session_id = %session_id,
                error = %e,
                "Dropping lock event for unreachable subscriber"
            );
        }
    }
}

impl LockEventSink for LockSubscriberManager {
    fn publish(&self, event: LockEvent) {
        if let Some(subscribers) = self.resource_subscribers.get(&event.resource_id) {
            for (session_id, tx) in subscribers.iter() {
                Self::deliver(&event.resource_id, session_id, tx, event.clone());
            }
        }
    }
}
