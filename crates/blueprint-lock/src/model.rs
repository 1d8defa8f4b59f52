//! Edit-lock data model

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identity of an actor acquiring or releasing locks.
///
/// `id` is the authenticated identity used for all ownership checks; `label`
/// is a denormalized display name carried along for client UIs only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockActor {
    pub id: String,
    pub label: String,
}

impl LockActor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// An exclusive, time-bounded editing claim on one resource.
///
/// A lock whose `expires_at_ms` has passed is semantically absent even if
/// still present in the store; readers must go through the `is_live_at`
/// check rather than mere presence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    /// Opaque identifier of the locked resource
    pub resource_id: String,
    /// Identity of the holder
    pub owner_id: String,
    /// Display name of the holder
    pub owner_label: String,
    /// Expiry as Unix epoch milliseconds
    pub expires_at_ms: i64,
}

impl EditLock {
    /// Create a lock granted at `now_ms` and valid for `duration_ms`
    pub fn granted(
        resource_id: impl Into<String>,
        actor: &LockActor,
        now_ms: i64,
        duration_ms: i64,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            owner_id: actor.id.clone(),
            owner_label: actor.label.clone(),
            expires_at_ms: now_ms + duration_ms,
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }

    pub fn is_live_at(&self, now_ms: i64) -> bool {
        !self.is_expired_at(now_ms)
    }

    pub fn is_owned_by(&self, actor_id: &str) -> bool {
        self.owner_id == actor_id
    }

    /// Extend the expiry in place (heartbeat re-acquisition by the holder).
    /// The label is refreshed too; a user may have been renamed mid-session.
    pub fn refresh(&mut self, actor: &LockActor, now_ms: i64, duration_ms: i64) {
        self.owner_label = actor.label.clone();
        self.expires_at_ms = now_ms + duration_ms;
    }

    /// Expiry as an absolute UTC timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.expires_at_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Lock description carried inside a broadcast event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEventPayload {
    pub owner_id: String,
    pub owner_label: String,
    /// ISO-8601 expiry for client display
    pub expires_at: DateTime<Utc>,
}

impl From<&EditLock> for LockEventPayload {
    fn from(lock: &EditLock) -> Self {
        Self {
            owner_id: lock.owner_id.clone(),
            owner_label: lock.owner_label.clone(),
            expires_at: lock.expires_at(),
        }
    }
}

/// Lock-state-changed event fanned out to every subscriber of a resource.
/// `lock: None` is the explicit "lock cleared" signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEvent {
    pub resource_id: String,
    pub lock: Option<LockEventPayload>,
}

impl LockEvent {
    pub fn changed(lock: &EditLock) -> Self {
        Self {
            resource_id: lock.resource_id.clone(),
            lock: Some(lock.into()),
        }
    }

    pub fn cleared(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            lock: None,
        }
    }
}

/// Current wall-clock time as Unix epoch milliseconds
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}
