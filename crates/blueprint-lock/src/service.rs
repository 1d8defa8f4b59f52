//! Edit-lock service
//!
//! The only component with lock business rules: acquire with
//! refresh-on-reacquire, owner-checked release, ownership queries, and the
//! expiry sweep. All check-then-mutate sequences run under the store's entry
//! guard for the resource, so concurrent acquires serialize and exactly one
//! wins. Events are published through a narrow sink while that guard is held,
//! which keeps per-resource event order equal to mutation order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tracing::{debug, info};

use blueprint_common::BlueprintError;

use crate::model::{EditLock, LockActor, LockEvent, current_timestamp};
use crate::store::LockStore;
use crate::subscriber::LockEventSink;

/// In-memory edit-lock service
pub struct LockService {
    store: Arc<LockStore>,
    sink: Arc<dyn LockEventSink>,
    lock_duration_ms: i64,
    stats: LockStatsCollector,
}

#[derive(Default)]
struct LockStatsCollector {
    acquisitions: AtomicU64,
    refreshes: AtomicU64,
    conflicts: AtomicU64,
    releases: AtomicU64,
    expired_swept: AtomicU64,
}

/// Point-in-time lock service counters
#[derive(Clone, Debug, Default, Serialize)]
pub struct LockStats {
    /// Locks currently held and unexpired
    pub active_locks: usize,
    pub acquisitions: u64,
    pub refreshes: u64,
    pub conflicts: u64,
    pub releases: u64,
    pub expired_swept: u64,
}

impl LockService {
    pub fn new(store: Arc<LockStore>, sink: Arc<dyn LockEventSink>, lock_duration_ms: i64) -> Self {
        Self {
            store,
            sink,
            lock_duration_ms,
            stats: LockStatsCollector::default(),
        }
    }

    /// Acquire the lock on a resource, stamping the current time.
    ///
    /// Succeeds against a free or expired slot, refreshes when the caller
    /// already holds the lock, and fails with
    /// [`BlueprintError::ResourceLocked`] when a live lock belongs to a
    /// different actor. Exactly one event is published per successful call,
    /// none on conflict.
    pub fn acquire(&self, resource_id: &str, actor: &LockActor) -> Result<EditLock, BlueprintError> {
        self.acquire_at(resource_id, actor, current_timestamp())
    }

    /// Acquire with an explicit clock value
    pub fn acquire_at(
        &self,
        resource_id: &str,
        actor: &LockActor,
        now_ms: i64,
    ) -> Result<EditLock, BlueprintError> {
        if resource_id.is_empty() {
            return Err(BlueprintError::IllegalArgument(
                "resource id must not be empty".to_string(),
            ));
        }
        if actor.id.is_empty() {
            return Err(BlueprintError::IllegalArgument(
                "actor id must not be empty".to_string(),
            ));
        }

        match self.store.entry(resource_id) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                if existing.is_live_at(now_ms) {
                    if !existing.is_owned_by(&actor.id) {
                        self.stats.conflicts.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            resource_id = %resource_id,
                            actor_id = %actor.id,
                            owner_id = %existing.owner_id,
                            "Lock acquire conflict"
                        );
                        return Err(BlueprintError::ResourceLocked {
                            resource_id: resource_id.to_string(),
                            owner_label: existing.owner_label.clone(),
                            expires_at: existing.expires_at(),
                        });
                    }
                    existing.refresh(actor, now_ms, self.lock_duration_ms);
                    self.stats.refreshes.fetch_add(1, Ordering::Relaxed);
                } else {
                    *existing = EditLock::granted(resource_id, actor, now_ms, self.lock_duration_ms);
                    self.stats.acquisitions.fetch_add(1, Ordering::Relaxed);
                }
                let granted = existing.clone();
                self.sink.publish(LockEvent::changed(&granted));
                debug!(resource_id = %resource_id, owner_id = %actor.id, "Lock acquired");
                Ok(granted)
            }
            Entry::Vacant(vacant) => {
                let granted =
                    EditLock::granted(resource_id, actor, now_ms, self.lock_duration_ms);
                let guard = vacant.insert(granted.clone());
                self.stats.acquisitions.fetch_add(1, Ordering::Relaxed);
                self.sink.publish(LockEvent::changed(&granted));
                drop(guard);
                debug!(resource_id = %resource_id, owner_id = %actor.id, "Lock acquired");
                Ok(granted)
            }
        }
    }

    /// Release the lock on a resource if `actor_id` owns it.
    ///
    /// Releasing a lock that is absent, expired-and-reclaimed, or owned by
    /// someone else is a benign no-op: the caller's intent ("I'm done
    /// editing") is satisfied either way, and a non-owner must not be able to
    /// affect state. Expired-but-present locks still owned by the caller are
    /// removed and a cleared event published.
    pub fn release(&self, resource_id: &str, actor_id: &str) {
        match self.store.entry(resource_id) {
            Entry::Occupied(occupied) => {
                if occupied.get().is_owned_by(actor_id) {
                    // cleared event goes out under the entry guard, just
                    // before removal, to preserve per-resource ordering
                    self.sink.publish(LockEvent::cleared(resource_id));
                    occupied.remove();
                    self.stats.releases.fetch_add(1, Ordering::Relaxed);
                    debug!(resource_id = %resource_id, actor_id = %actor_id, "Lock released");
                } else {
                    debug!(
                        resource_id = %resource_id,
                        actor_id = %actor_id,
                        "Release ignored; lock held by another actor"
                    );
                }
            }
            Entry::Vacant(_) => {
                debug!(resource_id = %resource_id, actor_id = %actor_id, "Release ignored; no lock present");
            }
        }
    }

    /// Remove any lock on the resource regardless of owner (admin operation).
    /// Returns whether a lock was actually removed.
    pub fn force_release(&self, resource_id: &str) -> bool {
        match self.store.entry(resource_id) {
            Entry::Occupied(occupied) => {
                self.sink.publish(LockEvent::cleared(resource_id));
                occupied.remove();
                self.stats.releases.fetch_add(1, Ordering::Relaxed);
                info!(resource_id = %resource_id, "Lock force-released");
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Whether `actor_id` currently holds a live lock on the resource.
    /// The oracle used by edit guards before permitting content mutations.
    pub fn is_held_by(&self, resource_id: &str, actor_id: &str) -> bool {
        self.is_held_by_at(resource_id, actor_id, current_timestamp())
    }

    pub fn is_held_by_at(&self, resource_id: &str, actor_id: &str, now_ms: i64) -> bool {
        self.store
            .get(resource_id)
            .map(|lock| lock.is_live_at(now_ms) && lock.is_owned_by(actor_id))
            .unwrap_or(false)
    }

    /// Current lock state of a resource; `None` for absent or expired locks
    /// (lazy expiry read path, used for sync-on-join).
    pub fn status(&self, resource_id: &str) -> Option<EditLock> {
        self.status_at(resource_id, current_timestamp())
    }

    pub fn status_at(&self, resource_id: &str, now_ms: i64) -> Option<EditLock> {
        self.store
            .get(resource_id)
            .filter(|lock| lock.is_live_at(now_ms))
    }

    /// Remove every expired entry, publishing one cleared event per reclaimed
    /// resource. Returns the number of locks reclaimed. Called periodically
    /// by the sweeper; lazy expiry on the read and acquire paths makes this a
    /// cleanliness backstop, not a correctness requirement.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(current_timestamp())
    }

    pub fn sweep_expired_at(&self, now_ms: i64) -> usize {
        let candidates: Vec<String> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|lock| lock.is_expired_at(now_ms))
            .map(|lock| lock.resource_id)
            .collect();

        let mut swept = 0;
        for resource_id in candidates {
            if let Entry::Occupied(occupied) = self.store.entry(&resource_id) {
                // re-check under the guard; a refresh may have raced the scan
                if occupied.get().is_expired_at(now_ms) {
                    self.sink.publish(LockEvent::cleared(&resource_id));
                    occupied.remove();
                    swept += 1;
                    debug!(resource_id = %resource_id, "Expired lock reclaimed");
                }
            }
        }

        if swept > 0 {
            self.stats
                .expired_swept
                .fetch_add(swept as u64, Ordering::Relaxed);
        }
        swept
    }

    /// Number of currently live locks
    pub fn active_lock_count(&self) -> usize {
        let now_ms = current_timestamp();
        self.store
            .snapshot()
            .iter()
            .filter(|lock| lock.is_live_at(now_ms))
            .count()
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            active_locks: self.active_lock_count(),
            acquisitions: self.stats.acquisitions.load(Ordering::Relaxed),
            refreshes: self.stats.refreshes.load(Ordering::Relaxed),
            conflicts: self.stats.conflicts.load(Ordering::Relaxed),
            releases: self.stats.releases.load(Ordering::Relaxed),
            expired_swept: self.stats.expired_swept.load(Ordering::Relaxed),
        }
    }
}
