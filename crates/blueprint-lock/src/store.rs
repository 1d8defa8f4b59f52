//! In-memory lock store
//!
//! Holds the current set of edit locks keyed by resource id. The store holds
//! no business rules; expiry and ownership decisions live in the service.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::EditLock;

/// DashMap-backed lock store keyed by resource id
pub struct LockStore {
    locks: DashMap<String, EditLock>,
}

impl Default for LockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStore {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub fn get(&self, resource_id: &str) -> Option<EditLock> {
        self.locks.get(resource_id).map(|l| l.clone())
    }

    pub fn insert(&self, lock: EditLock) {
        self.locks.insert(lock.resource_id.clone(), lock);
    }

    pub fn remove(&self, resource_id: &str) -> Option<EditLock> {
        self.locks.remove(resource_id).map(|(_, lock)| lock)
    }

    /// Exclusive entry view for a resource. Check-then-mutate sequences in
    /// the service run under this guard so two concurrent acquires for the
    /// same resource serialize and exactly one wins.
    pub(crate) fn entry(&self, resource_id: &str) -> Entry<'_, String, EditLock> {
        self.locks.entry(resource_id.to_string())
    }

    /// Snapshot of all entries, used by the expiry sweep
    pub fn snapshot(&self) -> Vec<EditLock> {
        self.locks.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
