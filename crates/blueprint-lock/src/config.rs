//! Lock service configuration
//!
//! Both values are resolved once at startup; absence or a non-positive value
//! fails startup rather than being handled per-call.

use blueprint_common::BlueprintError;

/// Settings key for the lock time-to-live granted on each acquire/refresh
pub const LOCK_DURATION_MS: &str = "blueprint.lock.duration_ms";
/// Settings key for the expiry sweep interval
pub const CLEANUP_INTERVAL_MS: &str = "blueprint.lock.cleanup_interval_ms";

/// Resolved lock service configuration
#[derive(Clone, Copy, Debug)]
pub struct LockConfig {
    /// How long an acquired or refreshed lock remains valid
    pub lock_duration_ms: i64,
    /// How often the expiry sweeper scans the store
    pub cleanup_interval_ms: u64,
}

impl LockConfig {
    pub fn new(lock_duration_ms: i64, cleanup_interval_ms: i64) -> Result<Self, BlueprintError> {
        if lock_duration_ms <= 0 {
            return Err(BlueprintError::ConfigError(format!(
                "{LOCK_DURATION_MS} must be positive, got {lock_duration_ms}"
            )));
        }
        if cleanup_interval_ms <= 0 {
            return Err(BlueprintError::ConfigError(format!(
                "{CLEANUP_INTERVAL_MS} must be positive, got {cleanup_interval_ms}"
            )));
        }
        Ok(Self {
            lock_duration_ms,
            cleanup_interval_ms: cleanup_interval_ms as u64,
        })
    }

    /// Resolve from a layered settings source (files plus environment, as
    /// assembled by the host application)
    pub fn resolve(settings: &::config::Config) -> Result<Self, BlueprintError> {
        let lock_duration_ms = settings
            .get_int(LOCK_DURATION_MS)
            .map_err(|e| BlueprintError::ConfigError(format!("{LOCK_DURATION_MS}: {e}")))?;
        let cleanup_interval_ms = settings
            .get_int(CLEANUP_INTERVAL_MS)
            .map_err(|e| BlueprintError::ConfigError(format!("{CLEANUP_INTERVAL_MS}: {e}")))?;
        Self::new(lock_duration_ms, cleanup_interval_ms)
    }
}
