//! Error types for Blueprint services
//!
//! `BlueprintError` is the application-specific error enum surfaced
//! synchronously to the immediate caller; transports map the variants onto
//! their own response codes (409 for `ResourceLocked`, 403 for `NotLockOwner`).

use chrono::{DateTime, Utc};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum BlueprintError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    /// A live lock on the resource is held by a different actor. Carries the
    /// holder's display label and expiry for client display.
    #[error("resource '{resource_id}' is locked by '{owner_label}' until {expires_at}")]
    ResourceLocked {
        resource_id: String,
        owner_label: String,
        expires_at: DateTime<Utc>,
    },

    /// Raised by authorization layers when an edit is attempted without
    /// holding the lock. The lock core itself never returns this; it only
    /// answers the ownership question.
    #[error("actor '{actor_id}' does not hold the lock on '{resource_id}'")]
    NotLockOwner {
        resource_id: String,
        actor_id: String,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}
