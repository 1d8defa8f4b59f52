//! Blueprint Common - Shared types for Blueprint services
//!
//! This crate provides the foundational types used across Blueprint
//! components, starting with the error types shared by the lock core and its
//! callers.

pub mod error;

// Re-exports for convenience
pub use error::BlueprintError;
