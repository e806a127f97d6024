//! Confidant SDK
//!
//! Shared library providing error types and the liveness collaborator.
//! This crate is used by both the engine and the status server.

/// Error types and handling
pub mod errors;

/// Liveness counters and health snapshots
pub mod health;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use health::{HealthChecker, HealthSnapshot};
