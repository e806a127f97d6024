//! Confidant Engine Library
//!
//! This library provides the core functionality of the Confidant bot.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Credential loading and log scrubbing
pub mod secrets;

/// Content gate
pub mod safety;

/// Per-user conversation sessions
pub mod session;

/// Completion service abstraction layer
pub mod llm;

/// Reply chunking
pub mod chunker;

/// Exchange orchestration
pub mod exchange;

/// Telegram bot module
pub mod bot;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
