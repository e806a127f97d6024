//! Error types and handling
//!
//! This module provides the error types used throughout the Confidant engine.
//! All errors implement the `ErrorExt` trait which provides operator-facing
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages must never carry secrets (API keys, bot tokens). Upstream
//! response bodies are scrubbed by the engine before they are wrapped here.

use thiserror::Error;

/// Trait for engine error extensions
///
/// Provides additional context for errors, including a short hint and
/// recoverability information.
pub trait ErrorExt {
    /// Returns a short hint for the error, safe to print to an operator console
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors affect a single exchange and the process keeps
    /// serving. Non-recoverable errors stop startup.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Secrets**: Missing environment credentials
/// - **Network**: Listener binding and outbound HTTP setup
/// - **Platform**: Chat platform send failures
/// - **Panicked**: An exchange task panicked and was contained
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::Platform("chat not found".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::MissingSecret("TELEGRAM_TOKEN".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Secret errors
    #[error("Missing secret: {0} is not set in the environment")]
    MissingSecret(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Chat platform errors
    #[error("Platform error: {0}")]
    Platform(String),

    // Contained exchange panics
    #[error("Exchange panicked: {0}")]
    Panicked(String),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingSecret(_) => {
                "Set TELEGRAM_TOKEN, YANDEX_API_KEY and YANDEX_FOLDER_ID before starting"
            }
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Platform(_) => "Telegram rejected the request. Check the bot token",
            Self::Panicked(_) => "An exchange crashed. The bot keeps serving other messages",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::MissingSecret(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_are_fatal() {
        assert!(!EngineError::Config("bad".into()).is_recoverable());
        assert!(!EngineError::MissingSecret("YANDEX_API_KEY".into()).is_recoverable());
    }

    #[test]
    fn test_exchange_errors_are_recoverable() {
        assert!(EngineError::Platform("blocked".into()).is_recoverable());
        assert!(EngineError::Panicked("boom".into()).is_recoverable());
    }

    #[test]
    fn test_panicked_message_carries_payload() {
        let err = EngineError::Panicked("typing exploded".into());
        assert_eq!(err.to_string(), "Exchange panicked: typing exploded");
    }

    #[test]
    fn test_missing_secret_message_names_variable() {
        let err = EngineError::MissingSecret("YANDEX_FOLDER_ID".into());
        assert!(err.to_string().contains("YANDEX_FOLDER_ID"));
    }
}
