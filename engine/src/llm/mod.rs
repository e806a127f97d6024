//! Completion service abstraction layer
//!
//! This module defines the conversation turn types, the request derived from
//! a session, and the [`CompletionProvider`] trait that concrete backends
//! implement. [`client::CompletionClient`] wraps a provider with pacing, the
//! worker pool, the hard timeout and fallback mapping, so that callers only
//! ever see a [`client::CompletionResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PromptMode;

pub mod client;
pub mod yandex;

pub use client::{CompletionClient, CompletionOutcome, CompletionResult};

/// Result type for completion operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while talking to the completion service
///
/// These never leave [`client::CompletionClient::complete`].
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl LlmError {
    /// Whether the service answered 2xx with an unexpected payload shape
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Role of a turn's speaker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message entry in a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What is sent to the completion service for one exchange
///
/// In [`PromptMode::LatestTurn`] `context` is empty: only the system text and
/// the newest user text are transmitted, although the session retains more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_text: String,
    pub context: Vec<Turn>,
    pub latest_user_text: String,
}

impl CompletionRequest {
    /// Derive the request from a session's turns
    ///
    /// `turns[0]` is the system turn. When no user turn exists the user text
    /// is empty.
    pub fn from_turns(turns: &[Turn], mode: PromptMode) -> Self {
        let system_text = turns
            .first()
            .filter(|t| t.role == Role::System)
            .map(|t| t.content.clone())
            .unwrap_or_default();

        let latest_user = turns.iter().rposition(|t| t.role == Role::User);

        let latest_user_text = latest_user
            .map(|idx| turns[idx].content.clone())
            .unwrap_or_default();

        let context = match (mode, latest_user) {
            (PromptMode::FullHistory, Some(idx)) => turns[..idx]
                .iter()
                .filter(|t| t.role != Role::System)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        Self {
            system_text,
            context,
            latest_user_text,
        }
    }

    /// All turns in wire order: system, context, latest user
    pub fn turns(&self) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.context.len() + 2);
        turns.push(Turn::system(self.system_text.as_str()));
        turns.extend(self.context.iter().cloned());
        turns.push(Turn::user(self.latest_user_text.as_str()));
        turns
    }
}

/// Backend that turns a request into reply text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "yandexgpt")
    fn name(&self) -> &str;

    /// Generate reply text for the request
    ///
    /// # Returns
    /// * `Ok(String)` - The reply text
    /// * `Err(LlmError)` - Transport, status, or payload failure
    async fn generate(&self, request: &CompletionRequest) -> Result<String>;
}
