//! Exchange orchestration
//!
//! One inbound user message becomes one exchange:
//!
//! 1. the content gate screens the text; a rejected message gets the refusal
//!    and touches nothing else,
//! 2. the typing indicator is shown,
//! 3. the liveness counter is ticked,
//! 4. the user turn is appended to the session,
//! 5. the completion client produces reply text (never fails),
//! 6. the assistant turn is appended,
//! 7. the reply is chunked and delivered in order with pacing between parts.
//!
//! Any error or panic after the gate is contained here: it is logged and the
//! user gets the processing-error message. Exchanges and session commands
//! of one user run one at a time; different users proceed concurrently.

pub mod replies;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chunker::ResponseChunker;
use crate::config::Config;
use crate::llm::{CompletionClient, Role};
use crate::safety::SafetyGate;
use crate::session::{SessionStore, UserId};
use sdk::errors::EngineError;
use sdk::health::HealthChecker;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Show the "typing…" indicator in a chat
    async fn send_typing(&self, chat_id: i64) -> Result<(), EngineError>;

    /// Send one text message to a chat
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), EngineError>;
}

/// A text message received from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub chat_id: i64,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<UserId>, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chat_id,
            text: text.into(),
        }
    }
}

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Rejected by the content gate
    Blocked,

    /// Reply delivered in `parts` messages
    Replied { parts: usize },

    /// Failed after the gate; the processing-error message was attempted
    Failed,
}

/// Drives exchanges between users, sessions and the completion service
pub struct ExchangeOrchestrator {
    gate: SafetyGate,
    sessions: Arc<SessionStore>,
    completion: CompletionClient,
    health: Arc<HealthChecker>,
    sink: Arc<dyn ChatSink>,
    chunker: ResponseChunker,
    pacing: Duration,
    typing_indicator: bool,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl ExchangeOrchestrator {
    pub fn new(
        config: &Config,
        completion: CompletionClient,
        health: Arc<HealthChecker>,
        sink: Arc<dyn ChatSink>,
    ) -> Self {
        Self {
            gate: SafetyGate::new(&config.safety.denylist),
            sessions: Arc::new(SessionStore::from_config(&config.session)),
            completion,
            health,
            sink,
            chunker: ResponseChunker::new(config.delivery.max_part_length),
            pacing: config.delivery.pacing(),
            typing_indicator: config.delivery.typing_indicator,
            user_locks: DashMap::new(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn health(&self) -> &Arc<HealthChecker> {
        &self.health
    }

    /// Run one exchange for an inbound message
    pub async fn handle_message(&self, message: InboundMessage) -> ExchangeOutcome {
        let InboundMessage {
            user_id,
            chat_id,
            text,
        } = &message;

        if !self.gate.is_allowed(text) {
            info!(%user_id, "Message blocked");
            self.send_best_effort(*chat_id, replies::REFUSAL).await;
            return ExchangeOutcome::Blocked;
        }

        let lock = self.user_lock(*user_id);
        let _guard = lock.lock().await;

        let exchange = AssertUnwindSafe(self.run_exchange(&message)).catch_unwind();
        let err = match exchange.await {
            Ok(Ok(parts)) => {
                debug!(%user_id, parts, "Exchange completed");
                return ExchangeOutcome::Replied { parts };
            }
            Ok(Err(e)) => e,
            Err(panic) => panic_error(panic.as_ref()),
        };

        error!(%user_id, error = %err, "Exchange failed");
        self.send_best_effort(*chat_id, replies::PROCESSING_ERROR).await;
        ExchangeOutcome::Failed
    }

    /// Re-seed the session and return the personalised welcome
    ///
    /// Waits for any exchange of the same user that is still in flight.
    pub async fn start(&self, user_id: UserId, first_name: Option<&str>) -> String {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.sessions.reset(user_id);
        replies::welcome(first_name)
    }

    /// Re-seed the session and return the confirmation
    pub async fn reset(&self, user_id: UserId) -> &'static str {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.sessions.reset(user_id);
        replies::RESET
    }

    pub fn help(&self) -> &'static str {
        replies::HELP
    }

    async fn run_exchange(&self, message: &InboundMessage) -> Result<usize, EngineError> {
        let user_id = message.user_id;
        let chat_id = message.chat_id;

        if self.typing_indicator {
            if let Err(e) = self.sink.send_typing(chat_id).await {
                warn!(%user_id, error = %e, "Failed to send typing indicator");
            }
        }

        self.health.tick();

        self.sessions.append(user_id, Role::User, message.text.as_str());
        let session = self.sessions.get_or_create(user_id);

        let result = self.completion.complete(&session.messages).await;
        if !result.is_success() {
            warn!(%user_id, outcome = ?result.outcome, "Replying with fallback text");
        }

        self.sessions
            .append(user_id, Role::Assistant, result.text.as_str());

        let parts = self.chunker.split(&result.text);
        let last = parts.len().saturating_sub(1);
        for (i, part) in parts.iter().enumerate() {
            self.sink.send_text(chat_id, part).await?;
            if i < last && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        Ok(parts.len())
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.user_locks
                .entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    async fn send_best_effort(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.sink.send_text(chat_id, text).await {
            error!(chat_id, error = %e, "Failed to deliver message");
        }
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> EngineError {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    EngineError::Panicked(message)
}
