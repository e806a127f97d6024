//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - start: Run the status server and the Telegram bot
//! - ask: Run one exchange with replies printed to the console
//! - config: Print the effective configuration

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::bot::TelegramBot;
use crate::config::Config;
use crate::exchange::{ChatSink, ExchangeOrchestrator, ExchangeOutcome, InboundMessage};
use crate::llm::yandex::YandexGptProvider;
use crate::llm::CompletionClient;
use crate::secrets::{CompletionCredentials, Secrets};
use sdk::errors::EngineError;
use sdk::health::HealthChecker;
use status_server::StatusServer;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Run the bot until Ctrl-C
///
/// The status server is started first; if it cannot bind, the failure is
/// logged and the bot runs without it.
pub async fn handle_start(config: &Config) -> Result<()> {
    let secrets = Secrets::from_env().context("Missing credentials")?;
    let health = Arc::new(HealthChecker::new());

    let mut status_server = if config.keep_alive.enabled {
        let addr = config.keep_alive.socket_addr()?;
        match StatusServer::start(addr, Arc::clone(&health)).await {
            Ok(server) => {
                info!(addr = %server.local_addr(), "Status server listening");
                Some(server)
            }
            Err(e) => {
                error!(%addr, error = %e, "Status server failed to start, continuing without it");
                None
            }
        }
    } else {
        info!("Status server disabled");
        None
    };

    let provider = YandexGptProvider::new(&config.completion, secrets.completion)?;
    let completion = CompletionClient::new(Arc::new(provider), &config.completion);

    let bot = TelegramBot::new(&secrets.telegram_token);
    let orchestrator = Arc::new(ExchangeOrchestrator::new(
        config,
        completion,
        health,
        bot.sink(),
    ));

    info!("Bot is up and ready");
    bot.run(orchestrator).await;

    if let Some(server) = status_server.as_mut() {
        server.stop();
    }

    Ok(())
}

/// Sink that collects replies for printing
#[derive(Debug, Default)]
struct ConsoleSink {
    replies: Mutex<Vec<String>>,
}

impl ConsoleSink {
    fn take(&self) -> Vec<String> {
        self.replies
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatSink for ConsoleSink {
    async fn send_typing(&self, _chat_id: i64) -> Result<(), EngineError> {
        Ok(())
    }

    async fn send_text(&self, _chat_id: i64, text: &str) -> Result<(), EngineError> {
        self.replies
            .lock()
            .map_err(|e| EngineError::Platform(e.to_string()))?
            .push(text.to_string());
        Ok(())
    }
}

/// Run one exchange through the gate, session, completion and chunker
///
/// Only the completion credentials are needed; no Telegram token is read.
pub async fn handle_ask(text: String, user: u64, config: &Config, format: OutputFormat) -> Result<()> {
    let credentials = CompletionCredentials::from_env().context("Missing credentials")?;
    let provider = YandexGptProvider::new(&config.completion, credentials)?;
    let completion = CompletionClient::new(Arc::new(provider), &config.completion);

    let sink = Arc::new(ConsoleSink::default());
    let orchestrator = ExchangeOrchestrator::new(
        config,
        completion,
        Arc::new(HealthChecker::new()),
        Arc::clone(&sink) as Arc<dyn ChatSink>,
    );

    let outcome = orchestrator
        .handle_message(InboundMessage::new(user, user as i64, text))
        .await;
    let replies = sink.take();

    match format {
        OutputFormat::Text => {
            for reply in &replies {
                println!("{}", reply);
                println!();
            }
            match outcome {
                ExchangeOutcome::Blocked => println!("✗ Message blocked by content gate"),
                ExchangeOutcome::Replied { parts } => println!("✓ Reply delivered in {} part(s)", parts),
                ExchangeOutcome::Failed => println!("✗ Exchange failed"),
            }
        }
        OutputFormat::Json => {
            let (status, parts) = match outcome {
                ExchangeOutcome::Blocked => ("blocked", 0),
                ExchangeOutcome::Replied { parts } => ("replied", parts),
                ExchangeOutcome::Failed => ("failed", 0),
            };
            let output = json!({
                "status": status,
                "parts": parts,
                "replies": replies,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if outcome == ExchangeOutcome::Failed {
        warn!("Exchange did not complete");
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
