//! YandexGPT Provider
//!
//! Implements [`CompletionProvider`] for the Yandex Cloud Foundation Models
//! completion endpoint.
//!
//! Key features:
//! - `Api-Key` authorization
//! - Non-streaming completion with fixed temperature and token budget
//! - System and user text sent as separate structured messages
//! - Error mapping to [`LlmError`]

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{CompletionProvider, CompletionRequest, LlmError, Result};
use crate::config::CompletionConfig;
use crate::secrets::{self, CompletionCredentials, SecretString};
use sdk::errors::EngineError;

/// Longest upstream body excerpt kept in error messages
const BODY_EXCERPT_CHARS: usize = 500;

/// YandexGPT provider configuration
#[derive(Debug, Clone)]
pub struct YandexGptProvider {
    /// Completion endpoint URL
    endpoint: String,

    /// `gpt://<folder_id>/<model>`
    model_uri: String,

    api_key: SecretString,
    temperature: f64,
    max_tokens: u32,

    /// HTTP client for API requests
    client: Client,
}

impl YandexGptProvider {
    /// Create a provider from configuration and credentials
    ///
    /// # Errors
    /// Returns `EngineError::Network` if the HTTP client cannot be built.
    pub fn new(
        config: &CompletionConfig,
        credentials: CompletionCredentials,
    ) -> std::result::Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model_uri: format!("gpt://{}/{}", credentials.folder_id, config.model),
            api_key: credentials.api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model_uri(&self) -> &str {
        &self.model_uri
    }

    /// Build the JSON request body
    fn build_request(&self, request: &CompletionRequest) -> YandexRequest<'_> {
        let messages = request
            .turns()
            .into_iter()
            .map(|turn| YandexMessage {
                role: turn.role.to_string(),
                text: turn.content,
            })
            .collect();

        YandexRequest {
            model_uri: &self.model_uri,
            completion_options: CompletionOptions {
                stream: false,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            messages,
        }
    }
}

#[async_trait]
impl CompletionProvider for YandexGptProvider {
    fn name(&self) -> &str {
        "yandexgpt"
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);

        tracing::debug!(
            model_uri = %self.model_uri,
            messages = body.messages.len(),
            total_chars = body.messages.iter().map(|m| m.text.chars().count()).sum::<usize>(),
            "YandexGPT request"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Api-Key {}", self.api_key.unsecure()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(secrets::scrub(&e.to_string()))
                }
            })?;

        let status = response.status();
        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "YandexGPT response received"
        );

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: excerpt(&secrets::scrub(&text)),
            });
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Parse(format!("Failed to parse YandexGPT response: {}", e))
            }
        })?;

        extract_text(&payload)
    }
}

/// Pull `result.alternatives[0].message.text` out of a reply payload
pub fn extract_text(payload: &serde_json::Value) -> Result<String> {
    payload
        .get("result")
        .and_then(|r| r.get("alternatives"))
        .and_then(|a| a.as_array())
        .and_then(|a| a.first())
        .and_then(|alt| alt.get("message"))
        .and_then(|m| m.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::Malformed(excerpt(&payload.to_string())))
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= BODY_EXCERPT_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

/// YandexGPT request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexRequest<'a> {
    model_uri: &'a str,
    completion_options: CompletionOptions,
    messages: Vec<YandexMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct YandexMessage {
    role: String,
    text: String,
}
