//! Completion client
//!
//! Wraps a [`CompletionProvider`] so that a completion call is a total
//! function: every path, including timeouts, worker failures and unexpected
//! payloads, yields a [`CompletionResult`] with text that can be shown to the
//! user.
//!
//! Each call:
//! 1. derives the [`CompletionRequest`] from the session's turns,
//! 2. waits for a permit from the bounded worker pool,
//! 3. sleeps the fixed dispatch delay,
//! 4. runs the provider call on a spawned task under a hard timeout,
//! 5. maps the outcome to reply text or a canned fallback.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::{CompletionProvider, CompletionRequest, LlmError, Result, Turn};
use crate::config::{CompletionConfig, PromptMode};

/// Shown when the service is unreachable, times out or answers non-2xx
pub const TRANSPORT_FALLBACK: &str = "Извините, у меня временные технические трудности. Попробуйте повторить через минуту. Я здесь, чтобы вас поддержать.";

/// Shown when the service answers 2xx with an unexpected payload
pub const MALFORMED_FALLBACK: &str =
    "Извините, произошла ошибка при получении ответа. Попробуйте еще раз.";

/// How a completion call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Success,
    TransportFailure,
    MalformedResponse,
}

/// Reply text plus how it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub text: String,
    pub outcome: CompletionOutcome,
}

impl CompletionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: CompletionOutcome::Success,
        }
    }

    pub fn transport_failure() -> Self {
        Self {
            text: TRANSPORT_FALLBACK.to_string(),
            outcome: CompletionOutcome::TransportFailure,
        }
    }

    pub fn malformed() -> Self {
        Self {
            text: MALFORMED_FALLBACK.to_string(),
            outcome: CompletionOutcome::MalformedResponse,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == CompletionOutcome::Success
    }
}

/// Paced, bounded, timeout-guarded access to a completion provider
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    permits: Arc<Semaphore>,
    dispatch_delay: Duration,
    timeout: Duration,
    prompt_mode: PromptMode,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .field("available_permits", &self.permits.available_permits())
            .field("dispatch_delay", &self.dispatch_delay)
            .field("timeout", &self.timeout)
            .field("prompt_mode", &self.prompt_mode)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &CompletionConfig) -> Self {
        Self {
            provider,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            dispatch_delay: config.dispatch_delay(),
            timeout: config.request_timeout(),
            prompt_mode: config.prompt_mode,
        }
    }

    pub fn prompt_mode(&self) -> PromptMode {
        self.prompt_mode
    }

    /// Produce reply text for a session's current turns
    ///
    /// Never fails: upstream errors are logged and replaced by a fallback.
    pub async fn complete(&self, turns: &[Turn]) -> CompletionResult {
        let request = CompletionRequest::from_turns(turns, self.prompt_mode);

        match self.dispatch(request).await {
            Ok(text) => CompletionResult::success(text),
            Err(e) if e.is_malformed() => {
                error!(provider = self.provider.name(), error = %e, "Unexpected completion response structure");
                CompletionResult::malformed()
            }
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Completion request failed");
                CompletionResult::transport_failure()
            }
        }
    }

    async fn dispatch(&self, request: CompletionRequest) -> Result<String> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| LlmError::Worker(e.to_string()))?;

        // Upstream rate limit
        if !self.dispatch_delay.is_zero() {
            tokio::time::sleep(self.dispatch_delay).await;
        }

        let provider = Arc::clone(&self.provider);
        let timeout = self.timeout;
        debug!(provider = provider.name(), ?timeout, "Dispatching completion request");

        let handle = tokio::spawn(async move {
            let _permit = permit;
            tokio::time::timeout(timeout, provider.generate(&request)).await
        });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(LlmError::Timeout),
            Err(join_error) => Err(LlmError::Worker(join_error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider returning a scripted result and recording requests
    struct ScriptedProvider {
        reply: fn() -> Result<String>,
        delay: Duration,
        seen: Mutex<Vec<CompletionRequest>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(reply: fn() -> Result<String>) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn fast_config() -> CompletionConfig {
        CompletionConfig {
            dispatch_delay_ms: 0,
            ..CompletionConfig::default()
        }
    }

    fn turns() -> Vec<Turn> {
        vec![Turn::system("sys"), Turn::user("old"), Turn::assistant("a"), Turn::user("new")]
    }

    #[tokio::test]
    async fn test_success_passes_text_through() {
        let client = CompletionClient::new(
            Arc::new(ScriptedProvider::new(|| Ok("Слышу тебя".to_string()))),
            &fast_config(),
        );
        let result = client.complete(&turns()).await;
        assert_eq!(result, CompletionResult::success("Слышу тебя"));
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_status_error_maps_to_transport_fallback() {
        let client = CompletionClient::new(
            Arc::new(ScriptedProvider::new(|| {
                Err(LlmError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            })),
            &fast_config(),
        );
        let result = client.complete(&turns()).await;
        assert_eq!(result.text, TRANSPORT_FALLBACK);
        assert_eq!(result.outcome, CompletionOutcome::TransportFailure);
    }

    #[tokio::test]
    async fn test_malformed_maps_to_distinct_fallback() {
        let client = CompletionClient::new(
            Arc::new(ScriptedProvider::new(|| Err(LlmError::Malformed("{}".into())))),
            &fast_config(),
        );
        let result = client.complete(&turns()).await;
        assert_eq!(result.text, MALFORMED_FALLBACK);
        assert_ne!(MALFORMED_FALLBACK, TRANSPORT_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_timeout_yields_transport_fallback() {
        let config = CompletionConfig {
            request_timeout_secs: 1,
            ..fast_config()
        };
        let provider = ScriptedProvider::new(|| Ok("late".to_string()))
            .with_delay(Duration::from_secs(60));
        let client = CompletionClient::new(Arc::new(provider), &config);

        let result = client.complete(&turns()).await;
        assert_eq!(result.outcome, CompletionOutcome::TransportFailure);
    }

    #[tokio::test]
    async fn test_latest_turn_mode_forwards_only_newest_user_text() {
        let provider = Arc::new(ScriptedProvider::new(|| Ok("ok".to_string())));
        let client = CompletionClient::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            &fast_config(),
        );
        client.complete(&turns()).await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].latest_user_text, "new");
        assert!(seen[0].context.is_empty());
    }

    #[tokio::test]
    async fn test_full_history_mode_forwards_context() {
        let provider = Arc::new(ScriptedProvider::new(|| Ok("ok".to_string())));
        let config = CompletionConfig {
            prompt_mode: PromptMode::FullHistory,
            ..fast_config()
        };
        let client =
            CompletionClient::new(Arc::clone(&provider) as Arc<dyn CompletionProvider>, &config);
        client.complete(&turns()).await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].context.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_bounds_concurrency() {
        let provider = Arc::new(
            ScriptedProvider::new(|| Ok("ok".to_string())).with_delay(Duration::from_millis(50)),
        );
        let config = CompletionConfig {
            max_in_flight: 2,
            ..fast_config()
        };
        let client = Arc::new(CompletionClient::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            &config,
        ));

        let calls: Vec<_> = (0..6)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.complete(&turns()).await })
            })
            .collect();
        for call in calls {
            assert!(call.await.unwrap().is_success());
        }

        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(provider.seen.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_delay_applied() {
        let config = CompletionConfig {
            dispatch_delay_ms: 1000,
            ..CompletionConfig::default()
        };
        let client = CompletionClient::new(
            Arc::new(ScriptedProvider::new(|| Ok("ok".to_string()))),
            &config,
        );

        let start = tokio::time::Instant::now();
        client.complete(&turns()).await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }
}
