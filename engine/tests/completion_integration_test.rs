//! Integration tests for the YandexGPT completion path
//!
//! Runs the real HTTP provider against a wiremock server and checks the
//! request shape plus the mapping of every failure mode to fallback text.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use confidant_engine::config::{CompletionConfig, PromptMode};
use confidant_engine::llm::client::{MALFORMED_FALLBACK, TRANSPORT_FALLBACK};
use confidant_engine::llm::yandex::YandexGptProvider;
use confidant_engine::llm::{CompletionClient, CompletionOutcome, Turn};
use confidant_engine::secrets::{CompletionCredentials, SecretString};

const COMPLETION_PATH: &str = "/foundationModels/v1/completion";

fn config_for(server: &MockServer) -> CompletionConfig {
    CompletionConfig {
        endpoint: format!("{}{}", server.uri(), COMPLETION_PATH),
        dispatch_delay_ms: 0,
        request_timeout_secs: 1,
        ..CompletionConfig::default()
    }
}

fn client_for(config: &CompletionConfig) -> CompletionClient {
    let credentials = CompletionCredentials {
        api_key: SecretString::new("AQVNtestkey"),
        folder_id: "b1gfolder".to_string(),
    };
    let provider = YandexGptProvider::new(config, credentials).unwrap();
    CompletionClient::new(Arc::new(provider), config)
}

fn session() -> Vec<Turn> {
    vec![
        Turn::system("Будь добрым"),
        Turn::user("Мне одиноко"),
        Turn::assistant("Слышу тебя"),
        Turn::user("Привет"),
    ]
}

fn success_body(text: &str) -> serde_json::Value {
    json!({
        "result": {
            "alternatives": [{
                "message": {"role": "assistant", "text": text},
                "status": "ALTERNATIVE_STATUS_FINAL"
            }],
            "usage": {"inputTextTokens": "20", "completionTokens": "8", "totalTokens": "28"},
            "modelVersion": "23.10.2024"
        }
    })
}

#[tokio::test]
async fn test_successful_completion_sends_expected_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .and(header("Authorization", "Api-Key AQVNtestkey"))
        .and(body_partial_json(json!({
            "modelUri": "gpt://b1gfolder/yandexgpt-lite",
            "completionOptions": {"stream": false, "temperature": 0.8, "maxTokens": 300},
            "messages": [
                {"role": "system", "text": "Будь добрым"},
                {"role": "user", "text": "Привет"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Рад тебя видеть!")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&config_for(&server));
    let result = client.complete(&session()).await;

    assert_eq!(result.outcome, CompletionOutcome::Success);
    assert_eq!(result.text, "Рад тебя видеть!");
}

#[tokio::test]
async fn test_full_history_mode_sends_retained_turns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "text": "Будь добрым"},
                {"role": "user", "text": "Мне одиноко"},
                {"role": "assistant", "text": "Слышу тебя"},
                {"role": "user", "text": "Привет"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = CompletionConfig {
        prompt_mode: PromptMode::FullHistory,
        ..config_for(&server)
    };
    let result = client_for(&config).complete(&session()).await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_server_error_yields_transport_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let result = client_for(&config_for(&server)).complete(&session()).await;

    assert_eq!(result.outcome, CompletionOutcome::TransportFailure);
    assert_eq!(result.text, TRANSPORT_FALLBACK);
}

#[tokio::test]
async fn test_unauthorized_yields_transport_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&server)
        .await;

    let result = client_for(&config_for(&server)).complete(&session()).await;

    assert_eq!(result.text, TRANSPORT_FALLBACK);
}

#[tokio::test]
async fn test_missing_result_yields_malformed_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
        .mount(&server)
        .await;

    let result = client_for(&config_for(&server)).complete(&session()).await;

    assert_eq!(result.outcome, CompletionOutcome::MalformedResponse);
    assert_eq!(result.text, MALFORMED_FALLBACK);
}

#[tokio::test]
async fn test_non_json_success_body_yields_transport_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let result = client_for(&config_for(&server)).complete(&session()).await;

    assert_eq!(result.outcome, CompletionOutcome::TransportFailure);
}

#[tokio::test]
async fn test_slow_service_yields_transport_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = client_for(&config_for(&server)).complete(&session()).await;

    assert_eq!(result.outcome, CompletionOutcome::TransportFailure);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unreachable_service_yields_transport_fallback() {
    // Nothing listens on the reserved port
    let config = CompletionConfig {
        endpoint: "http://127.0.0.1:9/completion".to_string(),
        dispatch_delay_ms: 0,
        request_timeout_secs: 2,
        ..CompletionConfig::default()
    };

    let result = client_for(&config).complete(&session()).await;

    assert_eq!(result.text, TRANSPORT_FALLBACK);
}
