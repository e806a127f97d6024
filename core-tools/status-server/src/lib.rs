//! Status Server
//!
//! Keeps the hosting environment from treating the bot as idle by answering
//! HTTP probes. Reads liveness counters from the shared [`HealthChecker`].
//!
//! # Endpoints
//!
//! - GET /       - HTML status page
//! - GET /health - JSON health snapshot
//! - GET /ping   - plain-text liveness token
//!
//! Every other path answers 404.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sdk::{EngineError, HealthChecker};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Body returned by `/ping`
pub const PING_TOKEN: &str = "pong";

/// Handle to a running status server
#[derive(Debug)]
pub struct StatusServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StatusServer {
    /// Bind the listener and spawn the serving task
    ///
    /// Port 0 picks a free port; the bound address is available from
    /// [`StatusServer::local_addr`].
    pub async fn start(addr: SocketAddr, checker: Arc<HealthChecker>) -> Result<Self, EngineError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;

        let app = router(checker);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            tracing::info!("Status server listening on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                    tracing::info!("Status server shutting down gracefully");
                })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Status server error: {}", e);
                });
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            shutdown_tx.send(()).ok();
            tracing::info!("Status server stopped");
        }
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the probe router
pub fn router(checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .fallback(not_found_handler)
        .with_state(checker)
}

async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    (StatusCode::OK, Json(checker.snapshot())).into_response()
}

async fn ping_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        PING_TOKEN,
    )
        .into_response()
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn index_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Мой психолог - Telegram Bot</title>
    <meta charset="utf-8">
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
        .status {{ color: #28a745; font-weight: bold; }}
        .info {{ margin: 10px 0; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>🤖 Мой психолог - Telegram Bot</h1>
        <p class="status">✅ Бот активен и работает</p>
        <div class="info">
            <p><strong>Статус:</strong> Онлайн</p>
            <p><strong>Технология:</strong> YandexGPT</p>
            <p><strong>Запущен:</strong> {started}</p>
            <p><strong>Сообщений обработано:</strong> {checks}</p>
        </div>
        <p>Найдите бота в Telegram и начните общение командой /start</p>
    </div>
</body>
</html>"#,
        started = checker.started_at(),
        checks = checker.checks_performed(),
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}
