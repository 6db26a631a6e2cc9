use crate::metrics::MetricsReport;
use crate::pipeline::Dispatcher;
use crate::telegram::{self, TelegramClient, Update};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Header Telegram sets to the `secret_token` given to `setWebhook`
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub struct AppState {
    pub bot: TelegramClient,
    pub dispatcher: Arc<Dispatcher>,
    pub webhook_secret: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cache: MetricsReport,
    pub rate_limit_keys: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Acknowledge immediately and process the update on its own task, so a slow
/// translation never delays delivery of other chats' updates.
async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(provided, &state.webhook_secret) {
        warn!("Rejected webhook call with missing or invalid secret");
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejected malformed webhook update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    tokio::spawn(async move {
        let update_id = update.update_id;
        if let Err(e) = telegram::handle_update(&state.bot, &state.dispatcher, update).await {
            error!("Failed to handle update {}: {:#}", update_id, e);
        }
    });

    StatusCode::OK
}

async fn health() -> &'static str {
    "OK"
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.dispatcher.cache().report(),
        rate_limit_keys: state.dispatcher.limiter().tracked_keys(),
    })
}

/// Constant-time comparison of the webhook secret
fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(p) if p.len() == expected.len() => p.as_bytes().ct_eq(expected.as_bytes()).into(),
        _ => false,
    }
}
