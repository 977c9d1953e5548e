//! HTTP + WebSocket surface for the intake flow.

pub mod chat;
pub mod ws;

pub use chat::{ChatRouteState, chat_routes};
pub use ws::{IntakeRouteState, ServerMessage, intake_routes};

use std::sync::Arc;

use axum::{Json, Router, response::IntoResponse, routing::get};
use tower_http::cors::CorsLayer;

use crate::config::{ACKNOWLEDGE_SYSTEM_PROMPT, IntakeConfig, RECOMMEND_SYSTEM_PROMPT};
use crate::error::ConfigError;
use crate::reply::{ReplySource, create_openai_source};

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "intake-assist"
    }))
}

/// Assemble every route around the given reply sources.
pub fn app(
    acknowledge: Arc<dyn ReplySource>,
    recommend: Arc<dyn ReplySource>,
    config: &IntakeConfig,
) -> Router {
    let chat = chat_routes(ChatRouteState {
        acknowledge: Arc::clone(&acknowledge),
        recommend,
    });
    let intake = intake_routes(IntakeRouteState {
        source: acknowledge,
        settings: config.session.clone(),
    });

    Router::new()
        .route("/health", get(health))
        .merge(chat)
        .merge(intake)
        .layer(CorsLayer::permissive())
}

/// Build the router backed by the upstream API.
pub fn upstream_app(config: &IntakeConfig) -> Result<Router, ConfigError> {
    let upstream = config.require_upstream()?;
    let acknowledge = create_openai_source(upstream, ACKNOWLEDGE_SYSTEM_PROMPT)?;
    let recommend = create_openai_source(upstream, RECOMMEND_SYSTEM_PROMPT)?;
    Ok(app(acknowledge, recommend, config))
}
