//! Streaming reply endpoints — `POST /api/chat` and `POST /api/recommend`.
//!
//! Both answer with a chunked `text/plain` body carrying the generated reply
//! fragment by fragment. [`ChunkedTextSource`](crate::reply::ChunkedTextSource)
//! is the matching client.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::reply::{HistoryEntry, ReplySource};

/// Sources behind the two endpoints.
#[derive(Clone)]
pub struct ChatRouteState {
    /// Short acknowledgement of an intake answer.
    pub acknowledge: Arc<dyn ReplySource>,
    /// Free-form recommendation.
    pub recommend: Arc<dyn ReplySource>,
}

/// Request body: `{"message": "...", "chatHistory": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
}

/// Build the streaming reply routes.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/recommend", post(recommend))
        .with_state(state)
}

async fn chat(State(state): State<ChatRouteState>, Json(req): Json<ChatRequest>) -> Response {
    stream_reply(state.acknowledge.as_ref(), req).await
}

async fn recommend(State(state): State<ChatRouteState>, Json(req): Json<ChatRequest>) -> Response {
    stream_reply(state.recommend.as_ref(), req).await
}

async fn stream_reply(source: &dyn ReplySource, req: ChatRequest) -> Response {
    info!(
        source = source.name(),
        history = req.chat_history.len(),
        "Reply requested"
    );

    match source.open_reply(&req.message, &req.chat_history).await {
        Ok(fragments) => {
            // A mid-stream error aborts the chunked body; the client sees an
            // interrupted transfer.
            let fragments =
                fragments.inspect_err(|e| warn!(error = %e, "Reply stream broke mid-flight"));
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(fragments),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to open reply stream");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal Server Error"})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_history_is_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.chat_history.is_empty());

        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "a1", "chatHistory": [{"sender": "user", "content": "a0"}]}"#,
        )
        .unwrap();
        assert_eq!(req.chat_history, vec![HistoryEntry::user("a0")]);
    }
}
