//! Intake WebSocket — one `IntakeSession` per connected client.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SessionSettings;
use crate::engine::{IntakeSession, TurnOutcome, TurnState};
use crate::reply::ReplySource;
use crate::transcript::{TranscriptEvent, Turn};

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// An answer to the question on screen.
    Answer { content: String },
}

/// Message from server → client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full transcript, sent once on connect.
    TranscriptSync {
        session_id: Uuid,
        turns: Vec<Turn>,
        locked: bool,
    },
    TurnAppended {
        index: usize,
        turn: Turn,
    },
    LastReplaced {
        index: usize,
        text: String,
    },
    /// Input lock changed; clients hide the answer box while locked.
    InputLock {
        locked: bool,
        state: TurnState,
    },
}

impl From<TranscriptEvent> for ServerMessage {
    fn from(event: TranscriptEvent) -> Self {
        match event {
            TranscriptEvent::TurnAppended { index, turn } => Self::TurnAppended { index, turn },
            TranscriptEvent::LastReplaced { index, text } => Self::LastReplaced { index, text },
        }
    }
}

// ── Shared State ────────────────────────────────────────────────────────

/// Axum handler state (cloneable).
#[derive(Clone)]
pub struct IntakeRouteState {
    pub source: Arc<dyn ReplySource>,
    pub settings: SessionSettings,
}

/// Build the intake WebSocket route.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/ws/intake", get(ws_intake_handler))
        .with_state(state)
}

// ── WebSocket Handler ───────────────────────────────────────────────────

async fn ws_intake_handler(
    ws: WebSocketUpgrade,
    State(state): State<IntakeRouteState>,
) -> impl IntoResponse {
    info!("Intake client connecting");
    ws.on_upgrade(|socket| handle_intake_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!(error = %e, "Failed to serialize intake message");
            true
        }
    }
}

async fn handle_intake_socket(mut socket: WebSocket, state: IntakeRouteState) {
    let session = match IntakeSession::new(state.settings.clone(), Arc::clone(&state.source)).await
    {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to start intake session");
            return;
        }
    };
    info!(session = %session.id(), "Intake client connected");

    let (turns, mut events) = session.transcript().subscribe_with_snapshot().await;
    let mut lock_rx = session.subscribe_state();

    let sync = ServerMessage::TranscriptSync {
        session_id: session.id(),
        turns,
        locked: session.is_locked(),
    };
    if !send_json(&mut socket, &sync).await {
        warn!("Failed to send initial transcript, client disconnected");
        session.shutdown();
        return;
    }

    loop {
        tokio::select! {
            // Transcript frames first, so the final frame of an exchange
            // reaches the client before the unlock does.
            biased;

            Some(event) = events.recv() => {
                if !send_json(&mut socket, &ServerMessage::from(event)).await {
                    debug!("Intake client disconnected during send");
                    break;
                }
            }

            changed = lock_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let turn_state = *lock_rx.borrow_and_update();
                let msg = ServerMessage::InputLock {
                    locked: turn_state.is_locked(),
                    state: turn_state,
                };
                if !send_json(&mut socket, &msg).await {
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Answer { content }) => {
                                spawn_turn(Arc::clone(&session), content);
                            }
                            Err(e) => {
                                debug!(error = %e, text = %text, "Invalid JSON from intake client");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(session = %session.id(), "Intake client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Intake WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.shutdown();
    info!(session = %session.id(), "Intake connection closed");
}

/// Run one exchange in the background so the socket keeps reading.
///
/// Answers sent while the session is locked are dropped by the session itself.
fn spawn_turn(session: Arc<IntakeSession>, content: String) {
    tokio::spawn(async move {
        match session.submit_turn(&content).await {
            TurnOutcome::Rejected(reason) => {
                debug!(session = %session.id(), ?reason, "Answer ignored");
            }
            TurnOutcome::Failed(e) => {
                warn!(session = %session.id(), error = %e, "Exchange failed; apology shown");
            }
            TurnOutcome::Completed { cursor, terminal } => {
                debug!(session = %session.id(), cursor, terminal, "Exchange finished");
            }
            TurnOutcome::Cancelled => {
                debug!(session = %session.id(), "Exchange cancelled by teardown");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_answer_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "answer", "content": "a0"}"#).unwrap();
        let ClientMessage::Answer { content } = msg;
        assert_eq!(content, "a0");
    }

    #[test]
    fn transcript_events_keep_their_wire_shape() {
        let event = TranscriptEvent::LastReplaced {
            index: 2,
            text: "ok".into(),
        };
        let direct = serde_json::to_value(&event).unwrap();
        let wrapped = serde_json::to_value(ServerMessage::from(event)).unwrap();
        assert_eq!(direct, wrapped);
    }

    #[test]
    fn input_lock_wire_format() {
        let json = serde_json::to_value(ServerMessage::InputLock {
            locked: true,
            state: TurnState::AwaitingStream,
        })
        .unwrap();
        assert_eq!(json["type"], "input_lock");
        assert_eq!(json["locked"], true);
        assert_eq!(json["state"], "awaiting_stream");
    }
}
