//! Client for a plain-text chunked reply endpoint (`POST /api/chat`).

use std::fmt::Display;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tracing::{debug, warn};

use super::source::{FragmentStream, HistoryEntry, ReplySource};
use super::utf8::Utf8Decoder;
use crate::error::TransportError;

/// Request body accepted by the chat endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    chat_history: &'a [HistoryEntry],
}

/// Streams replies from a server that answers with a chunked `text/plain` body.
pub struct ChunkedTextSource {
    client: reqwest::Client,
    endpoint: String,
}

impl ChunkedTextSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReplySource for ChunkedTextSource {
    fn name(&self) -> &str {
        "chunked"
    }

    async fn open_reply(
        &self,
        user_text: &str,
        history: &[HistoryEntry],
    ) -> Result<FragmentStream, TransportError> {
        let body = ChatRequest {
            message: user_text,
            chat_history: history,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "Reply endpoint returned error");
            return Err(TransportError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        debug!(endpoint = %self.endpoint, "Chunked reply stream opened");
        Ok(text_fragments(response.bytes_stream()))
    }
}

struct TextState<S> {
    body: Pin<Box<S>>,
    decoder: Option<Utf8Decoder>,
}

/// Decode a chunked byte body into text fragments, one per non-empty chunk.
pub fn text_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = TextState {
        body: Box::pin(body),
        decoder: Some(Utf8Decoder::new()),
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            let decoder = st.decoder.as_mut()?;
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    let text = decoder.push(chunk.as_ref());
                    if !text.is_empty() {
                        return Some((Ok(text), st));
                    }
                }
                Some(Err(e)) => {
                    st.decoder = None;
                    return Some((Err(TransportError::Interrupted(e.to_string())), st));
                }
                None => {
                    let tail = st.decoder.take()?.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    return Some((Ok(tail), st));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: Vec<Result<Vec<u8>, String>>) -> Vec<Result<String, String>> {
        text_fragments(stream::iter(chunks))
            .map(|r| r.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[test]
    fn request_uses_camel_case_history() {
        let history = vec![HistoryEntry::user("a0")];
        let body = ChatRequest {
            message: "a1",
            chat_history: &history,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "a1");
        assert_eq!(json["chatHistory"][0]["content"], "a0");
        assert_eq!(json["chatHistory"][0]["sender"], "user");
    }

    #[tokio::test]
    async fn chunks_become_fragments() {
        let out = collect(vec![Ok(b"ok ".to_vec()), Ok(b"got it".to_vec())]).await;
        assert_eq!(out, vec![Ok("ok ".to_string()), Ok("got it".to_string())]);
    }

    #[tokio::test]
    async fn split_character_joins_next_fragment() {
        let bytes = "café!".as_bytes().to_vec();
        let out = collect(vec![Ok(bytes[..4].to_vec()), Ok(bytes[4..].to_vec())]).await;
        assert_eq!(out, vec![Ok("caf".to_string()), Ok("é!".to_string())]);
    }

    #[tokio::test]
    async fn error_stops_stream() {
        let out = collect(vec![
            Ok(b"partial".to_vec()),
            Err("reset".to_string()),
            Ok(b"never".to_vec()),
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Ok("partial".to_string()));
        assert!(out[1].as_ref().unwrap_err().contains("reset"));
    }

    #[tokio::test]
    async fn open_reply_fails_on_unreachable_endpoint() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let source = ChunkedTextSource::new("http://127.0.0.1:9/api/chat");
        let err = match source.open_reply("hi", &[]).await {
            Ok(_) => panic!("expected connect failure"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
