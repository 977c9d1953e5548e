//! The streaming text source seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transcript::Sender;

/// Text fragments in arrival order, ending at end-of-stream or the first error.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One entry of the conversational context sent with each reply request.
///
/// Serialized as `{"sender": "user", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    #[serde(rename = "content")]
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }
}

/// Something that can stream a generated reply to a user answer.
///
/// One call per turn. The returned stream owns the underlying connection;
/// dropping it releases the connection.
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Open one reply stream for `user_text` with the prior answers as context.
    async fn open_reply(
        &self,
        user_text: &str,
        history: &[HistoryEntry],
    ) -> Result<FragmentStream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_wire_format() {
        let entry = HistoryEntry::user("a0");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"sender": "user", "content": "a0"}));

        let parsed: HistoryEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }
}
