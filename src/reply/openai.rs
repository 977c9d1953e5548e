//! Upstream replies via rig-core.
//!
//! [`RigReplySource`] bridges any rig `CompletionModel` to [`ReplySource`]:
//! streamed text chunks become fragments, rig errors become
//! [`TransportError`]s. Non-text stream items (tool calls, reasoning, the
//! final usage record) are skipped.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, future};
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Message};
use rig::streaming::StreamedAssistantContent;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::source::{FragmentStream, HistoryEntry, ReplySource};
use crate::config::UpstreamConfig;
use crate::error::{ConfigError, TransportError};
use crate::transcript::Sender;

/// Streams replies from a rig completion model with a fixed preamble.
pub struct RigReplySource<M> {
    model: M,
    provider: &'static str,
    model_name: String,
    system_prompt: String,
    temperature: f64,
}

impl<M: CompletionModel> RigReplySource<M> {
    pub fn new(
        model: M,
        provider: &'static str,
        model_name: &str,
        system_prompt: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            model,
            provider,
            model_name: model_name.to_string(),
            system_prompt: system_prompt.into(),
            temperature,
        }
    }
}

/// Prior answers as chat messages, oldest first.
fn history_messages(history: &[HistoryEntry]) -> Vec<Message> {
    history
        .iter()
        .map(|entry| match entry.sender {
            Sender::User => Message::user(entry.text.clone()),
            Sender::Ai => Message::assistant(entry.text.clone()),
        })
        .collect()
}

#[async_trait]
impl<M> ReplySource for RigReplySource<M>
where
    M: CompletionModel + 'static,
    M::StreamingResponse: 'static,
{
    fn name(&self) -> &str {
        self.provider
    }

    async fn open_reply(
        &self,
        user_text: &str,
        history: &[HistoryEntry],
    ) -> Result<FragmentStream, TransportError> {
        debug!(
            provider = self.provider,
            model = %self.model_name,
            history = history.len(),
            "Opening upstream reply stream"
        );

        let response = self
            .model
            .completion_request(Message::user(user_text))
            .preamble(self.system_prompt.clone())
            .messages(history_messages(history))
            .temperature(self.temperature)
            .stream()
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        info!(provider = self.provider, model = %self.model_name, "Upstream reply stream opened");

        let fragments = response.filter_map(|item| {
            future::ready(match item {
                Ok(StreamedAssistantContent::Text(text)) if !text.text.is_empty() => {
                    Some(Ok(text.text))
                }
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::Interrupted(e.to_string()))),
            })
        });
        Ok(Box::pin(fragments))
    }
}

/// Build the OpenAI reply source for one system prompt.
pub fn create_openai_source(
    config: &UpstreamConfig,
    system_prompt: &str,
) -> Result<Arc<dyn ReplySource>, ConfigError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "OPENAI_API_KEY".to_string(),
                message: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigReplySource::new(
        model,
        "openai",
        &config.model,
        system_prompt,
        config.temperature,
    )))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn upstream() -> UpstreamConfig {
        UpstreamConfig {
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }

    #[test]
    fn openai_source_constructs_without_network() {
        // The client accepts any key; auth only fails on the first request.
        let source = create_openai_source(&upstream(), "be kind").unwrap();
        assert_eq!(source.name(), "openai");
    }

    #[test]
    fn history_keeps_order_and_roles() {
        let history = vec![
            HistoryEntry::user("a0"),
            HistoryEntry {
                sender: Sender::Ai,
                text: "noted".to_string(),
            },
            HistoryEntry::user("a1"),
        ];
        let messages = history_messages(&history);

        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], Message::User { .. }));
        assert!(matches!(messages[1], Message::Assistant { .. }));
        assert!(matches!(messages[2], Message::User { .. }));
    }

    #[test]
    fn empty_history_yields_no_messages() {
        assert!(history_messages(&[]).is_empty());
    }
}
