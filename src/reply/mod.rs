//! Streaming text sources.
//!
//! Supports:
//! - **OpenAI upstream**: streaming completions through rig-core
//! - **Chunked text endpoint**: a `POST /api/chat` server streaming `text/plain`
//!
//! Both implement [`ReplySource`]; the intake session only ever sees a
//! [`FragmentStream`].

pub mod chunked;
pub mod openai;
pub mod source;
pub mod utf8;

pub use chunked::ChunkedTextSource;
pub use openai::{RigReplySource, create_openai_source};
pub use source::{FragmentStream, HistoryEntry, ReplySource};
pub use utf8::Utf8Decoder;

use std::sync::Arc;

use crate::config::IntakeConfig;
use crate::error::ConfigError;

/// Pick the reply source for a terminal session.
///
/// A configured reply URL wins; otherwise the upstream API is used directly.
pub fn create_source(
    config: &IntakeConfig,
    system_prompt: &str,
) -> Result<Arc<dyn ReplySource>, ConfigError> {
    if let Some(url) = &config.reply_url {
        tracing::info!(endpoint = %url, "Streaming replies from remote chat endpoint");
        return Ok(Arc::new(ChunkedTextSource::new(url.clone())));
    }

    let upstream = config.require_upstream()?;
    tracing::info!(model = %upstream.model, "Streaming replies from upstream API");
    create_openai_source(upstream, system_prompt)
}
