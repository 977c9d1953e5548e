//! Transcript store — append/replace-last turn log with per-subscriber fan-out.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, trace};

use super::model::{TranscriptEvent, Turn};
use crate::error::TranscriptError;

struct Inner {
    turns: Vec<Turn>,
    subscribers: Vec<mpsc::UnboundedSender<TranscriptEvent>>,
}

impl Inner {
    fn publish(&mut self, event: TranscriptEvent) {
        // Drop renderers that went away.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Ordered turn log. Only the last turn can ever be rewritten.
///
/// Every subscriber gets its own unbounded queue, so a slow renderer sees
/// every intermediate frame instead of lagging past them.
pub struct TranscriptStore {
    inner: RwLock<Inner>,
}

impl TranscriptStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                turns: Vec::new(),
                subscribers: Vec::new(),
            }),
        })
    }

    /// Add a turn at the end and notify subscribers.
    pub async fn append(&self, turn: Turn) {
        let mut inner = self.inner.write().await;
        let index = inner.turns.len();
        debug!(index, sender = %turn.sender, "Turn appended");
        inner.turns.push(turn.clone());
        inner.publish(TranscriptEvent::TurnAppended { index, turn });
    }

    /// Overwrite the text of the last turn, keeping its sender and position.
    pub async fn replace_last(&self, text: impl Into<String>) -> Result<(), TranscriptError> {
        let text = text.into();
        let mut inner = self.inner.write().await;
        let index = inner
            .turns
            .len()
            .checked_sub(1)
            .ok_or(TranscriptError::Empty)?;
        inner.turns[index].text.clone_from(&text);
        trace!(index, len = text.len(), "Last turn replaced");
        inner.publish(TranscriptEvent::LastReplaced { index, text });
        Ok(())
    }

    /// Subscribe to future mutations.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<TranscriptEvent> {
        self.subscribe_with_snapshot().await.1
    }

    /// Current turns plus a receiver for every mutation after them.
    ///
    /// Taken under one lock, so no mutation falls between the two.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> (Vec<Turn>, mpsc::UnboundedReceiver<TranscriptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        inner.subscribers.push(tx);
        (inner.turns.clone(), rx)
    }

    pub async fn snapshot(&self) -> Vec<Turn> {
        self.inner.read().await.turns.clone()
    }

    pub async fn last(&self) -> Option<Turn> {
        self.inner.read().await.turns.last().cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.turns.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.turns.is_empty()
    }

    /// Number of live subscribers (closed ones are pruned on the next mutation).
    pub async fn subscriber_count(&self) -> usize {
        self.inner.read().await.subscribers.len()
    }
}
