//! Runs one exchange at a time: stream the reply, then reveal
//! the next question (or the closing message) into the transcript.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::TurnState;
use crate::config::{CLOSING_SEPARATOR, NEXT_QUESTION_SEPARATOR, SessionSettings};
use crate::error::{ConfigError, TransportError};
use crate::reply::{HistoryEntry, ReplySource};
use crate::reveal::Reveal;
use crate::script::Script;
use crate::transcript::{TranscriptStore, Turn};

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another exchange is in flight.
    Locked,
    /// Nothing left after trimming.
    Empty,
    /// The session was torn down.
    Closed,
}

/// What happened to one submission.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Ignored; the transcript is untouched.
    Rejected(RejectReason),
    /// Reply streamed and the follow-up fully revealed.
    Completed {
        /// Script cursor after the exchange.
        cursor: usize,
        /// Whether the closing message was revealed instead of a question.
        terminal: bool,
    },
    /// The reply stream failed; the AI turn now shows the apology.
    Failed(TransportError),
    /// The session was torn down mid-exchange.
    Cancelled,
}

/// Clears the input lock and returns the session to `Idle` however the
/// exchange ends, including when its future is dropped.
struct InputLockGuard<'a> {
    session: &'a IntakeSession,
}

impl Drop for InputLockGuard<'_> {
    fn drop(&mut self) {
        self.session.input_lock.store(false, Ordering::Release);
        self.session.set_state(TurnState::Idle);
    }
}

/// One user's intake conversation.
///
/// Owns the transcript, the question cursor, and the answers sent as context.
/// Share it behind an `Arc`; `submit_turn` enforces one exchange at a time.
pub struct IntakeSession {
    id: Uuid,
    settings: SessionSettings,
    source: Arc<dyn ReplySource>,
    transcript: Arc<TranscriptStore>,
    script: Mutex<Script>,
    history: RwLock<Vec<HistoryEntry>>,
    input_lock: AtomicBool,
    state: watch::Sender<TurnState>,
    shutdown: CancellationToken,
}

impl IntakeSession {
    /// Start a session and show the first question.
    pub async fn new(
        settings: SessionSettings,
        source: Arc<dyn ReplySource>,
    ) -> Result<Arc<Self>, ConfigError> {
        let script = Script::new(settings.questions.clone())?;
        let transcript = TranscriptStore::new();
        transcript.append(Turn::ai(script.current())).await;

        let (state, _) = watch::channel(TurnState::Idle);
        let id = Uuid::new_v4();
        info!(session = %id, questions = script.question_count(), source = source.name(), "Intake session started");

        Ok(Arc::new(Self {
            id,
            settings,
            source,
            transcript,
            script: Mutex::new(script),
            history: RwLock::new(Vec::new()),
            input_lock: AtomicBool::new(false),
            state,
            shutdown: CancellationToken::new(),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Watch state changes (renderers use this to show or hide the input).
    pub fn subscribe_state(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    pub fn is_locked(&self) -> bool {
        self.input_lock.load(Ordering::Acquire)
    }

    pub async fn cursor(&self) -> usize {
        self.script.lock().await.cursor()
    }

    /// The answers accepted so far, oldest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().await.clone()
    }

    /// Tear the session down: drops any open reply stream and stops a running
    /// reveal at its next step. Later submissions are rejected.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!(session = %self.id, "Intake session shutting down");
            self.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Submit one answer and run the whole exchange.
    ///
    /// Returns once the reply has streamed and the follow-up is fully revealed,
    /// or immediately if the submission is rejected.
    pub async fn submit_turn(&self, input: &str) -> TurnOutcome {
        if self.is_locked() {
            debug!(session = %self.id, "Input locked; submission ignored");
            return TurnOutcome::Rejected(RejectReason::Locked);
        }
        let text = input.trim();
        if text.is_empty() {
            return TurnOutcome::Rejected(RejectReason::Empty);
        }
        if self.is_closed() {
            return TurnOutcome::Rejected(RejectReason::Closed);
        }
        if self
            .input_lock
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(session = %self.id, "Lost race for input lock; submission ignored");
            return TurnOutcome::Rejected(RejectReason::Locked);
        }
        let _guard = InputLockGuard { session: self };

        self.run_exchange(text).await
    }

    async fn run_exchange(&self, text: &str) -> TurnOutcome {
        // Context is the answers *before* this one; the new answer goes
        // separately as the message being replied to.
        let prior = {
            let mut history = self.history.write().await;
            let prior = history.clone();
            history.push(HistoryEntry::user(text));
            prior
        };
        self.transcript.append(Turn::user(text)).await;
        self.transcript.append(Turn::ai("")).await;
        self.set_state(TurnState::AwaitingStream);

        let reply = match self.stream_reply(text, &prior).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return TurnOutcome::Cancelled,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Reply stream failed");
                self.set_state(TurnState::Error);
                self.show(self.settings.apology_message.clone()).await;
                return TurnOutcome::Failed(e);
            }
        };

        let (next_question, cursor) = {
            let mut script = self.script.lock().await;
            let next = if script.has_next() {
                let question = script.advance().map(str::to_string);
                debug_assert!(question.is_ok(), "script advanced past its guard");
                question.ok()
            } else {
                None
            };
            (next, script.cursor())
        };

        let terminal = next_question.is_none();
        let (reveal, separator) = match next_question {
            Some(question) => {
                self.set_state(TurnState::RevealingNext);
                (
                    Reveal::new(question, self.settings.next_question_delay),
                    NEXT_QUESTION_SEPARATOR,
                )
            }
            None => {
                self.set_state(TurnState::RevealingTerminal);
                (
                    Reveal::new(
                        self.settings.closing_message.clone(),
                        self.settings.closing_delay,
                    ),
                    CLOSING_SEPARATOR,
                )
            }
        };

        if !self.reveal_after(&reply, separator, reveal).await {
            return TurnOutcome::Cancelled;
        }

        info!(session = %self.id, cursor, terminal, "Exchange complete");
        TurnOutcome::Completed { cursor, terminal }
    }

    /// Pull fragments until end-of-stream, growing the last turn after each.
    ///
    /// `Ok(None)` means the session was torn down; the stream (and its
    /// connection) is dropped on return.
    async fn stream_reply(
        &self,
        text: &str,
        prior: &[HistoryEntry],
    ) -> Result<Option<String>, TransportError> {
        let mut fragments = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Ok(None),
            opened = self.source.open_reply(text, prior) => opened?,
        };

        let mut reply = String::new();
        let mut count = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(session = %self.id, fragments = count, "Teardown mid-stream; releasing reply stream");
                    return Ok(None);
                }
                next = fragments.next() => next,
            };
            match next {
                Some(Ok(fragment)) => {
                    reply.push_str(&fragment);
                    count += 1;
                    self.show(reply.clone()).await;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        debug!(session = %self.id, fragments = count, chars = reply.chars().count(), "Reply stream finished");
        Ok(Some(reply))
    }

    /// Reveal `reveal` after the streamed reply. Returns false if torn down.
    async fn reveal_after(&self, reply: &str, separator: &str, reveal: Reveal) -> bool {
        if reveal.steps() == 0 {
            self.show(format!("{reply}{separator}")).await;
            return true;
        }

        let mut steps = Box::pin(reveal.into_stream());
        loop {
            let step = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(session = %self.id, "Teardown mid-reveal");
                    return false;
                }
                step = steps.next() => step,
            };
            match step {
                Some(prefix) => self.show(format!("{reply}{separator}{prefix}")).await,
                None => return true,
            }
        }
    }

    /// Replace the text of the in-flight AI turn.
    async fn show(&self, text: String) {
        if let Err(e) = self.transcript.replace_last(text).await {
            // The exchange appends its AI turn first, so this is a logic fault.
            error!(session = %self.id, error = %e, "Transcript mutation failed");
            debug_assert!(false, "transcript mutation failed: {e}");
        }
    }

    fn set_state(&self, next: TurnState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            if !previous.can_transition_to(next) {
                warn!(session = %self.id, from = %previous, to = %next, "Unexpected turn state transition");
            }
            debug!(session = %self.id, from = %previous, to = %next, "Turn state changed");
        }
    }
}
