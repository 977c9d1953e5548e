//! Terminal intake: stdin answers, transcript rendered to stdout as it grows.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::engine::{IntakeSession, TurnOutcome, TurnState};
use crate::error::Result;
use crate::transcript::{TranscriptEvent, Turn};

/// Renders transcript mutations to a line-oriented terminal.
///
/// Growing text is printed as a suffix. A replacement that is not an extension
/// of what is already on screen (the apology) is printed on a fresh line.
pub struct TerminalRenderer<W: Write> {
    out: W,
    on_screen: String,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            on_screen: String::new(),
        }
    }

    /// Print every turn of a snapshot.
    pub fn render_all(&mut self, turns: &[Turn]) -> std::io::Result<()> {
        for turn in turns {
            self.begin_turn(turn)?;
        }
        self.out.flush()
    }

    pub fn apply(&mut self, event: &TranscriptEvent) -> std::io::Result<()> {
        match event {
            TranscriptEvent::TurnAppended { turn, .. } => self.begin_turn(turn)?,
            TranscriptEvent::LastReplaced { text, .. } => {
                match text.strip_prefix(self.on_screen.as_str()) {
                    Some(suffix) => write!(self.out, "{suffix}")?,
                    None => write!(self.out, "\n{text}")?,
                }
                self.on_screen.clone_from(text);
            }
        }
        self.out.flush()
    }

    fn begin_turn(&mut self, turn: &Turn) -> std::io::Result<()> {
        write!(self.out, "\n\n● {}\n{}", turn.sender.label(), turn.text)?;
        self.on_screen.clone_from(&turn.text);
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render events until the transcript goes away.
async fn render_loop(initial: Vec<Turn>, mut events: mpsc::UnboundedReceiver<TranscriptEvent>) {
    let mut renderer = TerminalRenderer::new(std::io::stdout());
    if let Err(e) = renderer.render_all(&initial) {
        tracing::error!(error = %e, "Error writing transcript");
        return;
    }
    while let Some(event) = events.recv().await {
        if let Err(e) = renderer.apply(&event) {
            tracing::error!(error = %e, "Error writing transcript");
            break;
        }
    }
}

/// Run an intake session on the terminal until EOF, `/quit`, or Ctrl+C.
pub async fn run(session: Arc<IntakeSession>) -> Result<()> {
    let (initial, events) = session.transcript().subscribe_with_snapshot().await;
    let render_handle = tokio::spawn(render_loop(initial, events));

    // Prompt whenever input unlocks.
    let mut state_rx = session.subscribe_state();
    let prompt_handle = tokio::spawn(async move {
        eprint!("\n> ");
        while state_rx.changed().await.is_ok() {
            if *state_rx.borrow_and_update() == TurnState::Idle {
                eprint!("\n> ");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(session = %session.id(), "Ctrl+C received, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break }; // EOF

        let line = line.trim().to_string();
        if matches!(line.as_str(), "/quit" | "/exit") {
            break;
        }
        if session.is_locked() {
            eprintln!("(still responding, answer ignored)");
            continue;
        }

        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if let TurnOutcome::Failed(e) = session.submit_turn(&line).await {
                tracing::warn!(session = %session.id(), error = %e, "Reply failed");
            }
        });
    }

    session.shutdown();
    prompt_handle.abort();
    render_handle.abort();
    eprintln!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(events: &[TranscriptEvent]) -> String {
        let mut renderer = TerminalRenderer::new(Vec::new());
        for event in events {
            renderer.apply(event).unwrap();
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn appended(index: usize, turn: Turn) -> TranscriptEvent {
        TranscriptEvent::TurnAppended { index, turn }
    }

    fn replaced(index: usize, text: &str) -> TranscriptEvent {
        TranscriptEvent::LastReplaced {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn growing_text_prints_only_suffixes() {
        let out = render(&[
            appended(0, Turn::ai("")),
            replaced(0, "ok "),
            replaced(0, "ok got it"),
            replaced(0, "ok got it\n\nq1"),
        ]);
        assert_eq!(out, "\n\n● ai chatbot\nok got it\n\nq1");
    }

    #[test]
    fn apology_starts_fresh_line() {
        let out = render(&[
            appended(0, Turn::ai("")),
            replaced(0, "partial"),
            replaced(0, "Sorry, something went wrong."),
        ]);
        assert_eq!(
            out,
            "\n\n● ai chatbot\npartial\nSorry, something went wrong."
        );
    }

    #[test]
    fn turns_are_labelled_by_sender() {
        let out = render(&[appended(0, Turn::ai("q0")), appended(1, Turn::user("a0"))]);
        assert_eq!(out, "\n\n● ai chatbot\nq0\n\n● you\na0");
    }
}
