//! Turns and the mutations a renderer observes.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Ai,
    User,
}

impl Sender {
    /// Label shown next to the turn by renderers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ai => "ai chatbot",
            Self::User => "you",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ai => "ai",
            Self::User => "user",
        };
        write!(f, "{s}")
    }
}

/// One message unit in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

impl Turn {
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }
}

/// A single transcript mutation, delivered to every subscriber in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// A new turn was added at `index` (always the new last position).
    TurnAppended { index: usize, turn: Turn },
    /// The text of the last turn (at `index`) was replaced.
    LastReplaced { index: usize, text: String },
}

impl TranscriptEvent {
    /// Apply this mutation to a local copy of the transcript.
    ///
    /// Returns false if the copy has drifted from the store (wrong length).
    pub fn apply(&self, turns: &mut Vec<Turn>) -> bool {
        match self {
            Self::TurnAppended { index, turn } => {
                if *index != turns.len() {
                    return false;
                }
                turns.push(turn.clone());
                true
            }
            Self::LastReplaced { index, text } => {
                let len = turns.len();
                match turns.last_mut() {
                    Some(last) if *index + 1 == len => {
                        last.text.clone_from(text);
                        true
                    }
                    _ => false,
                }
            }
        }
    }
}
