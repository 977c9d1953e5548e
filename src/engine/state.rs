//! Which step of an exchange the session is in.

use serde::{Deserialize, Serialize};

/// Progress of the single in-flight exchange.
///
/// Happy path: Idle → AwaitingStream → RevealingNext | RevealingTerminal → Idle.
/// Failure path: Idle → AwaitingStream → Error → Idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingStream,
    RevealingNext,
    RevealingTerminal,
    Error,
}

impl TurnState {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Any state may fall back to `Idle`; that is how teardown ends a turn.
    pub fn can_transition_to(&self, target: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, target),
            (Idle, AwaitingStream)
                | (AwaitingStream, RevealingNext)
                | (AwaitingStream, RevealingTerminal)
                | (AwaitingStream, Error)
                | (
                    AwaitingStream | RevealingNext | RevealingTerminal | Error,
                    Idle
                )
        )
    }

    /// Whether user input is locked in this state.
    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingStream => "awaiting_stream",
            Self::RevealingNext => "revealing_next",
            Self::RevealingTerminal => "revealing_terminal",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use TurnState::*;
        let transitions = [
            (Idle, AwaitingStream),
            (AwaitingStream, RevealingNext),
            (AwaitingStream, RevealingTerminal),
            (AwaitingStream, Error),
            (RevealingNext, Idle),
            (RevealingTerminal, Idle),
            (Error, Idle),
            (AwaitingStream, Idle),
        ];
        for (from, to) in transitions {
            assert!(
                from.can_transition_to(to),
                "{from} should transition to {to}"
            );
        }
    }

    #[test]
    fn invalid_transitions() {
        use TurnState::*;
        // Reveal without a finished stream
        assert!(!Idle.can_transition_to(RevealingNext));
        assert!(!Idle.can_transition_to(Error));
        // Error never reveals
        assert!(!Error.can_transition_to(RevealingNext));
        // No second turn while one is in flight
        assert!(!RevealingNext.can_transition_to(AwaitingStream));
        // Self-transition
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn only_idle_is_unlocked() {
        use TurnState::*;
        assert!(!Idle.is_locked());
        for state in [AwaitingStream, RevealingNext, RevealingTerminal, Error] {
            assert!(state.is_locked(), "{state} should lock input");
        }
    }

    #[test]
    fn display_matches_serde() {
        use TurnState::*;
        for state in [
            Idle,
            AwaitingStream,
            RevealingNext,
            RevealingTerminal,
            Error,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{state}\""), json);
        }
    }
}
