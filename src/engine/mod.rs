//! Turn engine — the single-flow exchange loop behind an intake conversation.
//!
//! One submission at a time: the user's answer is appended, the generated
//! acknowledgement streams into a fresh AI turn, and the next scripted
//! question (or the closing message) is typed out after it. Input stays
//! locked until all of that has finished.

pub mod session;
pub mod state;

pub use session::{IntakeSession, RejectReason, TurnOutcome};
pub use state::TurnState;
