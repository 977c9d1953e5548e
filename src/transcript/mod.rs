//! The ordered, append/replace-last record of what the user saw.

pub mod model;
pub mod store;

pub use model::{Sender, TranscriptEvent, Turn};
pub use store::TranscriptStore;
