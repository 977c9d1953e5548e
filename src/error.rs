//! Error types for Intake Assist.

/// Top-level error type for the intake engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Script error: {0}")]
    Exhausted(#[from] ExhaustedError),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Question script must contain at least one question")]
    EmptyScript,
}

/// Failures of the streaming text source.
///
/// Any fragments delivered before the failure stay delivered; the session
/// decides what to show instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to reach {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Failed to decode stream frame: {0}")]
    Decode(String),
}

/// The question cursor was advanced past the last question.
///
/// The session checks `has_next()` before advancing, so seeing this means the
/// guard is broken.
#[derive(Debug, thiserror::Error)]
#[error("Question script exhausted ({len} questions)")]
pub struct ExhaustedError {
    pub len: usize,
}

/// Transcript mutation errors.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Cannot replace the last turn of an empty transcript")]
    Empty,
}

/// Result type alias for the intake engine.
pub type Result<T> = std::result::Result<T, Error>;
