//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Questions asked, in order, when no override is configured.
pub const DEFAULT_QUESTIONS: [&str; 4] = [
    "what is your current job title?",
    "how many years of experience do you have?",
    "what key skills are you looking to develop?",
    "what are your career goals?",
];

/// Per-character delay when revealing the next scripted question.
pub const NEXT_QUESTION_DELAY: Duration = Duration::from_millis(10);

/// Per-character delay when revealing the closing message.
pub const CLOSING_DELAY: Duration = Duration::from_millis(25);

/// Revealed once the last question has been answered.
pub const CLOSING_MESSAGE: &str = "\nThank you for answering all the questions!";

/// Replaces the AI turn when the reply stream fails.
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong.";

/// Between the streamed reply and the next question.
pub const NEXT_QUESTION_SEPARATOR: &str = "\n\n";

/// Between the streamed reply and the closing message.
pub const CLOSING_SEPARATOR: &str = "\n";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 8080;

/// System prompt for the acknowledgement streamed after every answer.
pub const ACKNOWLEDGE_SYSTEM_PROMPT: &str = "You are a helpful assistant for Rezilium, a strategic leadership development firm. Provide an encouraging response acknowledging the user's message under 50 words. Personalize your response to user with techniques like mirroring. Do not ask for additional information/questions. Respond in all lowercase.";

/// System prompt for the free-form recommendation endpoint.
pub const RECOMMEND_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for Rezilium, an executive education platform.";

/// Constants that shape one intake session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub questions: Vec<String>,
    pub next_question_delay: Duration,
    pub closing_delay: Duration,
    pub closing_message: String,
    pub apology_message: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            next_question_delay: NEXT_QUESTION_DELAY,
            closing_delay: CLOSING_DELAY,
            closing_message: CLOSING_MESSAGE.to_string(),
            apology_message: APOLOGY_MESSAGE.to_string(),
        }
    }
}

impl SessionSettings {
    pub fn with_questions(mut self, questions: Vec<String>) -> Self {
        self.questions = questions;
        self
    }

    /// Zero both reveal delays. Used by tests and headless clients.
    pub fn without_delays(mut self) -> Self {
        self.next_question_delay = Duration::ZERO;
        self.closing_delay = Duration::ZERO;
        self
    }
}

/// Upstream text-generation settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f64,
}

/// Process-wide configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// `None` when `OPENAI_API_KEY` is unset; only a remote reply URL works then.
    pub upstream: Option<UpstreamConfig>,
    pub port: u16,
    /// Stream replies from a remote `/api/chat` instead of the upstream API.
    pub reply_url: Option<String>,
    pub session: SessionSettings,
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let upstream = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(|key| UpstreamConfig {
                api_key: SecretString::from(key),
                model: lookup("INTAKE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature: 0.0,
            });

        let port = match lookup("INTAKE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => DEFAULT_PORT,
        };

        let reply_url = lookup("INTAKE_REPLY_URL").filter(|u| !u.trim().is_empty());

        let mut session = SessionSettings::default();
        if let Some(raw) = lookup("INTAKE_QUESTIONS") {
            let questions: Vec<String> = raw
                .split('|')
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            if questions.is_empty() {
                return Err(ConfigError::EmptyScript);
            }
            session.questions = questions;
        }

        Ok(Self {
            upstream,
            port,
            reply_url,
            session,
        })
    }

    /// The upstream settings, or the error explaining why they are missing.
    pub fn require_upstream(&self) -> Result<&UpstreamConfig, ConfigError> {
        self.upstream
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = IntakeConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.upstream.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.reply_url.is_none());
        assert_eq!(config.session.questions.len(), 4);
        assert_eq!(
            config.session.next_question_delay,
            Duration::from_millis(10)
        );
        assert_eq!(config.session.closing_delay, Duration::from_millis(25));
        assert!(config.require_upstream().is_err());
    }

    #[test]
    fn upstream_from_env() {
        let config = IntakeConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("INTAKE_MODEL", "gpt-4o"),
        ]))
        .unwrap();
        let upstream = config.require_upstream().unwrap();
        assert_eq!(upstream.model, "gpt-4o");
        assert_eq!(upstream.temperature, 0.0);
    }

    #[test]
    fn invalid_port_rejected() {
        let err = IntakeConfig::from_lookup(lookup(&[("INTAKE_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn question_override_splits_on_pipe() {
        let config =
            IntakeConfig::from_lookup(lookup(&[("INTAKE_QUESTIONS", " q0 | q1 ||")])).unwrap();
        assert_eq!(config.session.questions, vec!["q0", "q1"]);
    }

    #[test]
    fn blank_question_override_rejected() {
        let err = IntakeConfig::from_lookup(lookup(&[("INTAKE_QUESTIONS", " | ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyScript));
    }
}
