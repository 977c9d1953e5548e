//! A fixed question list walked by a forward-only cursor.

use crate::error::{ConfigError, ExhaustedError};

/// The fixed, ordered intake questions and the cursor into them.
///
/// The cursor starts on the first question and only ever moves forward by one.
#[derive(Debug, Clone)]
pub struct Script {
    questions: Vec<String>,
    cursor: usize,
}

impl Script {
    /// Build a script. At least one question is required.
    pub fn new(questions: Vec<String>) -> Result<Self, ConfigError> {
        if questions.is_empty() {
            return Err(ConfigError::EmptyScript);
        }
        Ok(Self {
            questions,
            cursor: 0,
        })
    }

    /// The question under the cursor.
    pub fn current(&self) -> &str {
        &self.questions[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Whether another question follows the current one.
    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.questions.len()
    }

    /// Move to the next question and return it.
    pub fn advance(&mut self) -> Result<&str, ExhaustedError> {
        if !self.has_next() {
            return Err(ExhaustedError {
                len: self.questions.len(),
            });
        }
        self.cursor += 1;
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(questions: &[&str]) -> Script {
        Script::new(questions.iter().map(|q| q.to_string()).collect()).unwrap()
    }

    #[test]
    fn empty_script_rejected() {
        assert!(matches!(
            Script::new(Vec::new()),
            Err(ConfigError::EmptyScript)
        ));
    }

    #[test]
    fn advance_walks_every_question() {
        let mut s = script(&["q0", "q1", "q2"]);
        assert_eq!(s.current(), "q0");
        assert_eq!(s.cursor(), 0);

        assert_eq!(s.advance().unwrap(), "q1");
        assert_eq!(s.advance().unwrap(), "q2");
        assert_eq!(s.cursor(), 2);
        assert!(!s.has_next());
        assert_eq!(s.question_count(), 3);
    }

    #[test]
    fn advance_past_end_fails_and_keeps_cursor() {
        let mut s = script(&["q0", "q1"]);
        s.advance().unwrap();

        let err = s.advance().unwrap_err();
        assert_eq!(err.len, 2);
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.current(), "q1");
    }

    #[test]
    fn single_question_script_is_exhausted_immediately() {
        let mut s = script(&["only"]);
        assert!(!s.has_next());
        assert!(s.advance().is_err());
        assert_eq!(s.cursor(), 0);
    }
}
