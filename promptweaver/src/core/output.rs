//! Stage output record.

use serde::{Deserialize, Serialize};

/// The text produced by one completed stage.
///
/// Outputs are created once, when the stage completes, and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// The stage that produced this output.
    pub stage: String,
    /// The generated text.
    pub text: String,
    /// How many backend attempts were needed (1-indexed).
    pub attempts: u32,
    /// Wall-clock time spent in the stage, including retry delays.
    pub duration_ms: f64,
}

impl StageOutput {
    /// Creates a new stage output.
    #[must_use]
    pub fn new(stage: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            text: text.into(),
            attempts: 1,
            duration_ms: 0.0,
        }
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the text has visible content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
