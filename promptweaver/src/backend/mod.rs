//! Completion backends.
//!
//! The orchestrator talks to a model only through [`CompletionBackend`]. A
//! backend receives the stage persona and the rendered task, and returns the
//! generated text or a classified [`BackendError`].

#[cfg(feature = "openrouter")]
mod openrouter;

#[cfg(feature = "openrouter")]
pub use openrouter::{OpenRouterBackend, OpenRouterSettings};

use crate::errors::{BackendError, ConfigError};
use crate::stages::{RenderedTask, Stage, StageName};
use async_trait::async_trait;
use serde::Serialize;

/// One backend call for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    /// The stage being executed.
    pub stage: StageName,
    /// The persona description, sent as the system message.
    pub role: String,
    /// The rendered task text.
    pub task: String,
    /// Upstream outputs and reference material; may be empty.
    pub context: String,
}

impl CompletionRequest {
    /// Builds a request from a stage and its rendered task.
    #[must_use]
    pub fn new(stage: &Stage, rendered: RenderedTask) -> Self {
        Self {
            stage: stage.name,
            role: stage.role.describe(),
            task: rendered.task,
            context: rendered.context,
        }
    }

    /// Task and context joined as the user message.
    #[must_use]
    pub fn prompt(&self) -> String {
        if self.context.is_empty() {
            self.task.clone()
        } else {
            format!("{}\n\n{}", self.task, self.context)
        }
    }
}

/// A text-completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Checks that the backend can be used at all.
    ///
    /// Called once before a run starts; a failure here is the only error a
    /// run reports to its caller.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a required credential is missing.
    fn check_ready(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Generates text for one stage.
    ///
    /// # Errors
    ///
    /// Returns a classified `BackendError` on failure.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::analyze;

    #[test]
    fn test_request_prompt() {
        let stage = analyze();
        let request = CompletionRequest::new(
            &stage,
            RenderedTask {
                task: "Analyze it".into(),
                context: String::new(),
            },
        );
        assert_eq!(request.stage, StageName::Analyze);
        assert!(request.role.starts_with("You are Prompt Requirements Analyst."));
        assert_eq!(request.prompt(), "Analyze it");

        let with_context = CompletionRequest {
            context: "## Context from prior stages".into(),
            ..request
        };
        assert_eq!(
            with_context.prompt(),
            "Analyze it\n\n## Context from prior stages"
        );
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_check_ready().returning(|| Ok(()));
        mock.expect_complete()
            .returning(|req| Ok(format!("echo {}", req.stage)));

        assert!(mock.check_ready().is_ok());
        let request = CompletionRequest::new(
            &analyze(),
            RenderedTask {
                task: "t".into(),
                context: String::new(),
            },
        );
        assert_eq!(mock.complete(&request).await.unwrap(), "echo analyze");
    }
}
