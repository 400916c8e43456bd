//! Error types for the promptweaver pipeline.
//!
//! The taxonomy separates the one failure a caller must see (a missing
//! backend credential) from everything the orchestrator recovers from on its
//! own: transient backend failures, unusable responses, template problems and
//! unexpected internal errors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for promptweaver operations.
#[derive(Debug, Error)]
pub enum WeaverError {
    /// Configuration is missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The completion backend failed.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// A stage task template could not be rendered.
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// A stage plan failed validation.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A stage output was written twice.
    #[error("{0}")]
    OutputConflict(#[from] OutputConflictError),

    /// The reference corpus could not be loaded.
    #[error("{0}")]
    Corpus(#[from] CorpusError),

    /// The final document could not be persisted.
    #[error("{0}")]
    Output(#[from] OutputError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeaverError {
    /// Returns true if this error is the fatal missing-credential case.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(ConfigError::MissingCredential { .. }))
    }

    /// Returns true if the backend produced an empty or unusable response.
    #[must_use]
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_empty_response())
    }

    /// Short machine-readable kind used in events and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Backend(e) => e.kind(),
            Self::Template(_) => "template",
            Self::Validation(_) => "validation",
            Self::OutputConflict(_) => "output_conflict",
            Self::Corpus(_) => "corpus",
            Self::Output(_) => "output",
            Self::Internal(_) => "internal",
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The backend credential is not configured.
    #[error("{variable} environment variable not set. Set it in your environment or .env file.")]
    MissingCredential {
        /// The variable that should hold the credential.
        variable: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration from {path}: {reason}")]
    Load {
        /// The configuration file path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// The configuration file could not be written.
    #[error("Failed to write configuration to {path}: {reason}")]
    Write {
        /// The configuration file path.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a missing credential error.
    #[must_use]
    pub fn missing_credential(variable: impl Into<String>) -> Self {
        Self::MissingCredential {
            variable: variable.into(),
        }
    }
}

/// Errors raised by a completion backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Network, timeout, rate-limit or server-side failure.
    #[error("Transient backend error: {0}")]
    Transient(String),

    /// The call succeeded but produced no content.
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// The call succeeded but the payload was unusable.
    #[error("Backend returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The backend rejected the credential.
    #[error("Backend rejected the credential: {0}")]
    Unauthorized(String),
}

impl BackendError {
    /// Returns true if a retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unauthorized(_))
    }

    /// Returns true for the empty/invalid response class.
    #[must_use]
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::EmptyResponse | Self::InvalidResponse(_))
    }

    /// Short machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::EmptyResponse => "empty_response",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Unauthorized(_) => "unauthorized",
        }
    }
}

/// Error raised when a task template cannot be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A referenced upstream stage has no output yet.
    #[error("Stage '{stage}' references '{dependency}' which has no output yet")]
    MissingOutput {
        /// The stage being rendered.
        stage: String,
        /// The dependency without output.
        dependency: String,
    },

    /// The template references a stage that is not a declared dependency.
    #[error("Stage '{stage}' references undeclared dependency '{placeholder}'")]
    UndeclaredPlaceholder {
        /// The stage being rendered.
        stage: String,
        /// The offending placeholder.
        placeholder: String,
    },
}

/// Error raised when a stage plan fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            fix_hint: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Error raised when writing to an existing output in a run.
#[derive(Debug, Clone, Error)]
#[error("Output conflict for stage '{stage}': {message}")]
pub struct OutputConflictError {
    /// The stage name.
    pub stage: String,
    /// Additional message.
    pub message: String,
}

impl OutputConflictError {
    /// Creates a new output conflict error.
    #[must_use]
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Error raised while loading the reference corpus.
#[derive(Debug, Error)]
#[error("Failed to read reference document {path}: {source}")]
pub struct CorpusError {
    /// The document path.
    pub path: String,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

/// Error raised while persisting a document.
#[derive(Debug, Error)]
#[error("Failed to write {path}: {source}")]
pub struct OutputError {
    /// The target path.
    pub path: String,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

/// Serializable summary of a failure, attached to degraded outcomes and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Machine-readable kind (see [`WeaverError::kind`]).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// The stage that failed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl FailureInfo {
    /// Builds a summary from an error.
    #[must_use]
    pub fn from_error(err: &WeaverError, stage: Option<&str>) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            stage: stage.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        assert!(BackendError::Transient("timeout".into()).is_retryable());
        assert!(BackendError::EmptyResponse.is_retryable());
        assert!(!BackendError::Unauthorized("401".into()).is_retryable());

        assert!(BackendError::EmptyResponse.is_empty_response());
        assert!(BackendError::InvalidResponse("no choices".into()).is_empty_response());
        assert!(!BackendError::Transient("503".into()).is_empty_response());
    }

    #[test]
    fn test_weaver_error_configuration() {
        let err: WeaverError = ConfigError::missing_credential("OPENROUTER_API_KEY").into();
        assert!(err.is_configuration());
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));

        let err: WeaverError = BackendError::Transient("reset".into()).into();
        assert!(!err.is_configuration());
        assert_eq!(err.kind(), "transient");
    }

    #[test]
    fn test_weaver_error_empty_response() {
        let err: WeaverError = BackendError::EmptyResponse.into();
        assert!(err.is_empty_response());

        let err: WeaverError = WeaverError::Internal("boom".into());
        assert!(!err.is_empty_response());
    }

    #[test]
    fn test_pipeline_validation_error_to_dict() {
        let err = PipelineValidationError::new("Test error")
            .with_stages(vec!["draft".to_string(), "research".to_string()])
            .with_fix_hint("Declare research first");

        let dict = err.to_dict();
        assert_eq!(dict.get("message").unwrap(), "Test error");
        assert_eq!(dict.get("fix_hint").unwrap(), "Declare research first");
    }

    #[test]
    fn test_failure_info_from_error() {
        let err: WeaverError = BackendError::EmptyResponse.into();
        let info = FailureInfo::from_error(&err, Some("draft"));
        assert_eq!(info.kind, "empty_response");
        assert_eq!(info.stage.as_deref(), Some("draft"));
    }
}
