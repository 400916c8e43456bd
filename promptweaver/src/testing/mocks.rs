//! Scripted completion backends for tests.

use crate::backend::{CompletionBackend, CompletionRequest};
use crate::errors::{BackendError, ConfigError};
use crate::stages::StageName;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::fixtures::canned_response;

/// How a scripted stage misbehaves.
#[derive(Debug, Clone)]
enum Fault {
    /// Fail every call with the error.
    Always(BackendError),
    /// Fail the first `remaining` calls, then answer normally.
    Times { remaining: u32, error: BackendError },
    /// Panic inside the call.
    Panic(String),
}

/// A backend that answers from a script and records every request.
///
/// Stages without a scripted response get [`canned_response`]. Faults can be
/// attached per stage or to every stage.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<HashMap<StageName, String>>,
    faults: Mutex<HashMap<Option<StageName>, Fault>>,
    requests: Mutex<Vec<CompletionRequest>>,
    missing_credential: bool,
    latency: HashMap<StageName, Duration>,
}

impl ScriptedBackend {
    /// Creates a backend answering every stage with its canned response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for `stage`.
    #[must_use]
    pub fn with_response(self, stage: StageName, text: impl Into<String>) -> Self {
        self.responses.lock().insert(stage, text.into());
        self
    }

    /// Makes every call to every stage fail with `error`.
    #[must_use]
    pub fn failing(self, error: BackendError) -> Self {
        self.faults.lock().insert(None, Fault::Always(error));
        self
    }

    /// Makes every call to `stage` fail with `error`.
    #[must_use]
    pub fn failing_stage(self, stage: StageName, error: BackendError) -> Self {
        self.faults.lock().insert(Some(stage), Fault::Always(error));
        self
    }

    /// Makes the first `times` calls to `stage` fail with `error`.
    #[must_use]
    pub fn flaky_stage(self, stage: StageName, times: u32, error: BackendError) -> Self {
        self.faults.lock().insert(
            Some(stage),
            Fault::Times {
                remaining: times,
                error,
            },
        );
        self
    }

    /// Makes calls to `stage` panic with `message`.
    #[must_use]
    pub fn panicking_on(self, stage: StageName, message: impl Into<String>) -> Self {
        self.faults
            .lock()
            .insert(Some(stage), Fault::Panic(message.into()));
        self
    }

    /// Delays answers for `stage`.
    #[must_use]
    pub fn with_latency(mut self, stage: StageName, latency: Duration) -> Self {
        self.latency.insert(stage, latency);
        self
    }

    /// Reports a missing credential from `check_ready`.
    #[must_use]
    pub fn without_credential(mut self) -> Self {
        self.missing_credential = true;
        self
    }

    /// Every request received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Requests received for `stage`, one per attempt.
    #[must_use]
    pub fn requests_for(&self, stage: StageName) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.stage == stage)
            .cloned()
            .collect()
    }

    /// Total number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of calls for `stage`.
    #[must_use]
    pub fn calls_for(&self, stage: StageName) -> usize {
        self.requests.lock().iter().filter(|r| r.stage == stage).count()
    }

    /// Stages in the order they were first called.
    #[must_use]
    pub fn call_order(&self) -> Vec<StageName> {
        let mut order = Vec::new();
        for request in self.requests.lock().iter() {
            if !order.contains(&request.stage) {
                order.push(request.stage);
            }
        }
        order
    }

    fn fault_for(&self, stage: StageName) -> Option<Fault> {
        let mut faults = self.faults.lock();
        let key = if faults.contains_key(&Some(stage)) {
            Some(stage)
        } else {
            None
        };
        match faults.get_mut(&key)? {
            Fault::Times { remaining, error } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(Fault::Always(error.clone()))
            }
            fault => Some(fault.clone()),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn check_ready(&self) -> Result<(), ConfigError> {
        if self.missing_credential {
            return Err(ConfigError::missing_credential("OPENROUTER_API_KEY"));
        }
        Ok(())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.requests.lock().push(request.clone());

        if let Some(latency) = self.latency.get(&request.stage) {
            tokio::time::sleep(*latency).await;
        }

        match self.fault_for(request.stage) {
            Some(Fault::Always(error) | Fault::Times { error, .. }) => return Err(error),
            Some(Fault::Panic(message)) => panic!("{message}"),
            None => {}
        }

        let scripted = self.responses.lock().get(&request.stage).cloned();
        Ok(scripted.unwrap_or_else(|| canned_response(request.stage, &request.task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{self, RenderedTask};

    fn request(stage: &crate::stages::Stage) -> CompletionRequest {
        CompletionRequest::new(
            stage,
            RenderedTask {
                task: "task".into(),
                context: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_scripted_response_and_recording() {
        let backend = ScriptedBackend::new().with_response(StageName::Analyze, "scripted");
        let analyze = stages::analyze();

        assert_eq!(backend.complete(&request(&analyze)).await.unwrap(), "scripted");
        assert!(!backend
            .complete(&request(&stages::draft()))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.calls_for(StageName::Analyze), 1);
        assert_eq!(backend.call_order(), vec![StageName::Analyze, StageName::Draft]);
    }

    #[tokio::test]
    async fn test_flaky_stage_recovers() {
        let backend = ScriptedBackend::new().flaky_stage(
            StageName::Draft,
            2,
            BackendError::Transient("503".into()),
        );
        let draft = stages::draft();

        assert!(backend.complete(&request(&draft)).await.is_err());
        assert!(backend.complete(&request(&draft)).await.is_err());
        assert!(backend.complete(&request(&draft)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stage_fault_overrides_global() {
        let backend = ScriptedBackend::new()
            .failing(BackendError::EmptyResponse)
            .failing_stage(StageName::Draft, BackendError::Unauthorized("401".into()));

        let err = backend.complete(&request(&stages::draft())).await.unwrap_err();
        assert_eq!(err, BackendError::Unauthorized("401".into()));
        let err = backend.complete(&request(&stages::analyze())).await.unwrap_err();
        assert_eq!(err, BackendError::EmptyResponse);
    }

    #[test]
    fn test_missing_credential() {
        assert!(ScriptedBackend::new().check_ready().is_ok());
        let err = ScriptedBackend::new().without_credential().check_ready().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }
}
