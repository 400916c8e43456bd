//! The pipeline orchestrator.
//!
//! Runs the stage plan for a mode against a completion backend and always
//! hands back a document: the cleaned final output on success, or the
//! deterministic fallback when anything goes wrong. The only failure a
//! caller can observe is a missing backend credential.

use super::builder::StagePlan;
use super::document::finalize_document;
use super::fallback::fallback_document;
use super::retry::{with_retry_notify, RetryConfig};
use crate::backend::{CompletionBackend, CompletionRequest};
use crate::config::WeaverConfig;
use crate::context::Run;
use crate::core::{Mode, StageOutput, StageStatus};
use crate::corpus::{excerpt, ReferenceCorpus, StaticCorpus};
use crate::errors::{BackendError, ConfigError, FailureInfo, WeaverError};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::observability::run_span;
use crate::stages::{render, Stage, StageName};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// Per-orchestrator behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// End the document with the execution directive line.
    pub append_directive: bool,
    /// Dispatch independent adjacent stages together.
    pub concurrent_review: bool,
    /// Upper bound on reference material per grounded stage.
    pub max_reference_chars: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            append_directive: true,
            concurrent_review: false,
            max_reference_chars: 12_000,
        }
    }
}

/// What happened during a run, for inspection and reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// The run ID.
    pub run_id: Uuid,
    /// The mode the run used.
    pub mode: Mode,
    /// Stages in the plan, in execution order.
    pub planned: Vec<StageName>,
    /// Outputs of completed stages, in completion order.
    pub stages: Vec<StageOutput>,
    /// Total wall-clock time.
    pub duration_ms: f64,
}

impl RunReport {
    fn from_run(run: Run, duration_ms: f64) -> Self {
        let run_id = run.identity().run_id;
        let mode = run.mode();
        let planned = run.stages().iter().map(|s| s.name).collect();
        Self {
            run_id,
            mode,
            planned,
            stages: run.into_outputs(),
            duration_ms,
        }
    }

    /// Number of stages that produced output.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.stages.len()
    }

    /// Status of every planned stage.
    ///
    /// In a degraded run the first stage without output is reported as
    /// failed and the ones after it as pending.
    #[must_use]
    pub fn statuses(&self) -> Vec<(StageName, StageStatus)> {
        let done = self.stages.len();
        self.planned
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let status = if idx < done {
                    StageStatus::Completed
                } else if idx == done {
                    StageStatus::Failed
                } else {
                    StageStatus::Pending
                };
                (*name, status)
            })
            .collect()
    }
}

/// The result of [`Orchestrator::run`].
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The pipeline produced a document.
    Completed {
        /// The finished document.
        document: String,
        /// Run details.
        report: RunReport,
    },
    /// Generation failed; `document` is the fallback.
    Degraded {
        /// The fallback document.
        document: String,
        /// Why the run degraded.
        failure: FailureInfo,
        /// Run details up to the failure.
        report: RunReport,
    },
    /// The backend is not configured; nothing was generated.
    ConfigurationError(ConfigError),
}

impl PipelineOutcome {
    /// The document, unless the run could not start.
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        match self {
            Self::Completed { document, .. } | Self::Degraded { document, .. } => Some(document),
            Self::ConfigurationError(_) => None,
        }
    }

    /// Consumes the outcome, returning the document.
    ///
    /// # Errors
    ///
    /// Returns the configuration error if the run could not start.
    pub fn into_document(self) -> Result<String, ConfigError> {
        match self {
            Self::Completed { document, .. } | Self::Degraded { document, .. } => Ok(document),
            Self::ConfigurationError(err) => Err(err),
        }
    }

    /// The run report, unless the run could not start.
    #[must_use]
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed { report, .. } | Self::Degraded { report, .. } => Some(report),
            Self::ConfigurationError(_) => None,
        }
    }

    /// The failure summary of a degraded run.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureInfo> {
        match self {
            Self::Degraded { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Returns true if the document was generated.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns true if the fallback document was returned.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Returns true if the run could not start.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }
}

/// A failure while executing the plan.
#[derive(Debug)]
struct StageFailure {
    stage: Option<StageName>,
    error: WeaverError,
}

impl StageFailure {
    fn at(stage: StageName, error: impl Into<WeaverError>) -> Self {
        Self {
            stage: Some(stage),
            error: error.into(),
        }
    }

    fn info(&self) -> FailureInfo {
        FailureInfo::from_error(&self.error, self.stage.map(StageName::as_str))
    }
}

/// Executes stage plans against a completion backend.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    corpus: Arc<dyn ReferenceCorpus>,
    events: Arc<dyn EventSink>,
    retry: RetryConfig,
    settings: RunSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("retry", &self.retry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with an empty corpus, no-op events and the
    /// default retry policy.
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            corpus: Arc::new(StaticCorpus::empty()),
            events: Arc::new(NoOpEventSink),
            retry: RetryConfig::default(),
            settings: RunSettings::default(),
        }
    }

    /// Creates an orchestrator using the retry policy and switches of `config`.
    #[must_use]
    pub fn from_config(config: &WeaverConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self::new(backend)
            .with_retry(config.retry)
            .with_settings(RunSettings {
                append_directive: config.append_directive,
                concurrent_review: config.concurrent_review,
                max_reference_chars: config.max_reference_chars,
            })
    }

    /// Sets the reference corpus.
    #[must_use]
    pub fn with_corpus(mut self, corpus: Arc<dyn ReferenceCorpus>) -> Self {
        self.corpus = corpus;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the behavior switches.
    #[must_use]
    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Enables or disables the closing directive line.
    #[must_use]
    pub fn with_append_directive(mut self, enabled: bool) -> Self {
        self.settings.append_directive = enabled;
        self
    }

    /// Enables or disables concurrent dispatch of independent stages.
    #[must_use]
    pub fn with_concurrent_review(mut self, enabled: bool) -> Self {
        self.settings.concurrent_review = enabled;
        self
    }

    /// Returns the behavior switches.
    #[must_use]
    pub fn settings(&self) -> RunSettings {
        self.settings
    }

    /// Runs the pipeline for `instruction` in `mode`.
    ///
    /// Never fails for backend or runtime problems: those produce
    /// [`PipelineOutcome::Degraded`] with the fallback document. Only a
    /// backend that is not configured yields
    /// [`PipelineOutcome::ConfigurationError`].
    pub async fn run(&self, instruction: &str, mode: Mode) -> PipelineOutcome {
        if let Err(err) = self.backend.check_ready() {
            error!(error = %err, "Backend is not configured");
            return PipelineOutcome::ConfigurationError(err);
        }

        let plan = match StagePlan::for_mode(mode, self.settings.append_directive) {
            Ok(plan) => plan,
            Err(err) => {
                let run = Run::new(instruction, mode, Vec::new());
                let failure = StageFailure {
                    stage: None,
                    error: err.into(),
                };
                return self.degrade(run, &failure, 0.0).await;
            }
        };

        let run = Run::new(instruction, mode, plan.stages().to_vec());
        let span = run_span(run.identity(), mode);
        self.run_plan(run, &plan).instrument(span).await
    }

    async fn run_plan(&self, mut run: Run, plan: &StagePlan) -> PipelineOutcome {
        let started = Instant::now();
        let run_id = run.identity().run_id.to_string();
        info!(stages = plan.len(), "Pipeline started");
        self.events
            .emit(&PipelineEvent::PipelineStarted {
                run_id: run_id.clone(),
                mode: run.mode(),
                stages: plan.names(),
            })
            .await;

        let executed = AssertUnwindSafe(self.execute(&mut run, plan))
            .catch_unwind()
            .await;
        let executed = executed.unwrap_or_else(|payload| {
            Err(StageFailure {
                stage: run.next_pending().map(|s| s.name),
                error: WeaverError::Internal(format!(
                    "stage panicked: {}",
                    panic_message(payload.as_ref())
                )),
            })
        });

        let finished = executed.and_then(|()| self.finish(&run));
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match finished {
            Ok(document) => {
                info!(duration_ms, chars = document.len(), "Pipeline completed");
                self.events
                    .emit(&PipelineEvent::PipelineCompleted {
                        run_id,
                        duration_ms,
                    })
                    .await;
                PipelineOutcome::Completed {
                    document,
                    report: RunReport::from_run(run, duration_ms),
                }
            }
            Err(failure) => self.degrade(run, &failure, duration_ms).await,
        }
    }

    /// Executes every stage of the plan, recording outputs in order.
    async fn execute(&self, run: &mut Run, plan: &StagePlan) -> Result<(), StageFailure> {
        let references = excerpt(self.corpus.list(), self.settings.max_reference_chars);

        for batch in plan.batches(self.settings.concurrent_review) {
            let mut requests: Vec<(&Stage, CompletionRequest)> = Vec::with_capacity(batch.len());
            for idx in batch {
                let stage = &plan.stages()[idx];
                let inputs = run
                    .inputs_for(stage)
                    .map_err(|e| StageFailure::at(stage.name, e))?;
                let rendered = render(stage, run.instruction(), &inputs, references.as_deref())
                    .map_err(|e| StageFailure::at(stage.name, e))?;
                self.events
                    .emit(&PipelineEvent::StageStarted {
                        stage: stage.name,
                        inputs: stage.depends_on.clone(),
                    })
                    .await;
                requests.push((stage, CompletionRequest::new(stage, rendered)));
            }

            let results = join_all(requests.iter().map(|(_, request)| self.call(request))).await;

            // Results come back in declaration order regardless of finish order.
            for ((stage, _), result) in requests.iter().zip(results) {
                let output = result?;
                let event = PipelineEvent::StageCompleted {
                    stage: stage.name,
                    attempts: output.attempts,
                    duration_ms: output.duration_ms,
                    output_chars: output.text.len(),
                };
                run.record(stage.name, output)
                    .map_err(|e| StageFailure::at(stage.name, e))?;
                self.events.emit(&event).await;
            }
        }
        Ok(())
    }

    /// Calls the backend for one stage through the retry wrapper.
    async fn call(&self, request: &CompletionRequest) -> Result<StageOutput, StageFailure> {
        let stage = request.stage;
        let started = Instant::now();

        let result = with_retry_notify(
            &self.retry,
            stage.as_str(),
            || async {
                let text = self.backend.complete(request).await?;
                if text.trim().is_empty() {
                    return Err(BackendError::EmptyResponse);
                }
                Ok(text)
            },
            |attempt, err: &BackendError, delay| {
                self.events.try_emit(&PipelineEvent::StageRetry {
                    stage,
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error: err.to_string(),
                });
            },
        )
        .await;

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(done) => Ok(StageOutput::new(stage.as_str(), done.value)
                .with_attempts(done.attempts)
                .with_duration_ms(duration_ms)),
            Err(failed) => {
                self.events
                    .emit(&PipelineEvent::StageFailed {
                        stage,
                        kind: failed.value.kind().to_string(),
                        error: failed.value.to_string(),
                    })
                    .await;
                Err(StageFailure::at(stage, failed.value))
            }
        }
    }

    /// Turns the final stage output into the delivered document.
    fn finish(&self, run: &Run) -> Result<String, StageFailure> {
        let last = run.stages().last().map(|s| s.name);
        let Some(output) = run.final_output() else {
            return Err(StageFailure {
                stage: last,
                error: WeaverError::Internal("run ended without a final output".into()),
            });
        };

        finalize_document(&output.text, run.instruction(), self.settings.append_directive)
            .map_err(|rejection| StageFailure {
                stage: last,
                error: WeaverError::Internal(rejection.to_string()),
            })
    }

    async fn degrade(&self, run: Run, failure: &StageFailure, duration_ms: f64) -> PipelineOutcome {
        let info = failure.info();
        error!(
            stage = info.stage.as_deref().unwrap_or("-"),
            kind = %info.kind,
            error = ?failure.error,
            "Pipeline failed, returning fallback document"
        );
        self.events
            .emit(&PipelineEvent::PipelineDegraded {
                run_id: run.identity().run_id.to_string(),
                reason: info.message.clone(),
            })
            .await;

        PipelineOutcome::Degraded {
            document: fallback_document(run.instruction(), self.settings.append_directive),
            failure: info,
            report: RunReport::from_run(run, duration_ms),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs the pipeline end to end with the OpenRouter backend described by
/// `config`, grounding stages in the documents of `config.knowledge_dir`.
///
/// Events are forwarded to `tracing`.
#[cfg(feature = "openrouter")]
pub async fn run_pipeline(config: &WeaverConfig, instruction: &str, mode: Mode) -> PipelineOutcome {
    use crate::backend::OpenRouterBackend;
    use crate::corpus::load_directory;
    use crate::events::LoggingEventSink;

    let backend = match OpenRouterBackend::from_config(config) {
        Ok(backend) => backend,
        Err(err) => return PipelineOutcome::ConfigurationError(err),
    };
    let corpus = load_directory(&config.knowledge_dir).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Could not load reference corpus, continuing without it");
        StaticCorpus::empty()
    });

    Orchestrator::from_config(config, Arc::new(backend))
        .with_corpus(Arc::new(corpus))
        .with_event_sink(Arc::new(LoggingEventSink::default()))
        .run(instruction, mode)
        .await
}
