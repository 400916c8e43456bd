//! Typed pipeline events.

use crate::core::Mode;
use crate::stages::StageName;
use serde::Serialize;

/// Something observable that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run started.
    PipelineStarted {
        /// The run ID.
        run_id: String,
        /// The selected mode.
        mode: Mode,
        /// Stages in execution order.
        stages: Vec<StageName>,
    },
    /// A stage rendered its inputs and is about to call the backend.
    StageStarted {
        /// The stage.
        stage: StageName,
        /// The dependencies whose outputs were read.
        inputs: Vec<StageName>,
    },
    /// A backend attempt failed and will be retried.
    StageRetry {
        /// The stage.
        stage: StageName,
        /// The attempt that failed (1-indexed).
        attempt: u32,
        /// Delay before the next attempt.
        delay_ms: u64,
        /// The failure message.
        error: String,
    },
    /// A stage produced its output.
    StageCompleted {
        /// The stage.
        stage: StageName,
        /// Attempts used.
        attempts: u32,
        /// Time spent in the stage.
        duration_ms: f64,
        /// Length of the output text.
        output_chars: usize,
    },
    /// A stage gave up.
    StageFailed {
        /// The stage.
        stage: StageName,
        /// Failure kind.
        kind: String,
        /// The failure message.
        error: String,
    },
    /// The run fell back to the synthesized document.
    PipelineDegraded {
        /// The run ID.
        run_id: String,
        /// Why the run degraded.
        reason: String,
    },
    /// The run finished with a generated document.
    PipelineCompleted {
        /// The run ID.
        run_id: String,
        /// Total run time.
        duration_ms: f64,
    },
}

impl PipelineEvent {
    /// The dotted event type, e.g. `stage.started`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageRetry { .. } => "stage.retry",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::PipelineDegraded { .. } => "pipeline.degraded",
            Self::PipelineCompleted { .. } => "pipeline.completed",
        }
    }

    /// The stage this event concerns, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::StageStarted { stage, .. }
            | Self::StageRetry { stage, .. }
            | Self::StageCompleted { stage, .. }
            | Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Converts the event to a JSON payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
