//! One end-to-end execution of the pipeline.

use super::{OutputBag, RunIdentity, StageInputs};
use crate::core::{Mode, StageOutput};
use crate::errors::{OutputConflictError, TemplateError};
use crate::stages::{Stage, StageName};

/// A single pipeline execution.
///
/// The run owns the instruction, the ordered stage list for its mode and the
/// outputs produced so far. Outputs are appended strictly in declaration
/// order, so `outputs.completion_order()` is always a prefix of the plan.
#[derive(Debug, Clone)]
pub struct Run {
    identity: RunIdentity,
    instruction: String,
    mode: Mode,
    stages: Vec<Stage>,
    outputs: OutputBag,
}

impl Run {
    /// Creates a new run over an already validated stage list.
    #[must_use]
    pub fn new(instruction: impl Into<String>, mode: Mode, stages: Vec<Stage>) -> Self {
        Self {
            identity: RunIdentity::new(),
            instruction: instruction.into(),
            mode,
            stages,
            outputs: OutputBag::new(),
        }
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the instruction.
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Returns the mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the ordered stage list.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the outputs recorded so far.
    #[must_use]
    pub fn outputs(&self) -> &OutputBag {
        &self.outputs
    }

    /// Returns the next stage without output, if any.
    #[must_use]
    pub fn next_pending(&self) -> Option<&Stage> {
        self.stages.get(self.outputs.len())
    }

    /// Returns true once every stage has an output.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outputs.len() == self.stages.len()
    }

    /// Collects the declared inputs for `stage`.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateError` if a dependency has no output yet.
    pub fn inputs_for<'a>(&'a self, stage: &Stage) -> Result<StageInputs<'a>, TemplateError> {
        StageInputs::collect(stage, &self.outputs)
    }

    /// Appends the output of the next pending stage.
    ///
    /// # Errors
    ///
    /// Returns `OutputConflictError` if `stage` is not the next pending
    /// stage or already has an output.
    pub fn record(&mut self, stage: StageName, output: StageOutput) -> Result<(), OutputConflictError> {
        match self.next_pending() {
            Some(next) if next.name == stage => self.outputs.set(stage, output),
            Some(next) => Err(OutputConflictError::new(
                stage.as_str(),
                format!("out of order: '{}' must complete first", next.name),
            )),
            None => Err(OutputConflictError::new(
                stage.as_str(),
                "run already has every output",
            )),
        }
    }

    /// Returns the output of the last stage once the run is complete.
    #[must_use]
    pub fn final_output(&self) -> Option<&StageOutput> {
        if !self.is_complete() {
            return None;
        }
        self.stages
            .last()
            .and_then(|stage| self.outputs.get(stage.name))
    }

    /// Consumes the run, returning the outputs in completion order.
    #[must_use]
    pub fn into_outputs(self) -> Vec<StageOutput> {
        self.outputs.into_outputs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{analyze, draft, finalize};

    fn lean_stages() -> Vec<Stage> {
        vec![
            analyze(),
            draft().with_dependency(StageName::Analyze),
            finalize(true).with_dependency(StageName::Draft),
        ]
    }

    #[test]
    fn test_record_in_order() {
        let mut run = Run::new("Write a haiku", Mode::Lean, lean_stages());
        assert_eq!(run.next_pending().unwrap().name, StageName::Analyze);

        run.record(StageName::Analyze, StageOutput::new("analyze", "a"))
            .unwrap();
        run.record(StageName::Draft, StageOutput::new("draft", "d"))
            .unwrap();
        assert!(!run.is_complete());
        assert!(run.final_output().is_none());

        run.record(StageName::Finalize, StageOutput::new("finalize", "# Haiku"))
            .unwrap();
        assert!(run.is_complete());
        assert_eq!(run.final_output().unwrap().text, "# Haiku");
    }

    #[test]
    fn test_record_out_of_order_rejected() {
        let mut run = Run::new("x", Mode::Lean, lean_stages());
        let err = run
            .record(StageName::Draft, StageOutput::new("draft", "d"))
            .unwrap_err();
        assert!(err.message.contains("analyze"));
        assert!(run.outputs().is_empty());
    }

    #[test]
    fn test_inputs_for_requires_dependencies() {
        let run = Run::new("x", Mode::Lean, lean_stages());
        let draft_stage = run.stages()[1].clone();
        assert!(run.inputs_for(&draft_stage).is_err());
    }
}
