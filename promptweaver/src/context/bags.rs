//! Write-once storage for stage outputs.

use crate::core::StageOutput;
use crate::errors::OutputConflictError;
use crate::stages::StageName;

/// Per-run stage outputs, kept in completion order.
///
/// Each stage may write exactly once; a second write is an
/// [`OutputConflictError`].
#[derive(Debug, Clone, Default)]
pub struct OutputBag {
    entries: Vec<(StageName, StageOutput)>,
}

impl OutputBag {
    /// Creates a new empty output bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the output for a stage.
    #[must_use]
    pub fn get(&self, stage: StageName) -> Option<&StageOutput> {
        self.entries
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, output)| output)
    }

    /// Gets the output text for a stage.
    #[must_use]
    pub fn text(&self, stage: StageName) -> Option<&str> {
        self.get(stage).map(|output| output.text.as_str())
    }

    /// Checks if output exists for a stage.
    #[must_use]
    pub fn contains(&self, stage: StageName) -> bool {
        self.get(stage).is_some()
    }

    /// Records the output for a stage.
    ///
    /// # Errors
    ///
    /// Returns `OutputConflictError` if the stage already has an output.
    pub fn set(&mut self, stage: StageName, output: StageOutput) -> Result<(), OutputConflictError> {
        if self.contains(stage) {
            return Err(OutputConflictError::new(
                stage.as_str(),
                "Stage already has an output",
            ));
        }
        self.entries.push((stage, output));
        Ok(())
    }

    /// Returns the number of recorded outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stage names in completion order.
    #[must_use]
    pub fn completion_order(&self) -> Vec<StageName> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    /// Iterates outputs in completion order.
    pub fn iter(&self) -> impl Iterator<Item = &StageOutput> {
        self.entries.iter().map(|(_, output)| output)
    }

    /// Consumes the bag, returning outputs in completion order.
    #[must_use]
    pub fn into_outputs(self) -> Vec<StageOutput> {
        self.entries.into_iter().map(|(_, output)| output).collect()
    }
}
