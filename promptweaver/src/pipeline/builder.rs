//! Stage plan construction with validation.

use crate::core::Mode;
use crate::errors::PipelineValidationError;
use crate::stages::{self, referenced_stages, Stage, StageName};
use std::collections::HashSet;

/// A validated, ordered list of stages for one mode.
///
/// Every dependency of a stage appears earlier in the list, so executing the
/// stages in order always satisfies the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    mode: Mode,
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Builds the built-in plan for `mode`.
    ///
    /// - `Lean`: analyze → draft → finalize, with analyze grounded in the
    ///   reference corpus.
    /// - `Full`: analyze → research → draft → critique + validate → finalize,
    ///   with research and critique grounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembled plan fails validation.
    pub fn for_mode(mode: Mode, append_directive: bool) -> Result<Self, PipelineValidationError> {
        use crate::stages::StageName::{Analyze, Critique, Draft, Research, Validate};

        let builder = StagePlanBuilder::new(mode);
        let builder = match mode {
            Mode::Lean => builder
                .stage(stages::analyze().grounded(true))?
                .stage(stages::draft().with_dependency(Analyze))?
                .stage(stages::finalize(append_directive).with_dependency(Draft))?,
            Mode::Full => builder
                .stage(stages::analyze())?
                .stage(stages::research().with_dependency(Analyze).grounded(true))?
                .stage(stages::draft().with_dependencies([Analyze, Research]))?
                .stage(stages::critique().with_dependency(Draft).grounded(true))?
                .stage(stages::validate().with_dependency(Draft))?
                .stage(stages::finalize(append_directive).with_dependencies([Draft, Critique, Validate]))?,
        };
        builder.build()
    }

    /// Returns the mode this plan was built for.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn get(&self, name: StageName) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the plan has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Groups stage indices into execution batches.
    ///
    /// Without `concurrent`, every stage is its own batch. With it, runs of
    /// adjacent stages that only depend on earlier batches are grouped so
    /// they can be dispatched together. Batches preserve declaration order.
    #[must_use]
    pub fn batches(&self, concurrent: bool) -> Vec<Vec<usize>> {
        if !concurrent {
            return (0..self.stages.len()).map(|i| vec![i]).collect();
        }

        let mut batches: Vec<Vec<usize>> = Vec::new();
        let mut done: HashSet<StageName> = HashSet::new();
        let mut current: Vec<usize> = Vec::new();

        for (idx, stage) in self.stages.iter().enumerate() {
            let ready = stage.depends_on.iter().all(|d| done.contains(d));
            if !ready && !current.is_empty() {
                done.extend(current.iter().map(|i| self.stages[*i].name));
                batches.push(std::mem::take(&mut current));
            }
            current.push(idx);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// Consumes the plan, returning the stages.
    #[must_use]
    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}

/// Builds the stage list for `mode` with the closing directive enabled.
///
/// # Errors
///
/// See [`StagePlan::for_mode`].
pub fn build(mode: Mode) -> Result<StagePlan, PipelineValidationError> {
    StagePlan::for_mode(mode, true)
}

/// Builder for validated stage plans.
///
/// Each added stage is checked against the stages added before it: names
/// must be unique and every dependency (declared or referenced as a
/// `{<stage>}` placeholder) must already be in the plan.
#[derive(Debug, Clone)]
pub struct StagePlanBuilder {
    mode: Mode,
    stages: Vec<Stage>,
}

impl StagePlanBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            stages: Vec::new(),
        }
    }

    /// Adds a stage after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is a duplicate, depends on itself or on
    /// a stage not yet added, or inlines an undeclared stage.
    pub fn stage(mut self, stage: Stage) -> Result<Self, PipelineValidationError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Adds a stage in place.
    ///
    /// # Errors
    ///
    /// See [`StagePlanBuilder::stage`].
    pub fn add_stage(&mut self, stage: Stage) -> Result<(), PipelineValidationError> {
        let name = stage.name;

        if self.stages.iter().any(|s| s.name == name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{name}' is declared more than once"
            ))
            .with_stages(vec![name.to_string()])
            .with_fix_hint("Each stage name may appear once per plan."));
        }

        let mut seen = HashSet::new();
        for dep in &stage.depends_on {
            if *dep == name {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' depends on itself"
                ))
                .with_stages(vec![name.to_string()])
                .with_fix_hint("Remove the self-dependency."));
            }
            if !seen.insert(*dep) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' lists dependency '{dep}' twice"
                ))
                .with_stages(vec![name.to_string(), dep.to_string()])
                .with_fix_hint("List each dependency once."));
            }
            if !self.contains(*dep) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' depends on '{dep}' which is not an earlier stage"
                ))
                .with_stages(vec![name.to_string(), dep.to_string()])
                .with_fix_hint("Add the dependency before the stage that reads it."));
            }
        }

        for referenced in referenced_stages(&stage.task_template) {
            if !stage.depends_on(referenced) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' inlines '{{{referenced}}}' without declaring it"
                ))
                .with_stages(vec![name.to_string(), referenced.to_string()])
                .with_fix_hint("Declare the stage as a dependency or remove the placeholder."));
            }
        }

        self.stages.push(stage);
        Ok(())
    }

    /// Returns true if a stage with `name` was added.
    #[must_use]
    pub fn contains(&self, name: StageName) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if no stages were added.
    pub fn build(self) -> Result<StagePlan, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Plan has no stages")
                .with_fix_hint("Add at least one stage before building."));
        }
        Ok(StagePlan {
            mode: self.mode,
            stages: self.stages,
        })
    }
}
