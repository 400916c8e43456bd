//! Stage descriptors.
//!
//! A stage is the unit of work in a promptweaver run: a persona (the role),
//! a task template, and the upstream stages whose outputs it may read.
//! Descriptors are immutable; outputs live in the run, not on the stage.

mod catalog;
mod template;

pub use catalog::{analyze, critique, draft, finalize, research, validate};
pub use template::{referenced_stages, render, RenderedTask, INSTRUCTION_PLACEHOLDER};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The identifier of a stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Requirements analysis.
    Analyze,
    /// Knowledge-base research.
    Research,
    /// First structured draft.
    Draft,
    /// Critical review of the draft.
    Critique,
    /// Requirements validation of the draft.
    Validate,
    /// Final, execution-ready document.
    Finalize,
}

impl StageName {
    /// All stage names in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Analyze,
        Self::Research,
        Self::Draft,
        Self::Critique,
        Self::Validate,
        Self::Finalize,
    ];

    /// Returns the stage name as used in templates, events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Research => "research",
            Self::Draft => "draft",
            Self::Critique => "critique",
            Self::Validate => "validate",
            Self::Finalize => "finalize",
        }
    }

    /// Returns a human-readable title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Analyze => "Analysis",
            Self::Research => "Research",
            Self::Draft => "Draft",
            Self::Critique => "Critique",
            Self::Validate => "Validation",
            Self::Finalize => "Final",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// The persona performing a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Short title, e.g. "Prompt Requirements Analyst".
    pub title: String,
    /// What the persona is trying to achieve.
    pub goal: String,
    /// Background that shapes the persona's voice.
    pub backstory: String,
}

impl Role {
    /// Creates a new role.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// Renders the role as a system description for the backend.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "You are {}. {}\nYour goal: {}",
            self.title, self.backstory, self.goal
        )
    }
}

/// Immutable description of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// The unique name of the stage.
    pub name: StageName,
    /// The persona performing the stage.
    pub role: Role,
    /// Task text with an `{instruction}` placeholder and optional
    /// `{<stage>}` placeholders for declared dependencies.
    pub task_template: String,
    /// Stages whose outputs must exist before this one runs, in the order
    /// their outputs are presented.
    pub depends_on: Vec<StageName>,
    /// Whether reference corpus excerpts are attached to this stage.
    pub grounded: bool,
}

impl Stage {
    /// Creates a new stage with no dependencies.
    #[must_use]
    pub fn new(name: StageName, role: Role, task_template: impl Into<String>) -> Self {
        Self {
            name,
            role,
            task_template: task_template.into(),
            depends_on: Vec::new(),
            grounded: false,
        }
    }

    /// Sets the dependencies, replacing any existing ones.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = StageName>) -> Self {
        self.depends_on = deps.into_iter().collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: StageName) -> Self {
        if !self.depends_on.contains(&dep) {
            self.depends_on.push(dep);
        }
        self
    }

    /// Marks the stage as grounded in the reference corpus.
    #[must_use]
    pub fn grounded(mut self, grounded: bool) -> Self {
        self.grounded = grounded;
        self
    }

    /// Returns true if this stage reads the given stage's output.
    #[must_use]
    pub fn depends_on(&self, other: StageName) -> bool {
        self.depends_on.contains(&other)
    }
}
