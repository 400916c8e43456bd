//! Task template rendering.
//!
//! Templates use `{instruction}` for the run's instruction and `{<stage>}`
//! (e.g. `{draft}`) to inline a declared dependency's output. Dependencies
//! that are not inlined are attached as context sections, in declaration
//! order, after the task text.

use super::{Stage, StageName};
use crate::context::StageInputs;
use crate::errors::TemplateError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Placeholder substituted with the run's instruction.
pub const INSTRUCTION_PLACEHOLDER: &str = "{instruction}";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// The backend-ready input of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTask {
    /// Task text with placeholders substituted.
    pub task: String,
    /// Upstream outputs and reference material, possibly empty.
    pub context: String,
}

impl RenderedTask {
    /// Task and context joined as a single prompt body.
    #[must_use]
    pub fn prompt(&self) -> String {
        if self.context.is_empty() {
            self.task.clone()
        } else {
            format!("{}\n\n{}", self.task, self.context)
        }
    }
}

/// Returns the stages a template inlines via `{<stage>}` placeholders.
#[must_use]
pub fn referenced_stages(template: &str) -> Vec<StageName> {
    let mut found = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        if let Ok(name) = caps[1].parse::<StageName>() {
            if !found.contains(&name) {
                found.push(name);
            }
        }
    }
    found
}

/// Renders `stage`'s template against the instruction and its inputs.
///
/// `references` is attached only when the stage is grounded.
///
/// # Errors
///
/// Returns `TemplateError::UndeclaredPlaceholder` if the template names a
/// stage that is not a declared dependency.
pub fn render(
    stage: &Stage,
    instruction: &str,
    inputs: &StageInputs<'_>,
    references: Option<&str>,
) -> Result<RenderedTask, TemplateError> {
    let template = &stage.task_template;
    let mut task = String::with_capacity(template.len() + instruction.len());
    let mut inlined: HashSet<StageName> = HashSet::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let key = &caps[1];

        let replacement = if key == "instruction" {
            instruction
        } else if let Ok(dep) = key.parse::<StageName>() {
            inlined.insert(dep);
            inputs.get(dep)?
        } else {
            // Not ours; keep literal braces intact.
            continue;
        };

        task.push_str(&template[last..whole.start]);
        task.push_str(replacement);
        last = whole.end;
    }
    task.push_str(&template[last..]);

    let mut sections = Vec::new();
    for (dep, text) in inputs.iter() {
        if !inlined.contains(&dep) {
            sections.push(format!("### {} output\n{}", dep.title(), text.trim()));
        }
    }
    if stage.grounded {
        if let Some(refs) = references.filter(|r| !r.trim().is_empty()) {
            sections.push(format!("### Reference material\n{}", refs.trim()));
        }
    }

    let context = if sections.is_empty() {
        String::new()
    } else {
        format!("## Context from prior stages\n\n{}", sections.join("\n\n"))
    };

    Ok(RenderedTask { task, context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OutputBag;
    use crate::core::StageOutput;
    use crate::stages::{Role, Stage};

    fn role() -> Role {
        Role::new("Tester", "test", "tests")
    }

    fn bag(entries: &[(StageName, &str)]) -> OutputBag {
        let mut bag = OutputBag::new();
        for (name, text) in entries {
            bag.set(*name, StageOutput::new(name.as_str(), *text)).unwrap();
        }
        bag
    }

    #[test]
    fn test_instruction_substitution() {
        let stage = Stage::new(StageName::Analyze, role(), "Analyze '{instruction}' now.");
        let outputs = OutputBag::new();
        let inputs = StageInputs::collect(&stage, &outputs).unwrap();

        let rendered = render(&stage, "Plan a trip", &inputs, None).unwrap();
        assert_eq!(rendered.task, "Analyze 'Plan a trip' now.");
        assert!(rendered.context.is_empty());
        assert_eq!(rendered.prompt(), rendered.task);
    }

    #[test]
    fn test_dependencies_become_context_sections() {
        let stage = Stage::new(StageName::Finalize, role(), "Finish {instruction}")
            .with_dependencies([StageName::Draft, StageName::Critique, StageName::Validate]);
        let outputs = bag(&[
            (StageName::Draft, "DRAFT TEXT"),
            (StageName::Critique, "CRITIQUE TEXT"),
            (StageName::Validate, "VALIDATE TEXT"),
        ]);
        let inputs = StageInputs::collect(&stage, &outputs).unwrap();

        let rendered = render(&stage, "it", &inputs, None).unwrap();
        let draft_at = rendered.context.find("DRAFT TEXT").unwrap();
        let critique_at = rendered.context.find("CRITIQUE TEXT").unwrap();
        let validate_at = rendered.context.find("VALIDATE TEXT").unwrap();
        assert!(draft_at < critique_at && critique_at < validate_at);
        assert!(rendered.context.contains("### Validation output"));
    }

    #[test]
    fn test_inlined_dependency_not_repeated() {
        let stage = Stage::new(StageName::Critique, role(), "Review:\n{draft}")
            .with_dependency(StageName::Draft);
        let outputs = bag(&[(StageName::Draft, "the draft")]);
        let inputs = StageInputs::collect(&stage, &outputs).unwrap();

        let rendered = render(&stage, "x", &inputs, None).unwrap();
        assert_eq!(rendered.task, "Review:\nthe draft");
        assert!(rendered.context.is_empty());
    }

    #[test]
    fn test_undeclared_placeholder_is_an_error() {
        let stage = Stage::new(StageName::Draft, role(), "Use {research}")
            .with_dependency(StageName::Analyze);
        let outputs = bag(&[(StageName::Analyze, "a")]);
        let inputs = StageInputs::collect(&stage, &outputs).unwrap();

        let err = render(&stage, "x", &inputs, None).unwrap_err();
        assert!(matches!(err, TemplateError::UndeclaredPlaceholder { .. }));
    }

    #[test]
    fn test_unknown_braces_left_alone() {
        let stage = Stage::new(StageName::Analyze, role(), "JSON like {foo} stays");
        let outputs = OutputBag::new();
        let inputs = StageInputs::collect(&stage, &outputs).unwrap();

        let rendered = render(&stage, "x", &inputs, None).unwrap();
        assert_eq!(rendered.task, "JSON like {foo} stays");
    }

    #[test]
    fn test_referenced_stages() {
        assert_eq!(
            referenced_stages("{instruction} {draft} {critique} {draft} {foo}"),
            vec![StageName::Draft, StageName::Critique]
        );
        assert!(referenced_stages("plain").is_empty());
    }

    #[test]
    fn test_references_only_for_grounded_stages() {
        let outputs = OutputBag::new();
        let plain = Stage::new(StageName::Analyze, role(), "{instruction}");
        let inputs = StageInputs::collect(&plain, &outputs).unwrap();
        let rendered = render(&plain, "x", &inputs, Some("PECRA guide")).unwrap();
        assert!(!rendered.context.contains("PECRA"));

        let grounded = plain.clone().grounded(true);
        let rendered = render(&grounded, "x", &inputs, Some("PECRA guide")).unwrap();
        assert!(rendered.context.contains("### Reference material\nPECRA guide"));
    }
}
