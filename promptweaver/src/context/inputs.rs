//! Stage inputs with strictness enforcement.

use super::OutputBag;
use crate::errors::TemplateError;
use crate::stages::{Stage, StageName};

/// An immutable view of the upstream outputs a stage declared.
///
/// Building the view fails if any declared dependency has no output or only
/// whitespace, so a stage can never start before its inputs are ready.
#[derive(Debug, Clone)]
pub struct StageInputs<'a> {
    stage: StageName,
    outputs: Vec<(StageName, &'a str)>,
}

impl<'a> StageInputs<'a> {
    /// Collects the declared dependency outputs for `stage` from `bag`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::MissingOutput` for the first declared
    /// dependency without usable output.
    pub fn collect(stage: &Stage, bag: &'a OutputBag) -> Result<Self, TemplateError> {
        let mut outputs = Vec::with_capacity(stage.depends_on.len());
        for dep in &stage.depends_on {
            match bag.text(*dep) {
                Some(text) if !text.trim().is_empty() => outputs.push((*dep, text)),
                _ => {
                    return Err(TemplateError::MissingOutput {
                        stage: stage.name.as_str().to_string(),
                        dependency: dep.as_str().to_string(),
                    })
                }
            }
        }
        Ok(Self {
            stage: stage.name,
            outputs,
        })
    }

    /// Gets the output of a declared dependency.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::UndeclaredPlaceholder` if `dep` was not declared.
    pub fn get(&self, dep: StageName) -> Result<&'a str, TemplateError> {
        self.outputs
            .iter()
            .find(|(name, _)| *name == dep)
            .map(|(_, text)| *text)
            .ok_or_else(|| TemplateError::UndeclaredPlaceholder {
                stage: self.stage.as_str().to_string(),
                placeholder: dep.as_str().to_string(),
            })
    }

    /// Iterates the declared outputs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (StageName, &'a str)> + '_ {
        self.outputs.iter().copied()
    }

    /// Returns true if the stage has no dependencies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageOutput;
    use crate::stages::draft;

    fn bag_with(entries: &[(StageName, &str)]) -> OutputBag {
        let mut bag = OutputBag::new();
        for (name, text) in entries {
            bag.set(*name, StageOutput::new(name.as_str(), *text)).unwrap();
        }
        bag
    }

    #[test]
    fn test_collect_declared_outputs() {
        let stage = draft().with_dependencies([StageName::Analyze, StageName::Research]);
        let bag = bag_with(&[
            (StageName::Analyze, "analysis"),
            (StageName::Research, "frameworks"),
        ]);

        let inputs = StageInputs::collect(&stage, &bag).unwrap();
        assert_eq!(inputs.get(StageName::Research).unwrap(), "frameworks");
        assert_eq!(
            inputs.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            vec![StageName::Analyze, StageName::Research]
        );
    }

    #[test]
    fn test_missing_dependency_output() {
        let stage = draft().with_dependencies([StageName::Analyze, StageName::Research]);
        let bag = bag_with(&[(StageName::Analyze, "analysis")]);

        let err = StageInputs::collect(&stage, &bag).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingOutput {
                stage: "draft".into(),
                dependency: "research".into()
            }
        );
    }

    #[test]
    fn test_blank_dependency_output_counts_as_missing() {
        let stage = draft().with_dependency(StageName::Analyze);
        let bag = bag_with(&[(StageName::Analyze, "   ")]);

        assert!(StageInputs::collect(&stage, &bag).is_err());
    }

    #[test]
    fn test_undeclared_access() {
        let stage = draft().with_dependency(StageName::Analyze);
        let bag = bag_with(&[
            (StageName::Analyze, "analysis"),
            (StageName::Research, "frameworks"),
        ]);

        let inputs = StageInputs::collect(&stage, &bag).unwrap();
        assert!(inputs.get(StageName::Research).is_err());
    }
}
