//! Test assertions for delivered documents and event streams.

use crate::events::PipelineEvent;
use crate::pipeline::{StagePlan, DIRECTIVE_LINE};
use crate::stages::StageName;

/// Asserts that the document starts with its only `# ` heading.
pub fn assert_single_top_heading(document: &str) {
    let titles: Vec<&str> = document.lines().filter(|l| l.starts_with("# ")).collect();
    assert_eq!(
        titles.len(),
        1,
        "Expected exactly one top-level heading, found {titles:?}"
    );
    assert!(
        document.starts_with("# "),
        "Expected document to start with its title, got: {:?}",
        document.lines().next()
    );
}

/// Asserts that the directive line closes the document exactly once.
pub fn assert_ends_with_directive(document: &str) {
    assert_eq!(
        document.lines().last(),
        Some(DIRECTIVE_LINE),
        "Expected the directive as the last line"
    );
    assert_eq!(
        document.matches(DIRECTIVE_LINE).count(),
        1,
        "Expected the directive exactly once"
    );
}

/// Asserts that the directive line does not appear anywhere.
pub fn assert_no_directive(document: &str) {
    assert!(
        !document.contains(DIRECTIVE_LINE),
        "Expected no directive line in:\n{document}"
    );
}

/// Asserts that every stage started only after all its dependencies completed,
/// and that completions follow the plan order.
pub fn assert_dependencies_respected(events: &[PipelineEvent], plan: &StagePlan) {
    let position = |wanted: &str, stage: StageName| {
        events
            .iter()
            .position(|e| e.event_type() == wanted && e.stage() == Some(stage))
    };

    for stage in plan.stages() {
        let started = position("stage.started", stage.name)
            .unwrap_or_else(|| panic!("No stage.started event for {}", stage.name));
        for dep in &stage.depends_on {
            let completed = position("stage.completed", *dep)
                .unwrap_or_else(|| panic!("No stage.completed event for {dep}"));
            assert!(
                completed < started,
                "{} started before its dependency {dep} completed",
                stage.name
            );
        }
    }

    let completed: Vec<StageName> = events
        .iter()
        .filter(|e| e.event_type() == "stage.completed")
        .filter_map(PipelineEvent::stage)
        .collect();
    assert_eq!(completed, plan.names(), "Completions out of plan order");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Mode;
    use crate::pipeline::build;

    fn lifecycle(stage: StageName, inputs: Vec<StageName>) -> [PipelineEvent; 2] {
        [
            PipelineEvent::StageStarted { stage, inputs },
            PipelineEvent::StageCompleted {
                stage,
                attempts: 1,
                duration_ms: 1.0,
                output_chars: 10,
            },
        ]
    }

    #[test]
    fn test_document_assertions() {
        let doc = format!("# Title\n\nbody\n\n{DIRECTIVE_LINE}");
        assert_single_top_heading(&doc);
        assert_ends_with_directive(&doc);
        assert_no_directive("# Title\n\nbody");
    }

    #[test]
    #[should_panic(expected = "exactly one top-level heading")]
    fn test_two_titles_rejected() {
        assert_single_top_heading("# One\n# Two");
    }

    #[test]
    fn test_dependency_order_accepted() {
        let plan = build(Mode::Lean).unwrap();
        let mut events = Vec::new();
        events.extend(lifecycle(StageName::Analyze, vec![]));
        events.extend(lifecycle(StageName::Draft, vec![StageName::Analyze]));
        events.extend(lifecycle(StageName::Finalize, vec![StageName::Draft]));
        assert_dependencies_respected(&events, &plan);
    }

    #[test]
    #[should_panic(expected = "started before its dependency")]
    fn test_dependency_order_violation() {
        let plan = build(Mode::Lean).unwrap();
        let [a_start, a_done] = lifecycle(StageName::Analyze, vec![]);
        let [d_start, d_done] = lifecycle(StageName::Draft, vec![StageName::Analyze]);
        let [f_start, f_done] = lifecycle(StageName::Finalize, vec![StageName::Draft]);
        let events = vec![a_start, d_start, a_done, d_done, f_start, f_done];
        assert_dependencies_respected(&events, &plan);
    }
}
