//! Canned stage outputs and helpers for pipeline tests.

use crate::pipeline::RetryConfig;
use crate::stages::StageName;

/// An instruction used across scenario tests.
pub const QUANTUM_INSTRUCTION: &str = "Explain quantum computing to high school students";

/// The final document returned by [`canned_response`] for `finalize`.
///
/// Carries a trailing meta section that cleanup must remove.
pub const CANNED_FINAL: &str = "# Structured Prompt\n\n\
    ## Objective\nProduce the requested content.\n\n\
    ## Context\nThe reader is new to the topic.\n\n\
    ## Workflow Steps\n1. Outline.\n2. Write.\n3. Review.\n\n\
    ## Constraints\n- Stay accurate.\n\n\
    ## Validation Criteria\n- Every step is covered.\n\n\
    ## Next Steps\nLet me know if you want changes.";

/// A plausible response for `stage`.
///
/// Intermediate stages echo the first line of their task so tests can trace
/// which output reached which prompt.
#[must_use]
pub fn canned_response(stage: StageName, task: &str) -> String {
    let first_line = task.lines().next().unwrap_or_default();
    match stage {
        StageName::Analyze => format!(
            "ANALYSIS\n- Core Objective: {first_line}\n- Target Audience: general\n- Constraints: none"
        ),
        StageName::Research => "RESEARCH\n- Framework: RISEN\n- Technique: step-by-step".to_string(),
        StageName::Draft => "DRAFT\n# Draft Prompt\n\n## Objective\nDo the task.".to_string(),
        StageName::Critique => "CRITIQUE\n- Add an audience section.".to_string(),
        StageName::Validate => "VALIDATION\n- [x] Objective explicit\n- [ ] Examples".to_string(),
        StageName::Finalize => CANNED_FINAL.to_string(),
    }
}

/// Retry policy with no waits, for tests that exercise retries.
#[must_use]
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .with_max_attempts(max_attempts)
        .with_delay_ms(0)
}
