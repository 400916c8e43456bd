//! The built-in stage personas and task texts.
//!
//! Dependencies are not set here; [`crate::pipeline::build`] wires them per
//! mode so the same descriptor can be reused by both stage sets.

use super::{Role, Stage, StageName};
use crate::pipeline::DIRECTIVE_LINE;

/// Requirements analysis of the raw instruction.
#[must_use]
pub fn analyze() -> Stage {
    Stage::new(
        StageName::Analyze,
        Role::new(
            "Prompt Requirements Analyst",
            "Deeply understand and clarify the user's instruction. Identify objective, \
             audience, format, context, and constraints.",
            "You are a specialist in translating high-level ideas into clear prompt \
             specifications for LLMs.",
        ),
        "Analyze the user's instruction: '{instruction}'. Break down core objective, \
         target LLM (if any), desired output, key info, and constraints.\n\n\
         Expected output: a structured breakdown including:\n\
         - Core Objective\n- Target Audience/LLM\n- Desired Output\n\
         - Context/Background\n- Constraints/Edge Cases",
    )
}

/// Maps the analysis onto frameworks and techniques from the knowledge base.
#[must_use]
pub fn research() -> Stage {
    Stage::new(
        StageName::Research,
        Role::new(
            "Prompt Engineering Knowledge Specialist",
            "Leverage the internal knowledge base to find the best prompt frameworks, \
             techniques, and model-specific insights.",
            "You instantly map user needs to advanced prompt strategies documented \
             across our internal library.",
        ),
        "Based on the analysis of '{instruction}', synthesize the best fitting \
         frameworks, techniques, and model-specific advice from the knowledge base.\n\n\
         Expected output: a summary including:\n\
         - Recommended Framework(s)\n- Key Techniques\n- Model-specific Tips\n\
         - Important Constraints\n- Knowledge Base References",
    )
}

/// First structured draft of the prompt.
#[must_use]
pub fn draft() -> Stage {
    Stage::new(
        StageName::Draft,
        Role::new(
            "Creative Prompt Drafter",
            "Craft the initial structured prompt draft applying the analyzed \
             requirements and research insights.",
            "You are a creative architect, structuring prompts using frameworks like \
             PECRA, SCQA, RISEN.",
        ),
        "Draft an initial structured prompt for '{instruction}' using the \
         requirements and any research insights. Apply suitable frameworks.\n\n\
         Expected output: a Markdown-formatted draft prompt including sections like \
         Objective, Context, Workflow Steps, Constraints, Validation Criteria.",
    )
}

/// Critical review of the draft.
#[must_use]
pub fn critique() -> Stage {
    Stage::new(
        StageName::Critique,
        Role::new(
            "Critical Prompt Refiner",
            "Critically evaluate the draft against requirements and best practices, \
             offering actionable refinements.",
            "You rigorously critique prompts based on clarity, structure, completeness, \
             and best practices from the knowledge base.",
        ),
        "Critique the draft prompt for '{instruction}' for clarity, completeness, \
         structure, and adherence to best practices.\n\n\
         Expected output: actionable critique points with specific suggestions for \
         improving the prompt.",
    )
}

/// Checks the draft against the original requirements.
#[must_use]
pub fn validate() -> Stage {
    Stage::new(
        StageName::Validate,
        Role::new(
            "Prompt Requirements Validator",
            "Verify that the draft satisfies every requirement implied by the user's \
             instruction and is ready for direct execution.",
            "You are a meticulous reviewer who checks prompts against their \
             specification before they ship.",
        ),
        "Validate the draft prompt for '{instruction}'. Check that the objective is \
         explicit, required sections are present, constraints are testable, and \
         nothing asks the executing model for clarification.\n\n\
         Expected output: a checklist of satisfied and unsatisfied requirements with \
         the concrete fix for each gap.",
    )
}

/// Produces the final, execution-ready document.
#[must_use]
pub fn finalize(append_directive: bool) -> Stage {
    let closing = if append_directive {
        format!("- Adds a final line: '{DIRECTIVE_LINE}'\n")
    } else {
        String::new()
    };

    Stage::new(
        StageName::Finalize,
        Role::new(
            "LLM Prompt Architect & Finisher",
            "Synthesize and finalize the execution-ready prompt, strictly clean, \
             formatted, and free of meta notes.",
            "You are the final authority, polishing prompts into flawless, \
             production-grade artifacts.",
        ),
        format!(
            "Revise and finalize the structured prompt for '{{instruction}}' for \
             immediate execution. Ensure that the final prompt:\n\
             - Starts with a Title Case heading\n\
             - Contains Objective, Context, Workflow Steps, Constraints, Validation \
             Criteria, and Examples\n\
             - Omits any 'request for clarification', 'feedback prompts', or 'next \
             steps' sections\n\
             - Ends cleanly without any meta comments or questions\n\
             {closing}\
             Format strictly in clean, professional Markdown.\n\n\
             Expected output: a definitive, execution-ready structured prompt without \
             meta sections."
        ),
    )
}
