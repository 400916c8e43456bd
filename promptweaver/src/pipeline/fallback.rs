//! Deterministic fallback document.
//!
//! Used whenever generation cannot produce a usable document. The output
//! depends only on the instruction and the directive flag, never on the
//! backend, so the caller always receives well-formed Markdown.

use super::document::{simple_title, DIRECTIVE_LINE};

/// Section headings of the fallback document, in order.
pub const FALLBACK_SECTIONS: [&str; 6] = [
    "Objective",
    "Context",
    "Workflow Steps",
    "Constraints",
    "Validation Criteria",
    "Output Format",
];

/// Synthesizes a minimal structured document from the instruction alone.
#[must_use]
pub fn fallback_document(instruction: &str, append_directive: bool) -> String {
    let instruction = instruction.trim();
    let title = simple_title(instruction);
    let request = if instruction.is_empty() {
        "> No instruction was provided.".to_string()
    } else {
        // Quoting every line keeps headings in the instruction out of the outline.
        instruction
            .lines()
            .map(|line| format!("> {line}").trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut doc = format!(
        "# {title}\n\n\
         ## Objective\n\
         Fulfil the following request completely and accurately:\n\n\
         {request}\n\n\
         ## Context\n\
         This prompt was assembled without the refinement stages. Infer the \
         audience, tone and depth from the request itself and state any \
         assumption you make before relying on it.\n\n\
         ## Workflow Steps\n\
         1. Restate the core objective in one sentence.\n\
         2. Identify the audience, the expected format and any constraints in the request.\n\
         3. Outline the answer before writing it.\n\
         4. Produce the complete response following the outline.\n\
         5. Review the response against the validation criteria and revise.\n\n\
         ## Constraints\n\
         - Address every part of the request.\n\
         - Do not invent facts; mark uncertain statements as such.\n\
         - Keep the language clear and appropriate for the intended audience.\n\n\
         ## Validation Criteria\n\
         - The response fully answers the request.\n\
         - The structure follows the workflow steps above.\n\
         - No placeholders, meta commentary or follow-up questions remain.\n\n\
         ## Output Format\n\
         Well-structured Markdown with a title, clear section headings and \
         lists where they aid readability."
    );

    if append_directive {
        doc.push_str("\n\n");
        doc.push_str(DIRECTIVE_LINE);
    }
    doc
}
