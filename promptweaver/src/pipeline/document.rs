//! Turning the last stage's raw text into the delivered document.

use regex::Regex;
use std::sync::LazyLock;

/// The fixed closing line appended when the directive flag is enabled.
pub const DIRECTIVE_LINE: &str =
    "**Instruction to LLM: Execute this prompt directly. No clarification needed.**";

/// [`DIRECTIVE_LINE`] without its emphasis markup.
const DIRECTIVE_TEXT: &str =
    "Instruction to LLM: Execute this prompt directly. No clarification needed.";

/// Prefix of an in-band error marker.
pub const ERROR_SENTINEL: &str = "Error:";

const DEFAULT_TITLE: &str = "Prompt Output";

static STACK_TRACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^Traceback \(most recent call last\):|^\s+File "[^"]+", line \d+|thread '[^']*' panicked at|^\s+at [\w.$]+\([\w.]+:\d+\)|^stack backtrace:"#,
    )
    .expect("stack trace pattern is valid")
});

static META_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(request for clarification|clarifications?( needed)?|clarifying questions|questions for (the )?user|open questions|feedback( prompts?| request)?|next steps|critique( notes| summary)?|validation (notes|report|results|checklist)|reviewer notes|meta( notes)?|notes to (the )?(user|reviewer))$",
    )
    .expect("meta heading pattern is valid")
});

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```(?:markdown|md)?[ \t]*\n(.*?)\n```\s*\z").expect("fence pattern is valid")
});

/// Why a final stage output was not accepted as a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRejection {
    /// Nothing usable remained after cleanup.
    Empty,
    /// The text is an error message or stack trace rather than a prompt.
    ErrorMarker(String),
}

impl std::fmt::Display for DocumentRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "final stage produced no usable content"),
            Self::ErrorMarker(line) => write!(f, "final stage returned an error marker: {line}"),
        }
    }
}

/// Returns true if `text` is an in-band error rather than content.
#[must_use]
pub fn is_error_marker(text: &str) -> bool {
    let trimmed = text.trim_start();
    let starts_with_sentinel = trimmed
        .get(..ERROR_SENTINEL.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ERROR_SENTINEL));
    starts_with_sentinel || STACK_TRACE.is_match(text)
}

/// Derives a short title from the first sentence of `text`.
///
/// Uses up to seven words, title-cased; falls back to "Prompt Output".
#[must_use]
pub fn simple_title(text: &str) -> String {
    let first_sentence = text
        .trim()
        .split(['.', '!', '?', '\n'])
        .next()
        .unwrap_or_default();
    let words: Vec<String> = first_sentence
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .take(7)
        .map(title_case)
        .collect();

    if words.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        words.join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Extracts the text of the first `# ` heading outside fenced code blocks.
#[must_use]
pub fn first_heading(text: &str) -> Option<&str> {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .iter()
        .copied()
        .zip(fenced_lines(&lines))
        .filter(|(_, fenced)| !fenced)
        .find_map(|(line, _)| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let line = line.trim_start();
    ["```", "~~~"].into_iter().find(|m| line.starts_with(m))
}

/// Flags every line that belongs to a fenced code block, delimiters
/// included. An unclosed fence runs to the end of the text.
fn fenced_lines(lines: &[&str]) -> Vec<bool> {
    let mut open: Option<&'static str> = None;
    lines
        .iter()
        .map(|line| match (open, fence_marker(line)) {
            (None, Some(marker)) => {
                open = Some(marker);
                true
            }
            (Some(current), Some(marker)) if current == marker => {
                open = None;
                true
            }
            (state, _) => state.is_some(),
        })
        .collect()
}

/// Removes the directive from `line`. Returns `None` when nothing but list,
/// quote or emphasis markup is left.
fn strip_directive(line: &str) -> Option<String> {
    if !line.contains(DIRECTIVE_TEXT) {
        return Some(line.to_string());
    }
    let rest = line.replace(DIRECTIVE_LINE, "").replace(DIRECTIVE_TEXT, "");
    let markup_only = rest
        .chars()
        .all(|c| c.is_whitespace() || c.is_ascii_digit() || "<>-+*_.)".contains(c));
    (!markup_only).then(|| rest.trim_end().to_string())
}

/// Cleans the final stage output into an execution-ready document.
///
/// The result starts with exactly one `# ` heading (a title derived from the
/// instruction is added when the model produced none), has meta sections
/// such as clarification requests or critique notes removed, and ends with
/// [`DIRECTIVE_LINE`] iff `append_directive` is set.
///
/// # Errors
///
/// Returns a [`DocumentRejection`] for blank output or in-band error markers.
pub fn finalize_document(
    raw: &str,
    instruction: &str,
    append_directive: bool,
) -> Result<String, DocumentRejection> {
    let trimmed = raw.trim();
    if is_error_marker(trimmed) {
        let line = trimmed.lines().next().unwrap_or_default().to_string();
        return Err(DocumentRejection::ErrorMarker(line));
    }

    let unfenced = FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    let mut lines: Vec<&str> = unfenced.lines().collect();

    // Drop chatter before the first top-level heading.
    let title_idx = fenced_lines(&lines)
        .into_iter()
        .zip(&lines)
        .position(|(fenced, l)| !fenced && l.starts_with("# "));
    if let Some(idx) = title_idx {
        lines.drain(..idx);
    }

    let body = strip_meta_sections(&lines);
    let fenced = fenced_lines(&body);

    let mut out: Vec<String> = Vec::with_capacity(body.len() + 4);
    let mut seen_title = false;
    for (line, in_fence) in body.into_iter().zip(fenced) {
        let line = match line.strip_prefix("# ") {
            Some(rest) if !in_fence => {
                if seen_title {
                    format!("## {rest}")
                } else {
                    seen_title = true;
                    line.to_string()
                }
            }
            _ => line.to_string(),
        };
        if let Some(line) = strip_directive(&line) {
            out.push(line);
        }
    }

    let content = out.join("\n").trim().to_string();
    if !has_body(&content) {
        return Err(DocumentRejection::Empty);
    }

    let mut document = if seen_title {
        content
    } else {
        format!("# {}\n\n{content}", simple_title(instruction))
    };

    if append_directive {
        document.push_str("\n\n");
        document.push_str(DIRECTIVE_LINE);
    }
    Ok(document)
}

fn has_body(content: &str) -> bool {
    content
        .lines()
        .any(|l| !l.trim().is_empty() && !l.starts_with('#'))
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    line[hashes..]
        .strip_prefix(' ')
        .map(|title| (hashes, title.trim().trim_end_matches(':').trim()))
}

fn strip_meta_sections<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut kept = Vec::with_capacity(lines.len());
    let mut skipping_below: Option<usize> = None;

    for (line, in_fence) in lines.iter().zip(fenced_lines(lines)) {
        if let Some((level, title)) = heading_level(line).filter(|_| !in_fence) {
            if let Some(skip_level) = skipping_below {
                if level > skip_level {
                    continue;
                }
                skipping_below = None;
            }
            let normalized = title.trim_matches(|c: char| c == '*' || c == '_').trim();
            if level > 1 && META_HEADING.is_match(normalized) {
                skipping_below = Some(level);
                continue;
            }
        } else if skipping_below.is_some() {
            continue;
        }
        kept.push(*line);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_marker_detection() {
        assert!(is_error_marker("Error: rate limited"));
        assert!(is_error_marker("  error: boom"));
        assert!(is_error_marker(
            "Something\nTraceback (most recent call last):\n  File \"x.py\", line 3"
        ));
        assert!(is_error_marker("thread 'main' panicked at src/main.rs:1:1"));
        assert!(!is_error_marker("# Error Handling Guide\n\nHandle errors."));
        assert!(!is_error_marker(""));
    }

    #[test]
    fn test_simple_title() {
        assert_eq!(
            simple_title("explain quantum computing to high school students. Keep it short"),
            "Explain Quantum Computing To High School Students"
        );
        assert_eq!(
            simple_title("one two three four five six seven eight"),
            "One Two Three Four Five Six Seven"
        );
        assert_eq!(simple_title("   "), "Prompt Output");
        assert_eq!(simple_title("!!!"), "Prompt Output");
    }

    #[test]
    fn test_first_heading() {
        assert_eq!(first_heading("intro\n# My Title \nbody"), Some("My Title"));
        assert_eq!(first_heading("## Sub\nbody"), None);
    }

    #[test]
    fn test_finalize_keeps_heading_and_appends_directive() {
        let raw = "# Quantum Lesson\n\n## Objective\nTeach qubits.";
        let doc = finalize_document(raw, "ignored", true).unwrap();

        assert!(doc.starts_with("# Quantum Lesson"));
        assert_eq!(doc.lines().last(), Some(DIRECTIVE_LINE));
        assert_eq!(doc.matches(DIRECTIVE_LINE).count(), 1);
    }

    #[test]
    fn test_finalize_adds_title_when_missing() {
        let doc = finalize_document("## Objective\nDo it.", "plan a wedding", false).unwrap();
        assert!(doc.starts_with("# Plan A Wedding\n\n## Objective"));
        assert!(!doc.contains(DIRECTIVE_LINE));
    }

    #[test]
    fn test_finalize_drops_preamble_and_fences() {
        let raw = "```markdown\nHere is your prompt:\n# Title\n\n## Objective\nGo.\n```";
        let doc = finalize_document(raw, "x", false).unwrap();
        assert_eq!(doc, "# Title\n\n## Objective\nGo.");
    }

    #[test]
    fn test_finalize_removes_meta_sections() {
        let raw = "# Title\n\n## Objective\nGo.\n\n## Validation Criteria\n- works\n\n\
                   ## Next Steps\nTell me more.\n### Detail\nmore\n\n## Constraints\nNone.\n\n\
                   ## Request for Clarification:\nWhat audience?";
        let doc = finalize_document(raw, "x", false).unwrap();

        assert!(doc.contains("## Validation Criteria"));
        assert!(doc.contains("## Constraints\nNone."));
        assert!(!doc.contains("Next Steps"));
        assert!(!doc.contains("Tell me more"));
        assert!(!doc.contains("### Detail"));
        assert!(!doc.contains("What audience?"));
    }

    #[test]
    fn test_finalize_demotes_extra_titles() {
        let doc = finalize_document("# One\ntext\n# Two\nmore", "x", false).unwrap();
        assert_eq!(doc, "# One\ntext\n## Two\nmore");
    }

    #[test]
    fn test_finalize_removes_model_directive_when_disabled() {
        let raw = format!("# T\n\nbody\n\n{DIRECTIVE_LINE}");
        let doc = finalize_document(&raw, "x", false).unwrap();
        assert!(!doc.contains(DIRECTIVE_LINE));
    }

    #[test]
    fn test_finalize_removes_decorated_directive() {
        let raw = format!(
            "# T\n\nbody\n\n> {DIRECTIVE_LINE}\n- {DIRECTIVE_TEXT}\nKeep this. {DIRECTIVE_LINE}"
        );
        let doc = finalize_document(&raw, "x", false).unwrap();
        assert!(!doc.contains(DIRECTIVE_TEXT));
        assert_eq!(doc, "# T\n\nbody\n\nKeep this.");

        let doc = finalize_document(&raw, "x", true).unwrap();
        assert_eq!(doc.matches(DIRECTIVE_TEXT).count(), 1);
        assert!(doc.ends_with(&format!("Keep this.\n\n{DIRECTIVE_LINE}")));
    }

    #[test]
    fn test_finalize_keeps_document_that_is_one_code_block() {
        let raw = "```bash\n# install deps\nnpm ci\n```";
        let doc = finalize_document(raw, "install deps", false).unwrap();
        assert_eq!(doc, format!("# Install Deps\n\n{raw}"));
    }

    #[test]
    fn test_first_heading_skips_code_blocks() {
        let text = "```bash\n# install deps\nnpm ci\n```\n# Deploy Guide";
        assert_eq!(first_heading(text), Some("Deploy Guide"));
        assert_eq!(first_heading("~~~\n# only a comment\n~~~"), None);
    }

    #[test]
    fn test_finalize_leaves_code_block_comments_alone() {
        let raw = "## Objective\nAutomate the deploy.\n\n## Steps\n```bash\n# install deps\nnpm ci\n```";
        let doc = finalize_document(raw, "automate the deploy", false).unwrap();
        assert_eq!(
            doc,
            "# Automate The Deploy\n\n## Objective\nAutomate the deploy.\n\n\
             ## Steps\n```bash\n# install deps\nnpm ci\n```"
        );

        let raw = "# Deploy Guide\n\n## Steps\n```bash\n# install deps\nnpm ci\n```\n\n\
                   ```python\n# Next Steps\n## Next Steps\nrun()\n```";
        let doc = finalize_document(raw, "x", false).unwrap();
        assert!(doc.starts_with("# Deploy Guide\n"));
        assert!(doc.contains("```bash\n# install deps\nnpm ci\n```"));
        assert!(doc.contains("# Next Steps\n## Next Steps\nrun()"));
        assert!(!doc.contains("## install deps"));
    }

    #[test]
    fn test_finalize_rejections() {
        assert_eq!(finalize_document("  \n ", "x", true), Err(DocumentRejection::Empty));
        assert_eq!(finalize_document("# Only A Title", "x", true), Err(DocumentRejection::Empty));
        assert!(matches!(
            finalize_document("Error: model overloaded", "x", true),
            Err(DocumentRejection::ErrorMarker(_))
        ));
    }
}
