//! Reference corpus used to ground stages.
//!
//! A corpus is a read-only list of named documents loaded once and shared
//! across runs. An empty corpus is valid: grounded stages simply run without
//! reference material.

use crate::errors::CorpusError;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Extensions read as text.
const TEXT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Extensions listed by name only.
const BINARY_EXTENSIONS: [&str; 1] = ["pdf"];

const TRUNCATION_MARK: &str = "\n[...]";

/// One named reference document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocument {
    /// File name, e.g. `prompt_frameworks.md`.
    pub name: String,
    /// Text content; `None` for documents whose content is not extracted.
    pub content: Option<String>,
}

impl ReferenceDocument {
    /// Creates a text document.
    #[must_use]
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Some(content.into()),
        }
    }

    /// Creates a document known only by name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
        }
    }
}

/// Read-only access to reference documents.
///
/// `list` must be idempotent and free of side effects.
pub trait ReferenceCorpus: Send + Sync {
    /// Returns every document, in a stable order.
    fn list(&self) -> &[ReferenceDocument];
}

/// A corpus held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCorpus {
    documents: Vec<ReferenceDocument>,
}

impl StaticCorpus {
    /// Creates a corpus from documents, sorted by name.
    #[must_use]
    pub fn new(mut documents: Vec<ReferenceDocument>) -> Self {
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Self { documents }
    }

    /// Creates an empty corpus.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if there are no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl ReferenceCorpus for StaticCorpus {
    fn list(&self) -> &[ReferenceDocument] {
        &self.documents
    }
}

/// Loads the reference documents in `dir` (not recursive).
///
/// Markdown and text files are read; PDFs are listed by name. A missing
/// directory yields an empty corpus and a warning.
///
/// # Errors
///
/// Returns a `CorpusError` if the directory or a text file cannot be read.
pub fn load_directory(dir: &Path) -> Result<StaticCorpus, CorpusError> {
    if !dir.is_dir() {
        warn!(
            dir = %dir.display(),
            "Knowledge directory not found, stages will run without reference material"
        );
        return Ok(StaticCorpus::empty());
    }

    let io_err = |path: &Path, source: std::io::Error| CorpusError {
        path: path.display().to_string(),
        source,
    };

    let mut documents = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            let content = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            documents.push(ReferenceDocument::text(name, content));
        } else if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            documents.push(ReferenceDocument::named(name));
        } else {
            debug!(file = %path.display(), "Skipping unsupported reference file");
        }
    }

    let corpus = StaticCorpus::new(documents);
    debug!(dir = %dir.display(), documents = corpus.len(), "Loaded reference corpus");
    Ok(corpus)
}

/// Renders documents as reference material of at most `max_chars` characters.
///
/// Returns `None` when there is nothing to attach.
#[must_use]
pub fn excerpt(documents: &[ReferenceDocument], max_chars: usize) -> Option<String> {
    if documents.is_empty() || max_chars == 0 {
        return None;
    }

    let mut out = String::new();
    for doc in documents {
        let section = match doc.content.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => format!("#### {}\n{text}\n\n", doc.name),
            Some(_) => continue,
            None => format!("#### {}\n(available by name only)\n\n", doc.name),
        };
        out.push_str(&section);
        if out.chars().count() >= max_chars {
            break;
        }
    }

    let out = out.trim_end();
    if out.is_empty() {
        return None;
    }
    if out.chars().count() <= max_chars {
        return Some(out.to_string());
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARK.len());
    let mut truncated: String = out.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARK);
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let corpus = load_directory(&temp.path().join("knowledge")).unwrap();
        assert!(corpus.is_empty());
        assert!(corpus.list().is_empty());
    }

    #[test]
    fn test_load_directory() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b_frameworks.md"), "PECRA, SCQA, RISEN").unwrap();
        fs::write(temp.path().join("a_tips.txt"), "Be specific.").unwrap();
        fs::write(temp.path().join("guide.pdf"), [0x25, 0x50, 0x44, 0x46]).unwrap();
        fs::write(temp.path().join("image.png"), [0x89]).unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();

        let corpus = load_directory(temp.path()).unwrap();
        let names: Vec<&str> = corpus.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a_tips.txt", "b_frameworks.md", "guide.pdf"]);
        assert_eq!(corpus.list()[2].content, None);

        // Idempotent.
        assert_eq!(corpus.list(), corpus.list());
    }

    #[test]
    fn test_excerpt() {
        let docs = vec![
            ReferenceDocument::text("a.md", "alpha"),
            ReferenceDocument::text("blank.md", "   "),
            ReferenceDocument::named("c.pdf"),
        ];
        let text = excerpt(&docs, 1000).unwrap();
        assert_eq!(
            text,
            "#### a.md\nalpha\n\n#### c.pdf\n(available by name only)"
        );

        assert_eq!(excerpt(&[], 1000), None);
        assert_eq!(excerpt(&docs, 0), None);
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let docs = vec![ReferenceDocument::text("long.md", "x".repeat(500))];
        let text = excerpt(&docs, 100).unwrap();
        assert_eq!(text.chars().count(), 100);
        assert!(text.ends_with("[...]"));
    }
}
