//! Persisting generated documents.

use crate::errors::OutputError;
use crate::pipeline::{first_heading, simple_title, DIRECTIVE_LINE};
use chrono::{DateTime, Local};
use md5::{Digest, Md5};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

/// Trailing framework explanations start with this phrase and are dropped.
pub const EXPLANATION_MARKER: &str = "This prompt combines";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";
const MAX_STEM_CHARS: usize = 100;
const MAX_STEM_WORDS: usize = 10;

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*']"#).expect("invalid-char pattern is valid"));

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Writes documents as Markdown files under one directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Creates a writer for `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `document` using the current local time in the file name.
    ///
    /// # Errors
    ///
    /// Returns an `OutputError` if the directory or file cannot be written.
    pub fn save(&self, document: &str, instruction: &str) -> Result<PathBuf, OutputError> {
        self.save_at(document, instruction, Local::now())
    }

    /// Saves `document` with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an `OutputError` if the directory or file cannot be written.
    pub fn save_at(
        &self,
        document: &str,
        instruction: &str,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(&self.dir).map_err(|source| OutputError {
            path: self.dir.display().to_string(),
            source,
        })?;

        let title = document_title(document, instruction);
        let stem = format!(
            "{}_{}",
            sanitize_filename(&title),
            timestamp.format(TIMESTAMP_FORMAT)
        );
        let path = self.unique_path(&stem);

        fs::write(&path, prepare_document(document, &title)).map_err(|source| OutputError {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Prompt saved");
        Ok(path)
    }

    fn unique_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.md"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}-{n}.md"));
            n += 1;
        }
        path
    }
}

/// The title used for naming: the first `# ` heading, else a title derived
/// from the instruction.
#[must_use]
pub fn document_title(document: &str, instruction: &str) -> String {
    first_heading(document).map_or_else(|| simple_title(instruction), str::to_string)
}

/// Builds a file-system safe stem from `title`, suffixed with a short hash.
#[must_use]
pub fn sanitize_filename(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let cleaned = INVALID_CHARS.replace_all(&lowered, "_");
    let words: Vec<&str> = WORD
        .find_iter(&cleaned)
        .take(MAX_STEM_WORDS)
        .map(|m| m.as_str())
        .collect();
    let short: String = words.join("_").chars().take(MAX_STEM_CHARS).collect();

    let digest = Md5::digest(title.as_bytes());
    let hash = hex::encode(digest);
    format!("{short}_{}", &hash[..6])
}

/// Drops a trailing framework explanation and ensures a leading title.
///
/// The explanation is recognized only as a paragraph starting with
/// [`EXPLANATION_MARKER`] that no heading follows. A directive line inside
/// the dropped tail is kept.
#[must_use]
pub fn prepare_document(document: &str, title: &str) -> String {
    let stripped = strip_trailing_explanation(document);
    let clean = stripped.trim();
    if clean.starts_with("# ") {
        format!("{clean}\n")
    } else {
        format!("# {title}\n\n{clean}\n")
    }
}

fn strip_trailing_explanation(document: &str) -> String {
    let lines: Vec<&str> = document.lines().collect();
    let start = (1..lines.len()).find(|&i| {
        lines[i].trim_start().starts_with(EXPLANATION_MARKER)
            && lines[i - 1].trim().is_empty()
            && !lines[i + 1..].iter().any(|l| l.starts_with('#'))
    });
    let Some(start) = start else {
        return document.to_string();
    };

    let mut kept = lines[..start].to_vec();
    if lines[start..].iter().any(|l| l.trim() == DIRECTIVE_LINE) {
        kept.push(DIRECTIVE_LINE);
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        let stem = sanitize_filename("Explain: \"Quantum\" Computing / Basics?");
        assert!(stem.starts_with("explain___quantum__computing___basics_"));

        let hash = stem.rsplit('_').next().unwrap();
        assert_eq!(hash.len(), 6);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sanitize_limits_words_and_length() {
        let stem = sanitize_filename("one two three four five six seven eight nine ten eleven");
        assert!(stem.starts_with("one_two_three_four_five_six_seven_eight_nine_ten_"));
        assert!(!stem.contains("eleven"));

        let long = "a".repeat(300);
        let stem = sanitize_filename(&long);
        assert_eq!(stem.len(), MAX_STEM_CHARS + 7);
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title("# Quantum Basics\nbody", "ignored"), "Quantum Basics");
        assert_eq!(
            document_title("no heading", "plan a wedding. quickly"),
            "Plan A Wedding"
        );
    }

    #[test]
    fn test_prepare_document() {
        assert_eq!(
            prepare_document("# T\n\nBody\n\nThis prompt combines PECRA and SCQA.", "T"),
            "# T\n\nBody\n"
        );
        assert_eq!(prepare_document("Body", "Title"), "# Title\n\nBody\n");
    }

    #[test]
    fn test_prepare_document_keeps_directive_and_inline_mentions() {
        let doc = format!("# T\n\nBody\n\nThis prompt combines PECRA.\nMore detail.\n\n{DIRECTIVE_LINE}");
        assert_eq!(prepare_document(&doc, "T"), format!("# T\n\nBody\n\n{DIRECTIVE_LINE}\n"));

        let doc = "# T\n\nThis prompt combines two audiences.\n\n## Steps\nGo.";
        assert_eq!(prepare_document(doc, "T"), format!("{doc}\n"));

        let doc = format!("# T\n\nWhy? This prompt combines ideas.\n\n{DIRECTIVE_LINE}");
        assert_eq!(prepare_document(&doc, "T"), format!("{doc}\n"));
    }

    #[test]
    fn test_save_at() {
        let temp = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(temp.path().join("output"));

        let path = writer
            .save_at("# Quantum Basics\n\nLearn.", "x", fixed_time())
            .unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("quantum_basics_"));
        assert!(name.ends_with("_2024-05-01T09-30-15.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Quantum Basics\n\nLearn.\n");

        // Same title and second gets a distinct file.
        let second = writer
            .save_at("# Quantum Basics\n\nAgain.", "x", fixed_time())
            .unwrap();
        assert_ne!(second, path);
        assert!(second.exists());
    }

    #[test]
    fn test_save_reports_unwritable_dir() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let writer = OutputWriter::new(blocker.join("output"));
        assert!(writer.save("# T", "x").is_err());
    }
}
