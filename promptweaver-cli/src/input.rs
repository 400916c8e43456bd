//! Resolving the instruction from arguments, presets or stdin.

use anyhow::{bail, Context, Result};
use promptweaver::presets;
use std::io::{IsTerminal, Read};

/// Picks the instruction from a preset name or an explicit argument.
///
/// Returns `Ok(None)` when neither is given.
pub fn from_args(instruction: Option<String>, preset: Option<&str>) -> Result<Option<String>> {
    if let Some(name) = preset {
        let Some(found) = presets::find(name) else {
            bail!("Unknown preset '{name}'. Run `promptweaver presets` to list them.");
        };
        return Ok(Some(found.instruction.to_string()));
    }
    Ok(instruction)
}

/// Reads the instruction from `reader`, returning `None` if it is blank.
pub fn read_instruction(mut reader: impl Read) -> Result<Option<String>> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("read instruction from stdin")?;
    let trimmed = buf.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Reads the instruction from stdin, prompting when attached to a terminal.
pub fn read_stdin() -> Result<Option<String>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Enter your instruction, then press Ctrl-D:");
    }
    read_instruction(stdin.lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preset_wins() {
        let resolved = from_args(None, Some("micro-saas opportunity")).unwrap();
        assert!(resolved.unwrap().starts_with("Create a highly focused SaaS concept"));
    }

    #[test]
    fn test_unknown_preset() {
        let err = from_args(None, Some("nope")).unwrap_err();
        assert!(err.to_string().contains("Unknown preset 'nope'"));
    }

    #[test]
    fn test_explicit_instruction() {
        assert_eq!(
            from_args(Some("Explain DNS".into()), None).unwrap().as_deref(),
            Some("Explain DNS")
        );
        assert_eq!(from_args(None, None).unwrap(), None);
    }

    #[test]
    fn test_read_instruction() {
        assert_eq!(
            read_instruction("  Explain DNS\n".as_bytes()).unwrap().as_deref(),
            Some("Explain DNS")
        );
        assert_eq!(read_instruction(" \n\t".as_bytes()).unwrap(), None);
    }
}
