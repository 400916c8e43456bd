//! Operating mode selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which stage set a run uses.
///
/// `Lean` runs analyze, draft and finalize. `Full` adds research and the
/// critique/validate pair. See [`crate::pipeline::build`] for the exact lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Three-stage path.
    #[default]
    Lean,
    /// Six-stage path with research, critique and validation.
    Full,
}

impl Mode {
    /// Maps the persisted `use_lean_mode` flag to a mode.
    #[must_use]
    pub fn from_lean_flag(use_lean_mode: bool) -> Self {
        if use_lean_mode {
            Self::Lean
        } else {
            Self::Full
        }
    }

    /// Returns the persisted flag value for this mode.
    #[must_use]
    pub fn is_lean(self) -> bool {
        matches!(self, Self::Lean)
    }

    /// Returns the mode name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lean => "lean",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lean" | "speed" => Ok(Self::Lean),
            "full" | "quality" => Ok(Self::Full),
            other => Err(format!("unknown mode '{other}' (expected 'lean' or 'full')")),
        }
    }
}
