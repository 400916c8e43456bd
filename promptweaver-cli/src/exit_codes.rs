//! Stable exit codes for promptweaver CLI commands.

/// A document was produced (generated or fallback), or the command succeeded.
pub const OK: i32 = 0;
/// Invalid usage, unreadable input, or a filesystem/config file failure.
pub const FAILURE: i32 = 1;
/// The backend is not configured (missing credential); nothing was generated.
pub const CONFIGURATION: i32 = 2;
