//! Configuration stored in `promptweaver.toml`.
//!
//! Values resolve in three layers: built-in defaults, the TOML file (a
//! missing file means defaults), then environment overrides. The backend
//! credential only ever comes from the environment and is never written
//! back to disk.

use crate::core::Mode;
use crate::errors::ConfigError;
use crate::pipeline::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "promptweaver.toml";

/// Model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "openrouter/auto";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variables consulted by [`WeaverConfig::apply_env`].
pub mod env {
    /// Backend API key.
    pub const API_KEY: &str = "OPENROUTER_API_KEY";
    /// Model identifier.
    pub const MODEL_ID: &str = "OPENROUTER_MODEL_ID";
    /// `true` selects lean mode, `false` full mode.
    pub const USE_LEAN_MODE: &str = "USE_LEAN_MODE";
    /// Output directory.
    pub const OUTPUT_DIR: &str = "PROMPTWEAVER_OUTPUT_DIR";
    /// Reference corpus directory.
    pub const KNOWLEDGE_DIR: &str = "PROMPTWEAVER_KNOWLEDGE_DIR";
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// `true` runs the lean stage set, `false` the full one.
    pub use_lean_mode: bool,

    /// Whether the final document ends with the execution directive line.
    pub append_directive: bool,

    /// Model identifier. When unset the default model is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Chat-completions API root.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Directory scanned for reference documents.
    pub knowledge_dir: PathBuf,

    /// Directory generated documents are written to.
    pub output_dir: PathBuf,

    /// Dispatch critique and validation concurrently.
    pub concurrent_review: bool,

    /// Upper bound on reference material attached to a grounded stage.
    pub max_reference_chars: usize,

    /// Fixed-delay retry policy for backend calls.
    pub retry: RetryConfig,

    /// Backend credential, read from the environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            use_lean_mode: true,
            append_directive: true,
            model_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            knowledge_dir: PathBuf::from("knowledge"),
            output_dir: PathBuf::from("output"),
            concurrent_review: false,
            max_reference_chars: 12_000,
            retry: RetryConfig::default(),
            api_key: None,
        }
    }
}

impl WeaverConfig {
    /// Loads the file at `path`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if the file cannot be read or parsed, and
    /// `ConfigError::Invalid` if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let cfg = Self::default();
            cfg.validate()?;
            return Ok(cfg);
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let cfg: Self = toml::from_str(&contents).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads the file at `path` and applies process environment overrides.
    ///
    /// # Errors
    ///
    /// See [`WeaverConfig::load`] and [`WeaverConfig::apply_env`].
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = Self::load(path)?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Applies overrides from `lookup`, typically the process environment.
    ///
    /// Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `USE_LEAN_MODE` is not a boolean.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(env::API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(model) = get(env::MODEL_ID) {
            self.model_id = Some(model);
        }
        if let Some(mode) = mode_override(&lookup)? {
            self.use_lean_mode = mode.is_lean();
        }
        if let Some(dir) = get(env::OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(env::KNOWLEDGE_DIR) {
            self.knowledge_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        Ok(())
    }

    /// The selected mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        Mode::from_lean_flag(self.use_lean_mode)
    }

    /// The configured model id, or the default with a warning.
    #[must_use]
    pub fn effective_model_id(&self) -> String {
        match self.model_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                tracing::warn!(
                    default = DEFAULT_MODEL_ID,
                    "{} not set, using the default model",
                    env::MODEL_ID
                );
                DEFAULT_MODEL_ID.to_string()
            }
        }
    }

    /// Atomically writes the configuration to `path` (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` on IO or serialization failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let write_err = |reason: String| ConfigError::Write {
            path: path.display().to_string(),
            reason,
        };

        let mut buf = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        buf.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, buf).map_err(|e| write_err(e.to_string()))?;
        fs::rename(&tmp_path, path).map_err(|e| write_err(e.to_string()))?;
        Ok(())
    }
}

/// Where the effective mode was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSource {
    /// No file and no override; the built-in default applies.
    Default,
    /// The configuration file.
    File,
    /// The `USE_LEAN_MODE` environment variable.
    Environment,
}

impl fmt::Display for ModeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File => write!(f, "config file"),
            Self::Environment => write!(f, "{} environment variable", env::USE_LEAN_MODE),
        }
    }
}

/// Reads the `USE_LEAN_MODE` override from `lookup`. Blank values count as
/// unset.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if the value is not a boolean.
pub fn mode_override<F>(lookup: F) -> Result<Option<Mode>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(flag) = lookup(env::USE_LEAN_MODE)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    parse_bool(&flag).map(|lean| Some(Mode::from_lean_flag(lean))).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "{} must be true or false, got '{flag}'",
            env::USE_LEAN_MODE
        ))
    })
}

/// Resolves the mode a run would use with the file at `path` and the
/// overrides in `lookup`, and reports which layer decided it.
///
/// # Errors
///
/// See [`WeaverConfig::load`] and [`mode_override`].
pub fn resolve_mode<F>(path: &Path, lookup: F) -> Result<(Mode, ModeSource), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = mode_override(lookup)? {
        return Ok((mode, ModeSource::Environment));
    }
    let source = if path.exists() {
        ModeSource::File
    } else {
        ModeSource::Default
    };
    Ok((WeaverConfig::load(path)?.mode(), source))
}

/// Persists the mode flag in the file at `path`, keeping other settings.
///
/// Only the file is touched; environment overrides are not written back.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be loaded or written.
pub fn set_mode(path: &Path, mode: Mode) -> Result<WeaverConfig, ConfigError> {
    let mut cfg = WeaverConfig::load(path)?;
    cfg.use_lean_mode = mode.is_lean();
    cfg.save(path)?;
    tracing::info!(path = %path.display(), mode = %mode, "Updated operating mode");
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim_matches('"').to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_returns_default() {
        let temp = tempfile::tempdir().unwrap();
        let cfg = WeaverConfig::load(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, WeaverConfig::default());
        assert_eq!(cfg.mode(), Mode::Lean);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.delay_ms, 5000);
    }

    #[test]
    fn test_load_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "use_lean_mode = false\nmodel_id = \"anthropic/claude-3.5-sonnet\"\n\n[retry]\ndelay_ms = 10\n",
        )
        .unwrap();

        let cfg = WeaverConfig::load(&path).unwrap();
        assert_eq!(cfg.mode(), Mode::Full);
        assert_eq!(cfg.effective_model_id(), "anthropic/claude-3.5-sonnet");
        assert_eq!(cfg.retry.delay_ms, 10);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!(cfg.append_directive);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);

        fs::write(&path, "use_lean_mode = \"maybe\"").unwrap();
        assert!(matches!(WeaverConfig::load(&path), Err(ConfigError::Load { .. })));

        fs::write(&path, "request_timeout_secs = 0").unwrap();
        assert!(matches!(WeaverConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = WeaverConfig::default();
        cfg.apply_env(lookup(&[
            ("OPENROUTER_API_KEY", "sk-or-123"),
            ("OPENROUTER_MODEL_ID", "meta-llama/llama-3-70b"),
            ("USE_LEAN_MODE", "\"false\""),
            ("PROMPTWEAVER_OUTPUT_DIR", "/tmp/out"),
            ("PROMPTWEAVER_KNOWLEDGE_DIR", "  "),
        ]))
        .unwrap();

        assert_eq!(cfg.api_key.as_deref(), Some("sk-or-123"));
        assert_eq!(cfg.model_id.as_deref(), Some("meta-llama/llama-3-70b"));
        assert_eq!(cfg.mode(), Mode::Full);
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.knowledge_dir, PathBuf::from("knowledge"));
    }

    #[test]
    fn test_env_rejects_bad_mode_flag() {
        let mut cfg = WeaverConfig::default();
        let err = cfg.apply_env(lookup(&[("USE_LEAN_MODE", "sometimes")])).unwrap_err();
        assert!(err.to_string().contains("USE_LEAN_MODE"));
    }

    #[test]
    fn test_default_model_when_unset() {
        let cfg = WeaverConfig::default();
        assert_eq!(cfg.effective_model_id(), DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_save_never_writes_api_key() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join(DEFAULT_CONFIG_FILE);
        let cfg = WeaverConfig {
            api_key: Some("sk-or-secret".into()),
            ..WeaverConfig::default()
        };

        cfg.save(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("sk-or-secret"));
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = WeaverConfig::load(&path).unwrap();
        assert_eq!(loaded.api_key, None);
        assert_eq!(loaded.use_lean_mode, cfg.use_lean_mode);
    }

    #[test]
    fn test_set_mode_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "append_directive = false\n").unwrap();

        let cfg = set_mode(&path, Mode::Full).unwrap();
        assert_eq!(cfg.mode(), Mode::Full);

        let reloaded = WeaverConfig::load(&path).unwrap();
        assert_eq!(reloaded.mode(), Mode::Full);
        assert!(!reloaded.append_directive);

        set_mode(&path, Mode::Lean).unwrap();
        assert_eq!(WeaverConfig::load(&path).unwrap().mode(), Mode::Lean);
    }

    #[test]
    fn test_resolve_mode_reports_source() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);

        assert_eq!(
            resolve_mode(&path, lookup(&[])).unwrap(),
            (Mode::Lean, ModeSource::Default)
        );

        set_mode(&path, Mode::Full).unwrap();
        assert_eq!(
            resolve_mode(&path, lookup(&[("USE_LEAN_MODE", " ")])).unwrap(),
            (Mode::Full, ModeSource::File)
        );
    }

    #[test]
    fn test_env_mode_overrides_saved_mode() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        set_mode(&path, Mode::Full).unwrap();

        let env = lookup(&[("USE_LEAN_MODE", "true")]);
        assert_eq!(
            resolve_mode(&path, &env).unwrap(),
            (Mode::Lean, ModeSource::Environment)
        );

        let mut cfg = WeaverConfig::load(&path).unwrap();
        assert_eq!(cfg.mode(), Mode::Full);
        cfg.apply_env(&env).unwrap();
        assert_eq!(cfg.mode(), Mode::Lean);
        assert_eq!(
            ModeSource::Environment.to_string(),
            "USE_LEAN_MODE environment variable"
        );
    }
}
