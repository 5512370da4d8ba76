//! Detector tuning loaded from TOML.
//!
//! All fields default, so an empty file (or no file at all) yields the stock
//! timings: 2 s dedup window, 500 ms diagnostics debounce, 1500 ms content
//! debounce.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Language identifiers the error detector accepts diagnostics for.
pub const DEFAULT_LANGUAGES: [&str; 4] =
    ["javascript", "typescript", "javascriptreact", "typescriptreact"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Window within which a repeated `(file, line, message)` is suppressed.
    pub dedup_window_ms: u64,
    /// Quiet period after a qualifying diagnostics drop before the fix
    /// detector compares content.
    pub diagnostics_debounce_ms: u64,
    /// Quiet period after a buffer mutation. Must stay longer than
    /// `diagnostics_debounce_ms` so the diagnostics path wins when both are
    /// pending.
    pub content_debounce_ms: u64,
    pub supported_languages: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: 2000,
            diagnostics_debounce_ms: 500,
            content_debounce_ms: 1500,
            supported_languages: DEFAULT_LANGUAGES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl DetectorConfig {
    /// Parses and validates a TOML document. `path` is only used for error
    /// messages.
    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, including when
    /// it does not exist. Use [`DetectorConfig::load_or_default`] to treat a
    /// missing file as "use defaults".
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    /// Like [`DetectorConfig::load`], but a missing file yields the defaults.
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("dedup_window_ms", self.dedup_window_ms),
            ("diagnostics_debounce_ms", self.diagnostics_debounce_ms),
            ("content_debounce_ms", self.content_debounce_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        if self.diagnostics_debounce_ms >= self.content_debounce_ms {
            return Err(ConfigError::InvertedDebounce {
                diagnostics: self.diagnostics_debounce_ms,
                content: self.content_debounce_ms,
            });
        }
        if self.supported_languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        Ok(())
    }

    /// How long an emitted error suppresses identical repeats.
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    /// Quiet period after an error-count drop before comparing content.
    pub fn diagnostics_debounce(&self) -> Duration {
        Duration::from_millis(self.diagnostics_debounce_ms)
    }

    /// Quiet period after the last buffer mutation before comparing content.
    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub(crate) fn language_set(&self) -> HashSet<String> {
        self.supported_languages.iter().cloned().collect()
    }
}

/// Returns the default config file location.
///
/// Prefers `$XDG_CONFIG_HOME/fixtrace/config.toml`; falls back to
/// `~/.config/fixtrace/config.toml` when the env var is absent.
pub fn default_config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("fixtrace").join("config.toml")
}
