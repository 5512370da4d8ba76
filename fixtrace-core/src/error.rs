use std::path::PathBuf;

/// Failures inside the detectors.
///
/// None of these reach the signal source: the engine logs them and leaves the
/// affected session or ledger as it was, since a later signal will retrigger
/// the same work.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// A document could not be read from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors produced while loading or validating a [`crate::DetectorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error(
        "diagnostics_debounce_ms ({diagnostics}) must be shorter than content_debounce_ms ({content})"
    )]
    InvertedDebounce { diagnostics: u64, content: u64 },

    #[error("supported_languages must not be empty")]
    NoLanguages,
}
