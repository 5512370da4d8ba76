//! Owned event records emitted by the detectors.
//!
//! Every type here is fully owned and `Send` so it can cross from the engine
//! task to whatever consumes the outbound event channel. Records are created
//! once and never mutated afterwards.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use uuid::Uuid;

use crate::dedup::DedupKey;
use crate::signal::Severity;

/// Placeholder used for `file` and `language` when a log-output error could
/// not be mapped to a real file.
pub const UNKNOWN: &str = "unknown";

/// Which signal path produced a [`CapturedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSource {
    /// A severity-error diagnostic on an open, supported document.
    Diagnostics,
    /// An uncaught-exception shape matched in process output.
    LogOutput,
}

/// One detected occurrence of a bug.
///
/// `line` is 1-indexed; `None` stands for "unknown" and occurs when the
/// location could not be resolved or the reported line is not in the file.
/// When `line` is known and the file was readable, `code_context` contains
/// that line (see [`crate::context::extract_code_context`]); otherwise it is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedError {
    pub id: Uuid,
    pub message: String,
    pub file: PathBuf,
    pub line: Option<u32>,
    pub language: String,
    pub code_context: String,
    pub severity: Severity,
    pub source: ErrorSource,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl CapturedError {
    /// Returns `false` for records whose file is the `"unknown"` placeholder.
    pub fn has_location(&self) -> bool {
        self.file != Path::new(UNKNOWN)
    }

    /// The `(file, line, message)` key used for duplicate suppression.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.file.clone(), self.line, self.message.clone())
    }
}

/// The before/after pair for one completed tracking session.
///
/// Never constructed for a no-op change: `before_content != after_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedDiff {
    pub file: PathBuf,
    pub language: String,
    pub before_content: String,
    pub after_content: String,
    pub unified_diff: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

/// A diff paired with the error that started its tracking session, if the
/// correlator still remembered one for that file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixReview {
    pub error: Option<CapturedError>,
    pub diff: CapturedDiff,
}

/// Returns the current Unix timestamp in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
