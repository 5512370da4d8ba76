//! Inbound signal contract supplied by the host editor.
//!
//! The detectors never talk to an editor directly. A host adapter converts
//! whatever its editor reports into [`Signal`] values and exposes document
//! text and diagnostics through [`crate::Host`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A zero-indexed line/character position, as editors report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Diagnostic severity.
///
/// Decoded from the editor's integer code (`0` = error through `3` = hint).
/// Serialized as a lowercase name in outbound events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "u8")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, String> {
        match code {
            0 => Ok(Severity::Error),
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Information),
            3 => Ok(Severity::Hint),
            other => Err(format!("unknown diagnostic severity {other}")),
        }
    }
}

/// One compiler or linter issue attached to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Number of severity-error diagnostics in `diagnostics`.
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

/// Raw events pushed by the host into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Diagnostics changed for these files; fetch them through the host.
    DiagnosticsChanged { files: Vec<PathBuf> },
    /// A chunk of process or log output. Chunks need not align with lines.
    LogOutput { text: String },
    /// The buffer for `file` was mutated. Only a non-zero `changes` count
    /// matters; the edits themselves are irrelevant to the detectors.
    BufferChanged { file: PathBuf, changes: usize },
    /// `file` is about to be saved; `text` is its pre-save content.
    WillSave { file: PathBuf, text: String },
    /// `file` was saved; `text` is its post-save content.
    DidSave { file: PathBuf, text: String },
}
