//! Turns diagnostics and process output into deduplicated [`CapturedError`]s.
//!
//! Two paths feed one shared [`DedupLedger`], so the same bug reported by both
//! diagnostics and a crash trace within the window fires once.
//!
//! - **Diagnostics**: severity-error diagnostics on open documents in a
//!   supported language. Files that are not open are skipped rather than
//!   opened.
//! - **Log output**: the first recognised uncaught-exception shape in a chunk.
//!   A stack frame, when present, is resolved and read on a background task
//!   that posts the finished record back to the engine. Unresolvable
//!   locations degrade to `file = "unknown"` instead of dropping the event.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DetectorConfig;
use crate::context::extract_code_context;
use crate::dedup::DedupLedger;
use crate::engine::EngineMsg;
use crate::host::{language_for_path, resolve_document, Host};
use crate::log_matcher::{match_log_output, resolve_frame_path, LogMatch};
use crate::signal::Severity;
use crate::types::{now_millis, CapturedError, ErrorSource, UNKNOWN};

/// Classifies diagnostics and process output into [`CapturedError`]s,
/// suppressing repeats within the dedup window.
pub struct ErrorDetector {
    host: Arc<dyn Host>,
    ledger: DedupLedger,
    languages: HashSet<String>,
    inbox: UnboundedSender<EngineMsg>,
}

impl ErrorDetector {
    pub(crate) fn new(
        host: Arc<dyn Host>,
        config: &DetectorConfig,
        inbox: UnboundedSender<EngineMsg>,
    ) -> Self {
        Self {
            host,
            ledger: DedupLedger::new(config.dedup_window()),
            languages: config.language_set(),
            inbox,
        }
    }

    /// Classifies the current diagnostics of every file in `files`.
    pub(crate) fn on_diagnostics_changed(&mut self, files: &[PathBuf]) -> Vec<CapturedError> {
        let mut emitted = Vec::new();
        for file in files {
            let diagnostics = self.host.diagnostics(file);
            if !diagnostics.iter().any(|d| d.is_error()) {
                continue;
            }
            let Some(document) = self.host.open_document(file) else {
                debug!(file = %file.display(), "diagnostics for a file that is not open; skipping");
                continue;
            };
            if !self.languages.contains(&document.language) {
                debug!(
                    file = %file.display(),
                    language = %document.language,
                    "unsupported language; skipping"
                );
                continue;
            }
            for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
                let (line, code_context) =
                    anchor_line(&document.text, diagnostic.range.start.line + 1);
                let error = CapturedError {
                    id: Uuid::new_v4(),
                    message: diagnostic.message.clone(),
                    file: file.clone(),
                    line,
                    language: document.language.clone(),
                    code_context,
                    severity: Severity::Error,
                    source: ErrorSource::Diagnostics,
                    timestamp: now_millis(),
                };
                emitted.extend(self.admit(error));
            }
        }
        emitted
    }

    /// Classifies one chunk of process output.
    ///
    /// Returns the error directly when the chunk has no usable stack frame.
    /// Otherwise location resolution runs in the background and the finished
    /// record comes back as [`EngineMsg::LogLocated`].
    pub(crate) fn on_log_output(&mut self, text: &str) -> Option<CapturedError> {
        let matched = match_log_output(text)?;
        let timestamp = now_millis();
        if matched.frame.is_none() {
            return self.admit(unlocated(&matched, timestamp));
        }
        let host = Arc::clone(&self.host);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let error = locate(host, matched, timestamp).await;
            let _ = inbox.send(EngineMsg::LogLocated(error));
        });
        None
    }

    /// Applies dedup to a log-output error whose location has been resolved.
    pub(crate) fn on_log_located(&mut self, error: CapturedError) -> Option<CapturedError> {
        self.admit(error)
    }

    fn admit(&mut self, error: CapturedError) -> Option<CapturedError> {
        if !self.ledger.check_and_record(error.dedup_key(), Instant::now()) {
            debug!(
                file = %error.file.display(),
                line = ?error.line,
                message = %error.message,
                "duplicate error suppressed"
            );
            return None;
        }
        info!(
            file = %error.file.display(),
            line = ?error.line,
            source = ?error.source,
            "error detected"
        );
        Some(error)
    }
}

/// Keeps `line` only if it exists in `text`, paired with its context.
fn anchor_line(text: &str, line: u32) -> (Option<u32>, String) {
    match extract_code_context(text, line) {
        Some(context) => (Some(line), context),
        None => {
            debug!(line, "reported line is not in the file; dropping it");
            (None, String::new())
        }
    }
}

fn unlocated(matched: &LogMatch, timestamp: i64) -> CapturedError {
    CapturedError {
        id: Uuid::new_v4(),
        message: matched.summary(),
        file: PathBuf::from(UNKNOWN),
        line: None,
        language: UNKNOWN.to_owned(),
        code_context: String::new(),
        severity: Severity::Error,
        source: ErrorSource::LogOutput,
        timestamp,
    }
}

async fn locate(host: Arc<dyn Host>, matched: LogMatch, timestamp: i64) -> CapturedError {
    let Some(frame) = matched.frame.as_ref() else {
        return unlocated(&matched, timestamp);
    };
    let Some(path) = resolve_frame_path(host.as_ref(), &frame.path) else {
        debug!(frame = %frame.path, "stack frame did not resolve to a workspace file");
        return unlocated(&matched, timestamp);
    };
    let (language, line, code_context) = match resolve_document(&host, &path).await {
        Ok(document) => {
            let (line, code_context) = anchor_line(&document.text, frame.line);
            (document.language, line, code_context)
        }
        Err(err) => {
            warn!(error = %err, "could not read crash location; emitting without context");
            (language_for_path(&path), Some(frame.line), String::new())
        }
    };
    CapturedError {
        id: Uuid::new_v4(),
        message: matched.summary(),
        file: path,
        line,
        language,
        code_context,
        severity: Severity::Error,
        source: ErrorSource::LogOutput,
        timestamp,
    }
}
