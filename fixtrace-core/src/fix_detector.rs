//! Watches one file for the next meaningful content change.
//!
//! A tracking session captures a "before" snapshot and the file's
//! severity-error count, then races three detection paths:
//!
//! 1. **Save**: `will-save` refreshes the snapshot; `did-save` with different
//!    content emits immediately.
//! 2. **Diagnostics**: a drop below the initial error count (re)starts the
//!    short debounce.
//! 3. **Content change**: any non-empty buffer mutation (re)starts the long
//!    debounce.
//!
//! Both debounces share the session's [`SessionGate`]. The first path that
//! finds a real difference closes it and ends the session, which cancels
//! whatever is still pending. A debounce that finds identical content leaves
//! the session open.
//!
//! Re-tracking the tracked file restarts the session only when no fix is in
//! flight. While a debounce is pending or its content read is outstanding,
//! the existing session and its snapshot are kept.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::diff::unified_diff;
use crate::engine::EngineMsg;
use crate::error::DetectorError;
use crate::host::{language_for_path, resolve_document, Document, Host};
use crate::signal::error_count;
use crate::timer::{DebounceTimer, SessionGate};
use crate::types::{now_millis, CapturedDiff};

/// What [`FixDetector::start_tracking`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A new session began from a fresh snapshot.
    Started,
    /// The file was already tracked with a fix in flight; that session goes on.
    Continued,
    /// A different file is tracked.
    Ignored,
}

/// Which debounced path produced a timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Diagnostics,
    ContentChange,
}

struct TrackingSession {
    id: u64,
    file: PathBuf,
    language: String,
    before: Option<String>,
    initial_issue_count: usize,
    gate: SessionGate,
    diagnostics_timer: DebounceTimer,
    content_timer: DebounceTimer,
    /// A debounce fired and the current content is being read.
    resolving: bool,
}

impl TrackingSession {
    fn fix_in_flight(&self) -> bool {
        self.diagnostics_timer.is_pending() || self.content_timer.is_pending() || self.resolving
    }

    fn timer_mut(&mut self, trigger: Trigger) -> &mut DebounceTimer {
        match trigger {
            Trigger::Diagnostics => &mut self.diagnostics_timer,
            Trigger::ContentChange => &mut self.content_timer,
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        // Timers abort themselves on drop; closing the gate also stops a
        // countdown that is mid-wakeup.
        self.gate.close();
    }
}

/// Tracks at most one file and reports the first real change to it.
///
/// Owned by the engine loop; timers and background reads report back through
/// the engine inbox as [`EngineMsg`]s tagged with the session id.
pub struct FixDetector {
    host: Arc<dyn Host>,
    inbox: UnboundedSender<EngineMsg>,
    diagnostics_delay: Duration,
    content_delay: Duration,
    session: Option<TrackingSession>,
    next_session_id: u64,
}

impl FixDetector {
    pub(crate) fn new(
        host: Arc<dyn Host>,
        config: &DetectorConfig,
        inbox: UnboundedSender<EngineMsg>,
    ) -> Self {
        Self {
            host,
            inbox,
            diagnostics_delay: config.diagnostics_debounce(),
            content_delay: config.content_debounce(),
            session: None,
            next_session_id: 0,
        }
    }

    fn active(&mut self, file: &Path) -> Option<&mut TrackingSession> {
        self.session.as_mut().filter(|s| s.file == file)
    }

    fn active_id(&mut self, id: u64) -> Option<&mut TrackingSession> {
        self.session.as_mut().filter(|s| s.id == id && s.gate.is_open())
    }

    /// Begins watching `file`.
    ///
    /// Ignored while a different file is tracked. Tracking the same file
    /// again restarts the session with a fresh snapshot, unless a fix is in
    /// flight, in which case the current session continues untouched.
    pub(crate) fn start_tracking(&mut self, file: PathBuf) -> TrackOutcome {
        if let Some(current) = self.session.as_ref() {
            if current.file != file {
                debug!(
                    tracked = %current.file.display(),
                    requested = %file.display(),
                    "already tracking another file; ignoring"
                );
                return TrackOutcome::Ignored;
            }
            if current.fix_in_flight() {
                debug!(
                    file = %file.display(),
                    session = current.id,
                    "fix in flight; keeping the current session"
                );
                return TrackOutcome::Continued;
            }
            debug!(file = %file.display(), "restarting tracking session");
        }
        self.session = None;

        self.next_session_id += 1;
        let id = self.next_session_id;
        let initial_issue_count = error_count(&self.host.diagnostics(&file));
        let mut session = TrackingSession {
            id,
            language: language_for_path(&file),
            file: file.clone(),
            before: None,
            initial_issue_count,
            gate: SessionGate::new(),
            diagnostics_timer: DebounceTimer::new(self.diagnostics_delay),
            content_timer: DebounceTimer::new(self.content_delay),
            resolving: false,
        };

        match self.host.open_document(&file) {
            Some(document) => {
                session.language = document.language;
                session.before = Some(document.text);
            }
            None => {
                let read = self.host.read_document(&file);
                let inbox = self.inbox.clone();
                tokio::spawn(async move {
                    let result = read.await;
                    let _ = inbox.send(EngineMsg::SnapshotLoaded { session: id, result });
                });
            }
        }

        info!(
            file = %file.display(),
            session = id,
            initial_issue_count,
            "tracking started"
        );
        self.session = Some(session);
        TrackOutcome::Started
    }

    /// Ends the session and cancels its timers. A no-op when idle.
    pub(crate) fn stop_tracking(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(file = %session.file.display(), session = session.id, "tracking stopped");
        }
    }

    /// Installs a background-read snapshot unless one is already present.
    pub(crate) fn on_snapshot_loaded(
        &mut self,
        id: u64,
        result: Result<Document, DetectorError>,
    ) {
        let Some(session) = self.active_id(id) else {
            return;
        };
        match result {
            // An earlier will-save snapshot wins over a slower disk read.
            Ok(document) if session.before.is_none() => {
                session.language = document.language;
                session.before = Some(document.text);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, session = id, "could not capture before-snapshot");
            }
        }
    }

    /// The content about to be saved becomes the new baseline.
    pub(crate) fn on_will_save(&mut self, file: &Path, text: String) {
        if let Some(session) = self.active(file) {
            session.before = Some(text);
        }
    }

    /// A save is unambiguous, so it emits without debouncing.
    pub(crate) fn on_did_save(&mut self, file: &Path, text: String) -> Option<CapturedDiff> {
        self.active(file)?;
        self.complete(text)
    }

    /// (Re)starts the diagnostics debounce when the tracked file's error
    /// count is below the count seen at session start.
    pub(crate) fn on_diagnostics_changed(&mut self, files: &[PathBuf]) {
        let host = Arc::clone(&self.host);
        let inbox = self.inbox.clone();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !files.iter().any(|f| *f == session.file) {
            return;
        }
        let count = error_count(&host.diagnostics(&session.file));
        if count >= session.initial_issue_count {
            debug!(
                file = %session.file.display(),
                count,
                initial = session.initial_issue_count,
                "error count did not drop"
            );
            return;
        }
        let id = session.id;
        session.diagnostics_timer.schedule(&inbox, &session.gate, move |generation| {
            EngineMsg::TimerFired { session: id, trigger: Trigger::Diagnostics, generation }
        });
    }

    /// (Re)starts the content debounce for a non-empty mutation.
    pub(crate) fn on_buffer_changed(&mut self, file: &Path, changes: usize) {
        if changes == 0 {
            return;
        }
        let inbox = self.inbox.clone();
        let Some(session) = self.active(file) else {
            return;
        };
        let id = session.id;
        session.content_timer.schedule(&inbox, &session.gate, move |generation| {
            EngineMsg::TimerFired { session: id, trigger: Trigger::ContentChange, generation }
        });
    }

    /// Handles a debounce firing: compares current content if it is at hand,
    /// otherwise reads it in the background.
    pub(crate) fn on_timer_fired(
        &mut self,
        id: u64,
        trigger: Trigger,
        generation: u64,
    ) -> Option<CapturedDiff> {
        let host = Arc::clone(&self.host);
        let inbox = self.inbox.clone();
        let session = self.active_id(id)?;
        if !session.timer_mut(trigger).accept(generation) {
            return None;
        }
        debug!(file = %session.file.display(), session = id, ?trigger, "debounce fired");
        if let Some(document) = host.open_document(&session.file) {
            return self.complete(document.text);
        }
        session.resolving = true;
        let read = resolve_document(&host, &session.file);
        tokio::spawn(async move {
            let result = read.await;
            let _ = inbox.send(EngineMsg::ContentResolved { session: id, trigger, result });
        });
        None
    }

    pub(crate) fn on_content_resolved(
        &mut self,
        id: u64,
        trigger: Trigger,
        result: Result<Document, DetectorError>,
    ) -> Option<CapturedDiff> {
        self.active_id(id)?.resolving = false;
        match result {
            Ok(document) => self.complete(document.text),
            Err(err) => {
                warn!(error = %err, session = id, ?trigger, "could not read current content");
                None
            }
        }
    }

    /// Emits a diff if `after` differs from the snapshot, ending the session.
    fn complete(&mut self, after: String) -> Option<CapturedDiff> {
        let session = self.session.as_ref()?;
        let Some(before) = session.before.as_deref() else {
            debug!(file = %session.file.display(), "no before-snapshot yet; session stays open");
            return None;
        };
        if before == after {
            debug!(file = %session.file.display(), "content unchanged; session stays open");
            return None;
        }
        if !session.gate.close() {
            return None;
        }
        let diff = CapturedDiff {
            unified_diff: unified_diff(&session.file, before, &after),
            file: session.file.clone(),
            language: session.language.clone(),
            before_content: before.to_owned(),
            after_content: after,
            timestamp: now_millis(),
        };
        info!(file = %diff.file.display(), session = session.id, "fix detected");
        self.session = None;
        Some(diff)
    }
}
