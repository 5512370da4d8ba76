//! Shared fixtures: a scripted host and helpers for driving a paused-clock
//! engine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use fixtrace_core::host::language_for_path;
use fixtrace_core::{
    DetectorConfig, DetectorError, Diagnostic, Document, Engine, EngineEvent, EngineHandle, Host,
    Position, Range, Severity,
};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct State {
    open: HashMap<PathBuf, Document>,
    disk: HashMap<PathBuf, String>,
    diagnostics: HashMap<PathBuf, Vec<Diagnostic>>,
    roots: Vec<PathBuf>,
    read_delay: Duration,
    broken_diagnostics: Option<PathBuf>,
}

/// A host whose "disk" is a map, so reads complete without real I/O.
///
/// Reads can be slowed down on the (paused) tokio clock, and the diagnostics
/// provider can be made to panic for one file.
#[derive(Default)]
pub struct ScriptedHost {
    state: Mutex<State>,
}

impl ScriptedHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self, path: &str, language: &str, text: &str) {
        let path = PathBuf::from(path);
        self.state.lock().unwrap().open.insert(
            path.clone(),
            Document { path, language: language.to_owned(), text: text.to_owned() },
        );
    }

    pub fn edit(&self, path: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        let document = state.open.get_mut(Path::new(path)).expect("document is open");
        document.text = text.to_owned();
    }

    pub fn write_disk(&self, path: &str, text: &str) {
        self.state.lock().unwrap().disk.insert(PathBuf::from(path), text.to_owned());
    }

    pub fn set_diagnostics(&self, path: &str, diagnostics: Vec<Diagnostic>) {
        self.state.lock().unwrap().diagnostics.insert(PathBuf::from(path), diagnostics);
    }

    pub fn set_roots(&self, roots: &[&str]) {
        self.state.lock().unwrap().roots = roots.iter().map(PathBuf::from).collect();
    }

    /// Every later disk read resolves `ms` after it was issued. The content
    /// is captured when the read starts.
    pub fn delay_reads(&self, ms: u64) {
        self.state.lock().unwrap().read_delay = Duration::from_millis(ms);
    }

    /// Makes `diagnostics(path)` panic.
    pub fn break_diagnostics(&self, path: &str) {
        self.state.lock().unwrap().broken_diagnostics = Some(PathBuf::from(path));
    }
}

impl Host for ScriptedHost {
    fn open_document(&self, path: &Path) -> Option<Document> {
        self.state.lock().unwrap().open.get(path).cloned()
    }

    fn diagnostics(&self, path: &Path) -> Vec<Diagnostic> {
        let state = self.state.lock().unwrap();
        if state.broken_diagnostics.as_deref() == Some(path) {
            // Release the lock first so the panic does not poison it.
            drop(state);
            panic!("diagnostics provider crashed for {}", path.display());
        }
        state.diagnostics.get(path).cloned().unwrap_or_default()
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().roots.clone()
    }

    fn file_exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.disk.contains_key(path) || state.open.contains_key(path)
    }

    fn read_document(&self, path: &Path) -> BoxFuture<'static, Result<Document, DetectorError>> {
        let state = self.state.lock().unwrap();
        let delay = state.read_delay;
        let result = match state.disk.get(path) {
            Some(text) => Ok(Document {
                path: path.to_path_buf(),
                language: language_for_path(path),
                text: text.clone(),
            }),
            None => Err(DetectorError::Read {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            }),
        };
        if delay.is_zero() {
            return future::ready(result).boxed();
        }
        async move {
            tokio::time::sleep(delay).await;
            result
        }
        .boxed()
    }
}

pub fn diagnostic(line: u32, message: &str, severity: Severity) -> Diagnostic {
    Diagnostic {
        range: Range {
            start: Position { line, character: 0 },
            end: Position { line, character: 10 },
        },
        message: message.to_owned(),
        severity,
    }
}

/// A severity-error diagnostic on zero-indexed `line`.
pub fn error_at(line: u32, message: &str) -> Diagnostic {
    diagnostic(line, message, Severity::Error)
}

pub fn numbered_source(count: usize) -> String {
    (1..=count).map(|n| format!("const v{n} = {n};")).collect::<Vec<_>>().join("\n")
}

pub fn spawn(host: &Arc<ScriptedHost>) -> (EngineHandle, UnboundedReceiver<EngineEvent>) {
    Engine::spawn(Arc::clone(host), &DetectorConfig::default())
}

/// Lets the engine drain its inbox. Advances the paused clock by 10 ms.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn drain(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn errors(events: &[EngineEvent]) -> Vec<&fixtrace_core::CapturedError> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ErrorDetected(error) => Some(error),
            _ => None,
        })
        .collect()
}

pub fn fixes(events: &[EngineEvent]) -> Vec<&fixtrace_core::FixReview> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::FixDetected(review) => Some(review),
            _ => None,
        })
        .collect()
}
