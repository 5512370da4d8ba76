//! The host contract: how detectors see documents, diagnostics, and roots.
//!
//! A host is whatever sits between the engine and a real editor. It answers
//! synchronous questions about in-memory state (open buffers, current
//! diagnostics) and performs the one asynchronous operation the detectors
//! need, reading a file that is not open.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use crate::error::DetectorError;
use crate::signal::Diagnostic;

/// A document's current text and language identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub language: String,
    pub text: String,
}

pub trait Host: Send + Sync + 'static {
    /// The in-memory document for `path`, if the editor has it open.
    fn open_document(&self, path: &Path) -> Option<Document>;

    /// Current diagnostics for `path`; empty when there are none.
    fn diagnostics(&self, path: &Path) -> Vec<Diagnostic>;

    /// Base paths for resolving relative stack-trace paths, in priority order.
    fn workspace_roots(&self) -> Vec<PathBuf>;

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Reads `path` from disk.
    fn read_document(&self, path: &Path) -> BoxFuture<'static, Result<Document, DetectorError>> {
        read_from_disk(path.to_path_buf()).boxed()
    }
}

/// The open document for `path` if there is one, otherwise a disk read.
///
/// The open-document check happens at call time, so the returned future
/// reflects the buffer as it was when this was called.
pub fn resolve_document(
    host: &Arc<dyn Host>,
    path: &Path,
) -> BoxFuture<'static, Result<Document, DetectorError>> {
    match host.open_document(path) {
        Some(document) => future::ready(Ok(document)).boxed(),
        None => host.read_document(path),
    }
}

pub async fn read_from_disk(path: PathBuf) -> Result<Document, DetectorError> {
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Document { language: language_for_path(&path), path, text }),
        Err(source) => Err(DetectorError::Read { path, source }),
    }
}

/// Infers an editor language identifier from a file extension.
pub fn language_for_path(path: &Path) -> String {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "plaintext".to_owned();
    };
    match ext.to_ascii_lowercase().as_str() {
        "js" | "mjs" | "cjs" => "javascript".to_owned(),
        "jsx" => "javascriptreact".to_owned(),
        "ts" | "mts" | "cts" => "typescript".to_owned(),
        "tsx" => "typescriptreact".to_owned(),
        other => other.to_owned(),
    }
}

/// A [`Host`] backed by maps that a bridge keeps in sync with the editor.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: RwLock<HostState>,
}

#[derive(Debug, Default)]
struct HostState {
    documents: HashMap<PathBuf, Document>,
    diagnostics: HashMap<PathBuf, Vec<Diagnostic>>,
    roots: Vec<PathBuf>,
}

impl InMemoryHost {
    /// An empty host that resolves relative frames against `roots`.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            state: RwLock::new(HostState { roots, ..HostState::default() }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HostState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HostState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds or replaces an open document.
    pub fn open(&self, document: Document) {
        self.write().documents.insert(document.path.clone(), document);
    }

    /// Replaces the text of an open document. Returns `false` if `path` is
    /// not open.
    pub fn update_text(&self, path: &Path, text: String) -> bool {
        match self.write().documents.get_mut(path) {
            Some(document) => {
                document.text = text;
                true
            }
            None => false,
        }
    }

    pub fn close(&self, path: &Path) {
        self.write().documents.remove(path);
    }

    /// Replaces the diagnostics for `path`. An empty list clears them.
    pub fn set_diagnostics(&self, path: PathBuf, diagnostics: Vec<Diagnostic>) {
        let mut state = self.write();
        if diagnostics.is_empty() {
            state.diagnostics.remove(&path);
        } else {
            state.diagnostics.insert(path, diagnostics);
        }
    }

    /// Replaces the workspace roots, keeping their order.
    pub fn set_roots(&self, roots: Vec<PathBuf>) {
        self.write().roots = roots;
    }
}

impl Host for InMemoryHost {
    fn open_document(&self, path: &Path) -> Option<Document> {
        self.read().documents.get(path).cloned()
    }

    fn diagnostics(&self, path: &Path) -> Vec<Diagnostic> {
        self.read().diagnostics.get(path).cloned().unwrap_or_default()
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.read().roots.clone()
    }
}
