//! Applies host messages to the mirrored editor state and the engine.

use std::sync::Arc;

use fixtrace_core::host::language_for_path;
use fixtrace_core::{Document, EngineHandle, InMemoryHost, Signal};
use tracing::debug;

use crate::protocol::HostMessage;

pub struct Bridge {
    host: Arc<InMemoryHost>,
    engine: EngineHandle,
}

impl Bridge {
    pub fn new(host: Arc<InMemoryHost>, engine: EngineHandle) -> Self {
        Self { host, engine }
    }

    /// Host state is updated before the matching signal is sent, so the
    /// engine always observes the state the signal describes.
    pub fn apply(&self, message: HostMessage) {
        match message {
            HostMessage::Open { file, language, text } => {
                let language = language.unwrap_or_else(|| language_for_path(&file));
                self.host.open(Document { path: file, language, text });
            }
            HostMessage::Change { file, text, changes } => {
                if let Some(text) = text {
                    if !self.host.update_text(&file, text) {
                        debug!(file = %file.display(), "change for a document that is not open");
                    }
                }
                self.engine.signal(Signal::BufferChanged { file, changes: changes.len() });
            }
            HostMessage::Close { file } => self.host.close(&file),
            HostMessage::Diagnostics { files } => {
                let paths = files.iter().map(|f| f.file.clone()).collect();
                for entry in files {
                    self.host.set_diagnostics(entry.file, entry.diagnostics);
                }
                self.engine.signal(Signal::DiagnosticsChanged { files: paths });
            }
            HostMessage::Log { text } => self.engine.signal(Signal::LogOutput { text }),
            HostMessage::WillSave { file, text } => {
                self.engine.signal(Signal::WillSave { file, text })
            }
            HostMessage::DidSave { file, text } => {
                self.host.update_text(&file, text.clone());
                self.engine.signal(Signal::DidSave { file, text });
            }
            HostMessage::Track { file } => self.engine.start_tracking(file),
            HostMessage::Untrack => self.engine.stop_tracking(),
            HostMessage::Roots { roots } => self.host.set_roots(roots),
        }
    }
}
