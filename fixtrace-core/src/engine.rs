//! The event loop that owns both detectors.
//!
//! Every input (host signals, tracking commands, debounce firings, finished
//! background reads) is normalised into one [`EngineMsg`] and sent over a
//! single unbounded tokio MPSC inbox. One task drains it and handles each
//! message to completion before the next, so detector state needs no locks.
//! Background work only ever reports back through the inbox, and handlers
//! re-check that the session it belongs to is still live before acting.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use crate::config::DetectorConfig;
use crate::correlator::Correlator;
use crate::error::DetectorError;
use crate::error_detector::ErrorDetector;
use crate::fix_detector::{FixDetector, Trigger};
use crate::host::{Document, Host};
use crate::signal::Signal;
use crate::types::{CapturedDiff, CapturedError, FixReview};

/// Outbound notifications. Fire-and-forget: nothing a consumer does with
/// them flows back into the detectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A new, non-duplicate error.
    ErrorDetected(CapturedError),
    /// A tracked file changed, paired with the error that started tracking.
    FixDetected(FixReview),
}

#[derive(Debug)]
pub(crate) enum EngineMsg {
    Signal(Signal),
    StartTracking(PathBuf),
    StopTracking,
    Shutdown,
    /// A log-output error whose stack frame has been resolved (or not).
    LogLocated(CapturedError),
    SnapshotLoaded {
        session: u64,
        result: Result<Document, DetectorError>,
    },
    TimerFired {
        session: u64,
        trigger: Trigger,
        generation: u64,
    },
    ContentResolved {
        session: u64,
        trigger: Trigger,
        result: Result<Document, DetectorError>,
    },
}

/// Cloneable sender side of a running engine.
///
/// Every method is a non-blocking send; after the engine has shut down they
/// silently do nothing.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<EngineMsg>,
}

impl EngineHandle {
    /// Pushes one host signal into the engine.
    pub fn signal(&self, signal: Signal) {
        let _ = self.tx.send(EngineMsg::Signal(signal));
    }

    /// Asks the fix detector to watch `file`, exactly as a detected error
    /// would.
    pub fn start_tracking(&self, file: impl Into<PathBuf>) {
        let _ = self.tx.send(EngineMsg::StartTracking(file.into()));
    }

    /// Ends the current session, cancelling its pending debounces.
    pub fn stop_tracking(&self) {
        let _ = self.tx.send(EngineMsg::StopTracking);
    }

    /// Stops the loop and cancels every pending timer. The event receiver
    /// returns `None` once the engine has finished.
    pub fn shutdown(&self) {
        let _ = self.tx.send(EngineMsg::Shutdown);
    }
}

/// Owns both detectors and the correlator for the lifetime of the loop.
///
/// Never held directly: [`Engine::spawn`] moves it onto its own task and
/// hands back the input and output channel ends.
pub struct Engine {
    errors: ErrorDetector,
    fixes: FixDetector,
    correlator: Correlator,
    inbox: UnboundedReceiver<EngineMsg>,
    events: UnboundedSender<EngineEvent>,
}

impl Engine {
    /// Spawns the engine loop on the current tokio runtime.
    ///
    /// Must be called from within a runtime. Returns the handle for feeding
    /// it and the receiver of detections.
    pub fn spawn<H: Host>(
        host: Arc<H>,
        config: &DetectorConfig,
    ) -> (EngineHandle, UnboundedReceiver<EngineEvent>) {
        let host: Arc<dyn Host> = host;
        let (tx, inbox) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let engine = Engine {
            errors: ErrorDetector::new(Arc::clone(&host), config, tx.clone()),
            fixes: FixDetector::new(host, config, tx.clone()),
            correlator: Correlator::new(),
            inbox,
            events,
        };
        tokio::spawn(engine.run());
        (EngineHandle { tx }, events_rx)
    }

    async fn run(mut self) {
        while let Some(msg) = self.inbox.recv().await {
            if matches!(msg, EngineMsg::Shutdown) {
                break;
            }
            // A handler bug must not take the listener down for the rest of
            // the session.
            if catch_unwind(AssertUnwindSafe(|| self.dispatch(msg))).is_err() {
                error!("signal handler panicked; message dropped");
            }
        }
        self.fixes.stop_tracking();
        debug!("engine stopped");
    }

    fn dispatch(&mut self, msg: EngineMsg) {
        match msg {
            EngineMsg::Signal(signal) => self.on_signal(signal),
            EngineMsg::StartTracking(file) => {
                self.fixes.start_tracking(file);
            }
            EngineMsg::StopTracking => {
                self.fixes.stop_tracking();
                self.correlator.on_stop_tracking();
            }
            EngineMsg::Shutdown => {}
            EngineMsg::LogLocated(error) => {
                if let Some(error) = self.errors.on_log_located(error) {
                    self.publish_error(error);
                }
            }
            EngineMsg::SnapshotLoaded { session, result } => {
                self.fixes.on_snapshot_loaded(session, result)
            }
            EngineMsg::TimerFired { session, trigger, generation } => {
                let diff = self.fixes.on_timer_fired(session, trigger, generation);
                self.publish_diff(diff);
            }
            EngineMsg::ContentResolved { session, trigger, result } => {
                let diff = self.fixes.on_content_resolved(session, trigger, result);
                self.publish_diff(diff);
            }
        }
    }

    fn on_signal(&mut self, signal: Signal) {
        match signal {
            Signal::DiagnosticsChanged { files } => {
                // The fix detector schedules its debounce before any error
                // here reaches the correlator, which then sees a fix in flight
                // and keeps the session.
                self.fixes.on_diagnostics_changed(&files);
                for error in self.errors.on_diagnostics_changed(&files) {
                    self.publish_error(error);
                }
            }
            Signal::LogOutput { text } => {
                if let Some(error) = self.errors.on_log_output(&text) {
                    self.publish_error(error);
                }
            }
            Signal::BufferChanged { file, changes } => self.fixes.on_buffer_changed(&file, changes),
            Signal::WillSave { file, text } => self.fixes.on_will_save(&file, text),
            Signal::DidSave { file, text } => {
                let diff = self.fixes.on_did_save(&file, text);
                self.publish_diff(diff);
            }
        }
    }

    fn publish_error(&mut self, error: CapturedError) {
        self.correlator.on_error(&error, &mut self.fixes);
        let _ = self.events.send(EngineEvent::ErrorDetected(error));
    }

    fn publish_diff(&mut self, diff: Option<CapturedDiff>) {
        if let Some(diff) = diff {
            let review = self.correlator.on_diff(diff);
            let _ = self.events.send(EngineEvent::FixDetected(review));
        }
    }
}
