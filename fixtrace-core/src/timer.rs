//! Debounce timers and the per-session emission gate.
//!
//! Timers are plain tokio tasks that sleep and then post a message back into
//! the engine inbox. Cancelling aborts the task, but a firing may already be
//! queued in the inbox by then, so every firing carries the generation it was
//! scheduled with and the owner checks it with [`DebounceTimer::accept`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// One-shot gate shared by every detection path of a tracking session.
///
/// The first path to produce a diff closes it; everything that checks the
/// gate afterwards, including timer tasks still sleeping, becomes a no-op.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    closed: Arc<AtomicBool>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Closes the gate. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

/// A restartable delay with at most one pending firing.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, generation: 0, pending: None }
    }

    /// (Re)starts the countdown. Any earlier pending firing is cancelled.
    ///
    /// After `delay`, if `gate` is still open, `fire(generation)` is sent on
    /// `tx`. Returns the generation of the new countdown.
    pub fn schedule<M, F>(&mut self, tx: &UnboundedSender<M>, gate: &SessionGate, fire: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        let tx = tx.clone();
        let gate = gate.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if gate.is_open() {
                let _ = tx.send(fire(generation));
            }
        }));
        generation
    }

    /// Aborts the pending countdown, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// `true` between [`schedule`](Self::schedule) and the accepted firing
    /// or [`cancel`](Self::cancel).
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consumes a firing. Returns `false` for a firing from a countdown that
    /// was since rescheduled or cancelled.
    pub fn accept(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
