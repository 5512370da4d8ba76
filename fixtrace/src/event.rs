//! Event bus for the bridge.
//!
//! Host input is decoded on a background task and sent to the main loop over
//! a tokio unbounded MPSC channel, together with the end-of-input marker.
//! Engine output arrives on the engine's own receiver; the main loop selects
//! over both plus a SIGTERM heartbeat.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{parse_line, HostMessage};

#[derive(Debug)]
pub enum AppEvent {
    /// A decoded message from the host.
    Input(HostMessage),
    /// Input reached EOF or failed; the host is gone.
    InputClosed,
}

/// Holds the sender and receiver ends of the input channel.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads newline-delimited JSON from `reader` until EOF.
///
/// Malformed lines are signal noise: logged at debug and skipped. Send errors
/// are ignored; if the receiver is gone the process is already shutting down.
pub fn spawn_input_task<R>(reader: R, tx: mpsc::UnboundedSender<AppEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Some(message)) => {
                        let _ = tx.send(AppEvent::Input(message));
                    }
                    Ok(None) => {}
                    Err(err) => debug!(error = %err, "skipping malformed input line"),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "input stream failed");
                    break;
                }
            }
        }
        let _ = tx.send(AppEvent::InputClosed);
    });
}

/// Registers a SIGTERM handler that sets the returned flag.
///
/// The handler only performs an atomic store, which is async-signal-safe.
pub fn register_sigterm() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}
