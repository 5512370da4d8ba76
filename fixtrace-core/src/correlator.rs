//! The only place the two detectors meet.
//!
//! Each detected error asks the fix detector to track its file. The error is
//! remembered only when that file is actually being tracked, so the next diff
//! for it can be reviewed against the error. At most one error is held, since
//! at most one file is tracked.

use tracing::debug;

use crate::fix_detector::{FixDetector, TrackOutcome};
use crate::types::{CapturedDiff, CapturedError, FixReview};

#[derive(Debug, Default)]
pub struct Correlator {
    pending: Option<CapturedError>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_error(&mut self, error: &CapturedError, fixes: &mut FixDetector) {
        if !error.has_location() {
            debug!(message = %error.message, "error has no file; nothing to track");
            return;
        }
        match fixes.start_tracking(error.file.clone()) {
            TrackOutcome::Started => self.pending = Some(error.clone()),
            // The in-flight fix still answers the error that started it.
            TrackOutcome::Continued => {
                if self.pending.is_none() {
                    self.pending = Some(error.clone());
                }
            }
            TrackOutcome::Ignored => {}
        }
    }

    /// Forgets the remembered error once its session is stopped.
    pub(crate) fn on_stop_tracking(&mut self) {
        self.pending = None;
    }

    pub(crate) fn on_diff(&mut self, diff: CapturedDiff) -> FixReview {
        let error = self.pending.take().filter(|error| error.file == diff.file);
        FixReview { error, diff }
    }
}
