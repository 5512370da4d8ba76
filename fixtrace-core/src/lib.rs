//! fixtrace-core: correlates editor signals into "a bug appeared" and
//! "a fix was applied" events.
//!
//! Two state machines do the work:
//!
//! - the [`error_detector`] turns diagnostics and raw process output into
//!   deduplicated [`CapturedError`] records;
//! - the [`fix_detector`] watches one file per tracking session and emits a
//!   single [`CapturedDiff`] once that file's content meaningfully changes.
//!
//! The [`engine`] owns both, plus the [`correlator`] that connects them, and
//! processes every signal, timer firing, and completed read one at a time on a
//! single tokio task. Hosts (editor bridges, tests) feed it through an
//! [`EngineHandle`] and implement the [`Host`] trait to expose open documents,
//! diagnostics, and workspace roots.

pub mod config;
pub mod context;
pub mod correlator;
pub mod dedup;
pub mod diff;
pub mod engine;
pub mod error;
pub mod error_detector;
pub mod fix_detector;
pub mod host;
pub mod log_matcher;
pub mod signal;
pub mod timer;
pub mod types;

pub use config::DetectorConfig;
pub use engine::{Engine, EngineEvent, EngineHandle};
pub use error::{ConfigError, DetectorError};
pub use host::{Document, Host, InMemoryHost};
pub use signal::{Diagnostic, Position, Range, Severity, Signal};
pub use types::{CapturedDiff, CapturedError, ErrorSource, FixReview};
