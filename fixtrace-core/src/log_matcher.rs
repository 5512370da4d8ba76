//! Best-effort recognition of uncaught exceptions in raw process output.
//!
//! Only a few well-known shapes are recognised. Anything else is ignored:
//! diagnostics already cover static errors, and this path exists for crashes
//! they never see.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::host::Host;

/// Error-line shapes, tried in order. Each captures `kind` and `message`.
static ERROR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Uncaught TypeError: x is not a function
        // Uncaught (in promise) Error: nope
        r"(?m)^\s*Uncaught\s+(?:\(in promise\)\s+)?(?P<kind>[A-Za-z_$][\w$]*):\s*(?P<message>.+?)\s*$",
        // UnhandledPromiseRejectionWarning: Error: nope
        r"(?m)Unhandled(?:Promise)?Rejection(?:Warning)?:?\s+(?P<kind>(?:[A-Za-z_$][\w$]*)?(?:Error|Exception)):\s*(?P<message>.+?)\s*$",
        // TypeError: Cannot read properties of undefined (reading 'x')
        r"(?m)^\s*(?:\[[^\]\n]*\]\s*)?(?P<kind>(?:[A-Z][\w$]*)?(?:Error|Exception)):\s*(?P<message>.+?)\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("error pattern should compile"))
    .collect()
});

/// `at fn (file:line:col)` or `at file:line:col`.
static STACK_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*at\s+(?:[^\n(]*\()?(?P<path>[^\s()]+?):(?P<line>\d+):(?P<col>\d+)\)?\s*$")
        .expect("stack frame pattern should compile")
});


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub path: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatch {
    pub kind: String,
    pub message: String,
    /// First user-code frame after the error line, if any.
    pub frame: Option<StackFrame>,
}

impl LogMatch {
    /// `"<Kind>: <message>"`, the text recorded on the captured error.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// Classifies one output chunk. Returns `None` when no pattern matches.
pub fn match_log_output(text: &str) -> Option<LogMatch> {
    ERROR_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(text)?;
        let whole = captures.get(0)?;
        Some(LogMatch {
            kind: captures["kind"].to_owned(),
            message: captures["message"].to_owned(),
            frame: first_user_frame(&text[whole.end()..]),
        })
    })
}

fn first_user_frame(text: &str) -> Option<StackFrame> {
    STACK_FRAME.captures_iter(text).find_map(|captures| {
        let raw = &captures["path"];
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        if is_runtime_frame(path) {
            return None;
        }
        Some(StackFrame {
            path: path.to_owned(),
            line: captures["line"].parse().ok()?,
            column: captures["col"].parse().ok()?,
        })
    })
}

/// Frames inside the runtime or installed dependencies, never user code.
fn is_runtime_frame(path: &str) -> bool {
    path.starts_with("node:")
        || path.starts_with("internal/")
        || path.starts_with("node_modules/")
        || path.contains("/node_modules/")
}

/// Maps a stack-frame path to an existing file.
///
/// Tries the path itself when it is absolute, then each workspace root joined
/// with it, in root order. Returns `None` if nothing exists.
pub fn resolve_frame_path(host: &dyn Host, raw: &str) -> Option<PathBuf> {
    let candidate = Path::new(raw);
    if candidate.is_absolute() && host.file_exists(candidate) {
        return Some(candidate.to_path_buf());
    }
    host.workspace_roots()
        .into_iter()
        .map(|root| root.join(candidate))
        .find(|joined| host.file_exists(joined))
}
