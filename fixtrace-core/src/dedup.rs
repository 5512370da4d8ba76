//! Short-lived ledger of recently emitted errors.
//!
//! The ledger has no background sweep. Every lookup first evicts entries older
//! than the window, so its size is bounded by the number of distinct errors
//! emitted within one window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    file: PathBuf,
    line: Option<u32>,
    message: String,
}

impl DedupKey {
    pub fn new(file: PathBuf, line: Option<u32>, message: String) -> Self {
        Self { file, line, message }
    }
}

/// Emission times of recent errors, keyed by `(file, line, message)`.
#[derive(Debug)]
pub struct DedupLedger {
    window: Duration,
    last_emitted: HashMap<DedupKey, Instant>,
}

impl DedupLedger {
    pub fn new(window: Duration) -> Self {
        Self { window, last_emitted: HashMap::new() }
    }

    /// Returns `true` if `key` should fire at `now`, recording the emission.
    ///
    /// A key seen less than one window ago is a duplicate and returns `false`
    /// without refreshing its timestamp, so a steady stream of repeats fires
    /// again once per window.
    pub fn check_and_record(&mut self, key: DedupKey, now: Instant) -> bool {
        let window = self.window;
        self.last_emitted
            .retain(|_, emitted| now.saturating_duration_since(*emitted) < window);
        if self.last_emitted.contains_key(&key) {
            return false;
        }
        self.last_emitted.insert(key, now);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_emitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(line: u32, message: &str) -> DedupKey {
        DedupKey::new(PathBuf::from("/w/app.ts"), Some(line), message.to_owned())
    }

    #[test]
    fn repeat_inside_window_is_suppressed() {
        let mut ledger = DedupLedger::new(Duration::from_millis(2000));
        let t0 = Instant::now();
        assert!(ledger.check_and_record(key(3, "boom"), t0));
        assert!(!ledger.check_and_record(key(3, "boom"), t0 + Duration::from_millis(1999)));
        assert!(ledger.check_and_record(key(3, "boom"), t0 + Duration::from_millis(2001)));
    }

    #[test]
    fn suppressed_repeat_does_not_extend_the_window() {
        let mut ledger = DedupLedger::new(Duration::from_millis(2000));
        let t0 = Instant::now();
        assert!(ledger.check_and_record(key(3, "boom"), t0));
        assert!(!ledger.check_and_record(key(3, "boom"), t0 + Duration::from_millis(1500)));
        assert!(ledger.check_and_record(key(3, "boom"), t0 + Duration::from_millis(2100)));
    }

    #[test]
    fn any_key_component_makes_a_new_occurrence() {
        let mut ledger = DedupLedger::new(Duration::from_millis(2000));
        let t0 = Instant::now();
        assert!(ledger.check_and_record(key(3, "boom"), t0));
        assert!(ledger.check_and_record(key(4, "boom"), t0));
        assert!(ledger.check_and_record(key(3, "bang"), t0));
        assert!(ledger.check_and_record(
            DedupKey::new(PathBuf::from("/w/other.ts"), Some(3), "boom".to_owned()),
            t0
        ));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn stale_entries_are_evicted_on_lookup() {
        let mut ledger = DedupLedger::new(Duration::from_millis(2000));
        let t0 = Instant::now();
        for line in 0..50 {
            ledger.check_and_record(key(line, "boom"), t0);
        }
        assert_eq!(ledger.len(), 50);
        ledger.check_and_record(key(999, "late"), t0 + Duration::from_secs(5));
        assert_eq!(ledger.len(), 1);
    }
}
