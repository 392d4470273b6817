//! Durable per-source consecutive-failure bookkeeping.
//!
//! The ledger is a flat map from source identifier to consecutive-failure
//! count, persisted as JSON next to the configuration file so streaks survive
//! process restarts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Ledger persistence filename, stored in the configuration file's directory.
pub const STATE_FILE: &str = "subs_state.json";

/// Per-source consecutive-failure counts.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FailureLedger {
    fail_counts: HashMap<String, u32>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted state from `state_dir`.
    ///
    /// A missing, unreadable, or unparsable state file yields an empty
    /// ledger: damaged state must never block a validation round.
    pub fn load(state_dir: &Path) -> Self {
        let path = state_dir.join(STATE_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no ledger state file, starting empty");
            return Self::new();
        }

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read ledger state, starting empty");
                return Self::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse ledger state, starting empty");
                Self::new()
            }
        }
    }

    /// Record one round's outcome for a source.
    ///
    /// A failure increments the streak by exactly 1; a success resets it to
    /// 0 (a reset from a positive streak is logged as recovery).
    pub fn record_outcome(&mut self, source: &str, failed: bool) {
        if failed {
            let count = self.fail_counts.entry(source.to_string()).or_insert(0);
            *count += 1;
            debug!(source = %source, count = *count, "source failure recorded");
        } else {
            if self.count(source) > 0 {
                debug!(source = %source, "source recovered, failure streak reset");
            }
            self.fail_counts.insert(source.to_string(), 0);
        }
    }

    /// Every source whose streak is at or above `threshold`.
    ///
    /// A threshold of 0 or less never matches (eviction disabled).
    pub fn sources_at_or_above(&self, threshold: i64) -> Vec<String> {
        if threshold <= 0 {
            return Vec::new();
        }
        self.fail_counts
            .iter()
            .filter(|(_, &count)| i64::from(count) >= threshold)
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Delete the named entries entirely, so a re-added source starts clean.
    pub fn forget(&mut self, sources: &[String]) {
        for source in sources {
            if self.fail_counts.remove(source).is_some() {
                debug!(source = %source, "cleared failure streak after eviction");
            }
        }
    }

    /// Persist the full mapping to `state_dir`.
    ///
    /// Writes to a `.tmp` file first, then renames, so a crash mid-write
    /// leaves the previous good copy intact.
    pub fn persist(&self, state_dir: &Path) -> Result<()> {
        let final_path = state_dir.join(STATE_FILE);
        let tmp_path = state_dir.join(format!(".{}.tmp", STATE_FILE));

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Current streak for a source (0 if unknown).
    pub fn count(&self, source: &str) -> u32 {
        self.fail_counts.get(source).copied().unwrap_or(0)
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.fail_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fail_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn increment_and_reset() {
        let mut ledger = FailureLedger::new();
        ledger.record_outcome("a", true);
        ledger.record_outcome("a", true);
        assert_eq!(ledger.count("a"), 2);

        ledger.record_outcome("a", false);
        assert_eq!(ledger.count("a"), 0);

        ledger.record_outcome("a", true);
        assert_eq!(ledger.count("a"), 1);
    }

    #[test]
    fn threshold_matching() {
        let mut ledger = FailureLedger::new();
        for _ in 0..3 {
            ledger.record_outcome("a", true);
        }
        ledger.record_outcome("b", true);

        let evict = ledger.sources_at_or_above(3);
        assert_eq!(evict, vec!["a".to_string()]);
    }

    #[test]
    fn zero_threshold_never_matches() {
        let mut ledger = FailureLedger::new();
        for _ in 0..10 {
            ledger.record_outcome("a", true);
        }
        assert!(ledger.sources_at_or_above(0).is_empty());
        assert!(ledger.sources_at_or_above(-1).is_empty());
    }

    #[test]
    fn forget_wipes_history() {
        let mut ledger = FailureLedger::new();
        for _ in 0..3 {
            ledger.record_outcome("a", true);
        }
        ledger.forget(&["a".to_string()]);
        assert_eq!(ledger.count("a"), 0);
        assert!(ledger.is_empty());

        // A re-added source starts a fresh streak.
        ledger.record_outcome("a", true);
        assert_eq!(ledger.count("a"), 1);
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = FailureLedger::new();
        ledger.record_outcome("a", true);
        ledger.record_outcome("b", true);
        ledger.record_outcome("b", true);
        ledger.persist(dir.path()).unwrap();

        let loaded = FailureLedger::load(dir.path());
        assert_eq!(loaded.count("a"), 1);
        assert_eq!(loaded.count("b"), 2);
    }

    #[test]
    fn persisted_shape_matches_state_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = FailureLedger::new();
        ledger.record_outcome("https://x.example/sub", true);
        ledger.persist(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join(STATE_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["fail_counts"]["https://x.example/sub"], 1);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::load(dir.path());
        assert!(ledger.is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();
        let ledger = FailureLedger::load(dir.path());
        assert!(ledger.is_empty());
    }
}
