//! Per-round lifecycle orchestration.
//!
//! After each validation round: update the failure ledger, compute the
//! eviction set, strip evicted sources from the configuration, prune their
//! ledger entries, and persist the ledger.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::{info, warn};

use crate::editor;
use crate::error::Result;
use crate::ledger::FailureLedger;
use crate::round::RoundResult;

/// Composes the failure ledger and source-list editor for one round at a time.
pub struct LifecycleManager {
    config_path: PathBuf,
    state_dir: PathBuf,
    /// Consecutive-failure eviction threshold; `<= 0` disables the lifecycle.
    /// Atomic so a configuration reload can update it while round tasks hold
    /// the manager behind an `Arc`.
    threshold: AtomicI64,
}

impl LifecycleManager {
    /// Create a manager for the given configuration file.
    ///
    /// Ledger state lives in the configuration file's directory.
    pub fn new(config_path: impl Into<PathBuf>, threshold: i64) -> Self {
        let config_path = config_path.into();
        let state_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Self {
            config_path,
            state_dir,
            threshold: AtomicI64::new(threshold),
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Update the eviction threshold after a configuration reload.
    pub fn set_threshold(&self, threshold: i64) {
        let previous = self.threshold.swap(threshold, Ordering::Relaxed);
        if previous != threshold {
            info!(threshold, "eviction threshold updated");
        }
    }

    /// Process one round's outcomes; returns the sources evicted this round.
    ///
    /// No-op when eviction is disabled or the round produced no outcomes.
    /// A config-edit failure is logged and returned, but the ledger is still
    /// persisted first so the updated streaks survive a restart.
    pub fn process(&self, round: &RoundResult) -> Result<Vec<String>> {
        let threshold = self.threshold();
        if threshold <= 0 || round.is_empty() {
            return Ok(Vec::new());
        }

        let mut ledger = FailureLedger::load(&self.state_dir);
        for (source, outcome) in round.iter() {
            ledger.record_outcome(source, outcome.is_failure());
        }

        let to_evict = ledger.sources_at_or_above(threshold);
        let mut removal_error = None;

        if !to_evict.is_empty() {
            warn!(
                count = to_evict.len(),
                sources = ?to_evict,
                threshold,
                "sources crossed the failure threshold, evicting"
            );
            match editor::remove_sources(&self.config_path, &to_evict) {
                Ok(removed) => {
                    ledger.forget(&to_evict);
                    info!(removed, "evicted sources removed from configuration");
                }
                Err(e) => {
                    warn!(error = %e, "failed to remove evicted sources from configuration");
                    removal_error = Some(e);
                }
            }
        }

        // Streak counts must survive a restart even when nothing was evicted.
        ledger.persist(&self.state_dir)?;

        match removal_error {
            Some(e) => Err(e),
            None => Ok(to_evict),
        }
    }
}
