//! Seam to the external validation routine.

use async_trait::async_trait;

use subguard_lifecycle::RoundResult;

/// One complete validation pass over all currently configured sources.
///
/// Implementations own their retry policy: transient per-source faults must
/// be reported as outcomes, not errors. A returned error means the round is
/// unrecoverable, and the scheduler terminates the process.
#[async_trait]
pub trait ValidationRound: Send + Sync {
    async fn run(&self) -> anyhow::Result<RoundResult>;
}
