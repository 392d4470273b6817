//! Validation-round scheduling engine.
//!
//! Decides when a validation round runs and guarantees at most one round runs
//! at a time:
//! - [`timing`] — fire-timing model (fixed interval or cron expression)
//! - [`round`] — the seam to the external validation routine
//! - [`core`] — the [`core::Scheduler`]: single-flight guard, manual-trigger
//!   mailbox, per-generation fire loops, reconfiguration

pub mod core;
pub mod round;
pub mod timing;

pub use crate::core::{Scheduler, SchedulerHandle};
pub use round::ValidationRound;
pub use timing::TimingSpec;
