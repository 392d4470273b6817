//! Subscription-source health lifecycle.
//!
//! Tracks per-source consecutive-failure streaks across validation rounds and
//! permanently retires sources that cross a failure threshold:
//! - [`round`] — per-round outcome data model
//! - [`ledger`] — durable failure-streak bookkeeping
//! - [`editor`] — source-list removal from the persisted config document
//! - [`manager`] — per-round orchestration of the above

pub mod editor;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod round;

pub use error::LifecycleError;
pub use ledger::FailureLedger;
pub use manager::LifecycleManager;
pub use round::{Outcome, RoundResult};
