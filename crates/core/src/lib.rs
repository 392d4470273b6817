//! Shared configuration layer for the subguard daemon.
//!
//! This crate provides:
//! - Typed YAML configuration schema with defaults
//! - Config-file watcher emitting re-parsed configs on change
//! - The crate-level error type

pub mod config;
pub mod error;
pub mod watcher;

pub use config::AppConfig;
pub use error::ConfigError;
pub use watcher::ConfigWatcher;
