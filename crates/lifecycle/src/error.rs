//! Error types for lifecycle bookkeeping and config editing.

/// Errors that can occur during ledger persistence and source-list editing.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/serialization error on the configuration document.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error on the ledger state file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration document's root is not a keyed mapping.
    #[error("configuration document is not a mapping")]
    MalformedDocument,

    /// The source-list field exists but is not a list.
    #[error("malformed source list field '{0}'")]
    MalformedSourceList(String),
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
