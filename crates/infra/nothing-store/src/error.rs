use thiserror::Error;

/// Errors raised by the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Atomic write error: {0}")]
    AtomicWrite(String),

    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    #[error("Stored value for '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    #[error("Import failed: {0}")]
    Import(String),
}
