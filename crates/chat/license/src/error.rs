use thiserror::Error;

/// Errors raised by license backends and the gate
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Local store failure
    #[error("license store error: {0}")]
    Store(#[from] nothing_store::StoreError),

    /// Transport failure talking to the remote backend
    #[error("license service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote backend answered with an error status
    #[error("license service returned {status}: {message}")]
    Remote {
        /// HTTP status
        status: u16,
        /// Body excerpt
        message: String,
    },

    /// Payload could not be decoded
    #[error("malformed license data: {0}")]
    Serde(String),

    /// Backend misconfigured
    #[error("license configuration error: {0}")]
    Config(String),

    /// Admin request rejected before reaching the backend
    #[error("invalid license request: {0}")]
    Validation(String),

    /// Key does not exist (admin operations)
    #[error("license key not found: {0}")]
    NotFound(String),
}
