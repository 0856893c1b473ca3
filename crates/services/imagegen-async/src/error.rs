use thiserror::Error;

/// Errors that can occur when generating images
#[derive(Debug, Error)]
pub enum ImageError {
    /// Request rejected before any network call; never retried
    #[error("Invalid image request: {0}")]
    Validation(String),

    /// Every attempt on every endpoint failed
    #[error("Image service failed after {attempts} attempts: {message}")]
    Service {
        /// Attempts made across all endpoints
        attempts: u32,
        /// Failure of the final attempt
        message: String,
    },

    /// Configuration error (e.g., missing credentials)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client construction or request building failed
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The caller cancelled the request
    #[error("Image generation cancelled")]
    Cancelled,
}

/// Why a single attempt failed; folded into [`ImageError::Service`]
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    /// Connect error, reset, or timeout
    Transport(String),
    /// Non-2xx status
    Status {
        /// HTTP status
        status: u16,
        /// Body excerpt
        message: String,
    },
    /// 2xx without an `image/*` content type
    NotAnImage(String),
    /// 2xx with an empty body
    EmptyBody,
    /// Blob provider is still loading the model
    ModelLoading {
        /// Seconds the provider expects loading to take
        estimated_secs: f64,
    },
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(m) => write!(f, "transport error: {m}"),
            Self::Status { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::NotAnImage(ct) => write!(f, "unexpected content type '{ct}'"),
            Self::EmptyBody => f.write_str("empty image body"),
            Self::ModelLoading { estimated_secs } => {
                write!(f, "model is loading (estimated {estimated_secs:.0}s)")
            }
        }
    }
}

impl ImageError {
    /// Whether the error came from the caller's input
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
