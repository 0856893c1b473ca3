use thiserror::Error;

/// Errors returned by a chat turn
#[derive(Debug, Error)]
pub enum ChatError {
    /// Input rejected before anything was sent
    #[error("{0}")]
    Validation(String),

    /// The completion or image service failed after retries
    #[error("{message}")]
    Service {
        /// What went wrong, for display
        message: String,
        /// Underlying client error text
        detail: String,
    },

    /// The message tripped the content filter; nothing was sent
    #[error("message blocked: {reason}")]
    ModerationBlocked {
        /// Category label
        reason: String,
        /// Rewording hint
        suggestion: Option<String>,
    },

    /// Another turn is still running
    #[error("a response is already in progress")]
    Busy,

    /// Local store failure outside auto-save
    #[error(transparent)]
    Store(#[from] nothing_store::StoreError),

    /// The content filter could not be built
    #[error("content filter failed to load: {0}")]
    Moderation(#[from] nothing_moderation::ModerationError),
}

impl From<completion_async::CompletionError> for ChatError {
    fn from(e: completion_async::CompletionError) -> Self {
        match e {
            completion_async::CompletionError::Validation(m) => Self::Validation(m),
            other => Self::Service {
                message: other.user_message().to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl From<imagegen_async::ImageError> for ChatError {
    fn from(e: imagegen_async::ImageError) -> Self {
        match e {
            imagegen_async::ImageError::Validation(m) => Self::Validation(m),
            other => Self::Service {
                message: "Image generation failed. Please try again.".into(),
                detail: other.to_string(),
            },
        }
    }
}
