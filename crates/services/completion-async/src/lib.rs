//! Async client for OpenAI-compatible chat completion gateways.
//!
//! Streams tokens over SSE, clamps token budgets per model tier and falls
//! back to a free model when the requested one fails.
//!
//! ```no_run
//! # async fn demo() -> Result<(), completion_async::CompletionError> {
//! use completion_async::prelude::*;
//!
//! let client = Client::new();
//! let req = ChatRequest::new("openai/gpt-4o-mini", vec![ChatMessage::user("Hello")]);
//! let completion = client.chat().create(req).await?;
//! println!("{}", completion.content);
//! # Ok(())
//! # }
//! ```

/// Model catalog and tier limits
pub mod catalog;
/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
/// Error types
pub mod error;
/// Model fallback state machine
pub mod fallback;
/// Streaming callbacks
pub mod handler;
/// API resource implementations
pub mod resources;
/// Retry logic utilities
pub mod retry;
/// SSE decoding
pub mod sse;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Request and response types
pub mod types;

pub use crate::catalog::{ModelCatalog, ModelInfo, ModelTier};
pub use crate::client::Client;
pub use crate::config::CompletionConfig;
pub use crate::error::{ApiErrorObject, CompletionError, ErrorKind};
pub use crate::handler::{StreamHandler, callbacks};
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::{
        CancellationToken, Client, CompletionConfig, ModelCatalog, StreamHandler, callbacks,
    };
}
