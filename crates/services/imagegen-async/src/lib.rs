//! Async image generation client.
//!
//! Two backends share one result shape: URL-template providers, where the
//! fetchable URL is the result, and inference-API providers that return raw
//! image bytes. URL endpoints are retried with linear backoff and failed over
//! in order.

/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
/// Prompt enhancement
pub mod enhance;
/// Error types
pub mod error;
/// API resource implementations
pub mod resources;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Request and response types
pub mod types;

pub use crate::client::Client;
pub use crate::config::ImageConfig;
pub use crate::error::ImageError;
pub use crate::types::{GeneratedImage, ImageProvider, ImageRequest};
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::{Client, ImageConfig, ImageError};
}
