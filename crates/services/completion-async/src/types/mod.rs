/// Chat completion request and response types
pub mod chat;
/// Model listing types
pub mod models;

pub use chat::*;
pub use models::*;
