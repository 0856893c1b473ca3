//! Local persistence for NothingAI.
//!
//! A small namespaced key-value store on disk holding the conversation list,
//! the active conversation pointer, license state and the device id, plus
//! JSON/Markdown export and JSON import of conversations.

pub mod error;
pub mod export;
pub mod model;
pub mod store;

pub use error::StoreError;
pub use export::{ExportFormat, export_conversations, parse_import};
pub use model::{
    AttachedImage, Conversation, ConversationSettings, GeneratedImageRef, ImageProviderSetting,
    Message, Role, derive_title, generate_id,
};
pub use store::Store;
