/// `/chat/completions`
pub mod chat;
/// `/models`
pub mod models;

pub use chat::Chat;
pub use models::Models;
