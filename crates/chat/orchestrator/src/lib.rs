//! Conversation orchestration for NothingAI.
//!
//! A [`ChatSession`] owns one conversation. Each submission runs as a turn:
//!
//! 1. the user message is appended right away
//! 2. the text is routed to a chat or an image turn ([`intent::classify`])
//! 3. the content filter checks it; a blocked message is removed again
//! 4. the completion client streams a reply into a placeholder message, or
//!    the image client produces a picture
//! 5. the conversation is saved to the local store
//!
//! Only one turn runs at a time. Cancelling a turn removes its placeholder
//! and keeps the user message. Failures remove the placeholder too.
//!
//! ```no_run
//! use nothing_chat::{ChatServices, ChatSession, NoEvents, settings_from_config};
//! use nothing_config::NothingConfig;
//! use nothing_store::Store;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NothingConfig::default();
//! let store = Store::open("/tmp/nothingai")?;
//! let services = ChatServices::from_config(&config, store)?;
//! let session = ChatSession::resume(services, settings_from_config(&config));
//! let outcome = session.submit("What is a tidal bore?", &mut NoEvents).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod intent;
mod logging;
pub mod services;
pub mod session;

pub use completion_async::CancellationToken;
pub use error::ChatError;
pub use events::{ChatEvents, NoEvents};
pub use intent::Intent;
pub use services::{ChatServices, catalog_from_config, settings_from_config};
pub use session::{ChatSession, TurnOutcome, UserInput};
