//! Static word-list moderation for chat messages and image prompts.
//!
//! Text is normalized (lowercase, diacritics folded, punctuation collapsed)
//! and checked for whole-word matches plus a leetspeak variant of every
//! listed term. An age descriptor next to a clothing/role word blocks on its
//! own. Chat messages are checked against [`Category::CHAT`]; image prompts
//! against [`Category::ALL`].
//!
//! ```
//! use nothing_moderation::ContentModerator;
//!
//! let moderator = ContentModerator::new().unwrap();
//! assert!(!moderator.moderate_image_prompt("a red bicycle").is_blocked);
//! ```

pub mod categories;
pub mod moderator;
pub mod normalize;

pub use categories::Category;
pub use moderator::{ContentModerator, ModerationError, ModerationResult};
