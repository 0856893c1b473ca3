//! Persisted conversation model.
//!
//! Field names serialize in camelCase so exported documents keep the shape
//! `{ id, title, messages, settings, createdAt, updatedAt }`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Id of the synthetic greeting that opens every conversation.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

const WELCOME_TEXT: &str = "Hi, I'm NothingAI. Ask me anything, or ask me to \
generate an image of something and I'll draw it.";

const TITLE_MAX_WORDS: usize = 6;
const TITLE_MAX_CHARS: usize = 50;

/// Generate an identifier from the current timestamp plus a random suffix.
///
/// Shape: `<unix millis>-<9 base36 chars>`.
pub fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    format!("{}-{suffix}", Utc::now().timestamp_millis())
}

/// Derive a conversation title from the first user message.
///
/// Takes the first six words, capped at fifty characters, with `...` when
/// anything was cut.
pub fn derive_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return "New conversation".into();
    }
    let mut title = words
        .iter()
        .take(TITLE_MAX_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let mut truncated = words.len() > TITLE_MAX_WORDS;
    if title.chars().count() > TITLE_MAX_CHARS {
        title = title.chars().take(TITLE_MAX_CHARS).collect::<String>();
        title = title.trim_end().to_string();
        truncated = true;
    }
    if truncated {
        title.push_str("...");
    }
    title
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Image attached by the user to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedImage {
    pub url: String,
    pub name: String,
}

/// Image produced for an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImageRef {
    /// Remote URL, or a `file://` path for blob images saved locally.
    pub url: String,
    pub prompt: String,
    pub model: String,
}

/// One entry in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached_images: Vec<AttachedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<GeneratedImageRef>,
}

impl Message {
    /// New message with a fresh id stamped now.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            streaming: false,
            model: None,
            attached_images: vec![],
            generated_image: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Empty assistant message that receives streamed tokens.
    pub fn placeholder(model: impl Into<String>) -> Self {
        let mut msg = Self::assistant("");
        msg.streaming = true;
        msg.model = Some(model.into());
        msg
    }

    /// The synthetic greeting.
    pub fn welcome() -> Self {
        let mut msg = Self::assistant(WELCOME_TEXT);
        msg.id = WELCOME_MESSAGE_ID.into();
        msg
    }

    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_MESSAGE_ID
    }
}

/// Image provider recorded in conversation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderSetting {
    #[default]
    Url,
    Blob,
}

/// Per-conversation generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub image_model: String,
    pub image_width: u32,
    pub image_height: u32,
    pub enhance: bool,
    pub image_provider: ImageProviderSetting,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            model: "meta-llama/llama-3.3-70b-instruct:free".into(),
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 1.0,
            image_model: "flux".into(),
            image_width: 1024,
            image_height: 1024,
            enhance: true,
            image_provider: ImageProviderSetting::Url,
        }
    }
}

/// A persisted sequence of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub settings: ConversationSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Fresh conversation holding only the welcome message.
    pub fn new(settings: ConversationSettings) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            title: "New conversation".into(),
            messages: vec![Message::welcome()],
            settings,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether anything beyond the welcome message exists.
    pub fn has_content(&self) -> bool {
        self.messages.iter().any(|m| !m.is_welcome())
    }

    /// Set the title from the first user message if it is still the default.
    pub fn refresh_title(&mut self) {
        if self.title != "New conversation" {
            return;
        }
        if let Some(first) = self.messages.iter().find(|m| m.role == Role::User) {
            self.title = derive_title(&first.content);
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
