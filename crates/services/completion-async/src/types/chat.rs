use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the conversation
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
}

/// Image reference inside a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// HTTP(S) URL or `data:` URL
    pub url: String,
}

/// One part of a multimodal message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Attached image, only understood by vision models
    ImageUrl {
        /// Image location
        image_url: ImageUrl,
    },
}

/// Message body: plain text or a list of parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Text plus image parts
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of the body, ignoring images
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// A single message sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: ChatRole,
    /// Body
    pub content: MessageContent,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Assistant message
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message with attached images
    #[must_use]
    pub fn user_with_images<I, S>(text: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = vec![ContentPart::Text { text: text.into() }];
        parts.extend(urls.into_iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }));
        Self {
            role: ChatRole::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Caller-facing chat request
///
/// The client turns this into one wire request per fallback attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Requested model id
    pub model: String,
    /// Ordered history, newest user message last
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, 0 to 2
    pub temperature: Option<f32>,
    /// Requested output budget before tier clamping
    pub max_tokens: u32,
    /// Nucleus sampling, above 0 and at most 1
    pub top_p: Option<f32>,
}

impl ChatRequest {
    /// Request with a 2048 token budget and provider-default sampling
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: 2048,
            top_p: None,
        }
    }

    /// Sets the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the token budget
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets `top_p`
    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Reject inputs the gateway would refuse anyway
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }
        if self.messages.is_empty() {
            return Err("at least one message is required".into());
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(format!("temperature must be between 0 and 2, got {t}"));
        }
        if let Some(p) = self.top_p
            && !(p > 0.0 && p <= 1.0)
        {
            return Err(format!("top_p must be in (0, 1], got {p}"));
        }
        Ok(())
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model for this attempt
    pub model: &'a str,
    /// History
    pub messages: &'a [ChatMessage],
    /// Temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Budget for this attempt
    pub max_tokens: u32,
    /// `top_p`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// SSE when true
    pub stream: bool,
}

/// Token accounting returned by the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Generated tokens
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u32,
}

/// Assistant message inside a non-streaming choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

/// One choice of a non-streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Generated message
    #[serde(default)]
    pub message: ResponseMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Non-streaming response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response id
    #[serde(default)]
    pub id: Option<String>,
    /// Model that actually served the request
    #[serde(default)]
    pub model: Option<String>,
    /// Choices; only the first is used
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token accounting
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Incremental content of a stream chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// New text, if any
    #[serde(default)]
    pub content: Option<String>,
}

/// One choice of a stream chunk
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// New content
    #[serde(default)]
    pub delta: Delta,
    /// Set on the last chunk
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One `data:` payload of a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    /// Serving model
    #[serde(default)]
    pub model: Option<String>,
    /// Choices; only the first is used
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage, usually only on the final chunk
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Text carried by the first choice
    #[must_use]
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Finish reason of the first choice
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}

/// Result of a successful chat call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Full generated text
    pub content: String,
    /// Model that produced the text
    pub model: String,
    /// Model the caller asked for
    pub requested_model: String,
    /// Budget of the successful attempt
    pub max_tokens: u32,
    /// Attempts used, 1-based
    pub attempts: u32,
    /// Why generation stopped
    pub finish_reason: Option<String>,
    /// Token accounting when the gateway reports it
    pub usage: Option<Usage>,
}

impl Completion {
    /// Whether a fallback model served the request
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.model != self.requested_model
    }
}
