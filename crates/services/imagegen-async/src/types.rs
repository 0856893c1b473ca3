use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted width and height, in pixels
pub const DIMENSION_RANGE: RangeInclusive<u32> = 256..=2048;

/// Which backend serves a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageProvider {
    /// GET a URL template; the URL itself is the result
    #[default]
    Url,
    /// POST to an inference API; the body is the result
    Blob,
}

/// Caller-facing image request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Free-text prompt
    pub prompt: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Provider model id
    pub model: String,
    /// Strip request phrasing and append a quality phrase
    pub enhance: bool,
    /// Fixed seed; a random one is drawn when absent
    pub seed: Option<u32>,
    /// Blob provider only
    pub negative_prompt: Option<String>,
    /// Backend to use
    pub provider: ImageProvider,
}

impl ImageRequest {
    /// 1024x1024 `flux` request on the URL provider, enhancement on
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            model: "flux".into(),
            enhance: true,
            seed: None,
            negative_prompt: None,
            provider: ImageProvider::Url,
        }
    }

    /// Sets both dimensions
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Turns enhancement on or off
    #[must_use]
    pub const fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    /// Fixes the seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the negative prompt
    #[must_use]
    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    /// Selects the provider
    #[must_use]
    pub const fn with_provider(mut self, provider: ImageProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Check prompt and dimensions
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".into());
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !DIMENSION_RANGE.contains(&value) {
                return Err(format!(
                    "{name} must be between {} and {} pixels, got {value}",
                    DIMENSION_RANGE.start(),
                    DIMENSION_RANGE.end()
                ));
            }
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }
        Ok(())
    }
}

/// Raw image bytes returned by the blob provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    /// Encoded image
    pub bytes: bytes::Bytes,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
}

impl ImageBlob {
    /// `data:` URL embedding the image
    #[must_use]
    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.content_type)
    }

    /// File extension matching the content type
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// A generated image
///
/// `blob` is present only for the blob provider; its `url` is then a `data:`
/// URL until the caller stores the bytes somewhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Unique id
    pub id: String,
    /// Where the image can be fetched
    pub url: String,
    /// Prompt actually sent, after enhancement
    pub prompt: String,
    /// Model that produced it
    pub model: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Seed used
    pub seed: u32,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Image bytes for the blob provider
    #[serde(skip)]
    pub blob: Option<ImageBlob>,
}

impl GeneratedImage {
    /// Which provider produced the image
    #[must_use]
    pub const fn provider(&self) -> ImageProvider {
        if self.blob.is_some() {
            ImageProvider::Blob
        } else {
            ImageProvider::Url
        }
    }
}

/// Body sent to the blob provider
#[derive(Debug, Clone, Serialize)]
pub struct BlobRequest<'a> {
    /// Prompt
    pub inputs: &'a str,
    /// Generation parameters
    pub parameters: BlobParameters<'a>,
}

/// Generation parameters for the blob provider
#[derive(Debug, Clone, Serialize)]
pub struct BlobParameters<'a> {
    /// Things to avoid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
    /// Denoising steps
    pub num_inference_steps: u32,
    /// Prompt adherence
    pub guidance_scale: f32,
    /// Seed
    pub seed: u32,
}

/// JSON body the blob provider sends instead of an image
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlobErrorBody {
    /// Error text
    #[serde(default)]
    pub error: Option<String>,
    /// Seconds until the model is loaded
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

/// Reachability of one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHealth {
    /// Endpoint template or base URL
    pub endpoint: String,
    /// Answered with a non-5xx status
    pub healthy: bool,
}
