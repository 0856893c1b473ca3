//! Configuration types for the NothingAI client.
//!
//! The root type is [`NothingConfig`]. Every section uses `#[serde(default)]`
//! so partial files deserialize cleanly.

use schemars::JsonSchema;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the NothingAI client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NothingConfig {
    /// Optional JSON Schema URL for editor support.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Remote service endpoints (completion gateway, image providers).
    pub services: ServicesConfig,

    /// Chat model selection and the model catalog.
    pub models: ModelsConfig,

    /// Default generation parameters for chat turns.
    pub generation: GenerationConfig,

    /// Default image generation settings.
    pub images: ImageDefaults,

    /// License gate settings.
    pub license: LicenseConfig,

    /// Local persistence settings.
    pub storage: StorageConfig,

    /// Logging and diagnostics configuration.
    pub logging: LoggingConfig,
}

/// External service configurations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServicesConfig {
    /// Completion gateway (OpenAI-compatible chat completions).
    pub completion: CompletionServiceConfig,

    /// Image generation providers.
    pub images: ImageServiceConfig,
}

/// Completion gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompletionServiceConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Optional `HTTP-Referer` attribution header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Optional `X-Title` attribution header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// API key (env-only, never serialized to config files).
    #[serde(skip)]
    #[schemars(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for CompletionServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            timeout_secs: 60,
            referer: None,
            title: Some("NothingAI".into()),
            api_key: None,
        }
    }
}

/// Which image backend answers generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageProviderKind {
    /// URL-template provider returning image bytes on GET.
    #[default]
    Url,

    /// Hosted-inference provider returning image bytes on POST.
    Blob,
}

/// Image provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ImageServiceConfig {
    /// Provider used by default.
    pub provider: ImageProviderKind,

    /// URL templates for the URL provider, tried in order. `{prompt}` is
    /// replaced with the url-encoded prompt.
    pub endpoints: Vec<String>,

    /// Base URL of the blob provider; `/models/{model}` is appended.
    pub blob_base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Attempts per endpoint before failing over.
    pub max_retries: u32,

    /// Base delay between attempts in milliseconds (multiplied by attempt number).
    pub retry_delay_ms: u64,

    /// Blob provider token (env-only, never serialized to config files).
    #[serde(skip)]
    #[schemars(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            provider: ImageProviderKind::Url,
            endpoints: vec![
                "https://image.pollinations.ai/prompt/{prompt}".into(),
                "https://pollinations.ai/p/{prompt}".into(),
            ],
            blob_base_url: "https://api-inference.huggingface.co".into(),
            timeout_secs: 60,
            max_retries: 3,
            retry_delay_ms: 1000,
            api_key: None,
        }
    }
}

/// Cost/capability class of a chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelTierName {
    /// No-cost models with small budgets.
    Free,
    /// Low-cost models.
    Affordable,
    /// Highest-capability models.
    Premium,
}

/// Extra catalog entry declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelEntryConfig {
    /// Gateway model identifier.
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tier governing the token ceilings.
    pub tier: ModelTierName,

    /// Whether the model accepts image attachments.
    #[serde(default)]
    pub vision: bool,
}

/// Chat model selection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model used for new conversations.
    pub default_model: String,

    /// Entries added to (or overriding) the built-in catalog.
    pub catalog: Vec<ModelEntryConfig>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: "meta-llama/llama-3.3-70b-instruct:free".into(),
            catalog: vec![],
        }
    }
}

/// Default generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,

    /// Requested completion budget (clamped per tier at request time).
    pub max_tokens: u32,

    /// Nucleus sampling parameter.
    pub top_p: f32,

    /// System prompt prepended to every transcript.
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 1.0,
            system_prompt: "You are NothingAI, a helpful assistant. Answer clearly and concisely."
                .into(),
        }
    }
}

/// Default image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ImageDefaults {
    /// Model identifier passed to the provider.
    pub model: String,

    /// Width in pixels (256..=2048).
    pub width: u32,

    /// Height in pixels (256..=2048).
    pub height: u32,

    /// Rewrite prompts with a quality phrase before sending.
    pub enhance: bool,

    /// Negative prompt for the blob provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            model: "flux".into(),
            width: 1024,
            height: 1024,
            enhance: true,
            negative_prompt: None,
        }
    }
}

/// Where license records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LicenseBackendKind {
    /// Records kept in the local store only.
    #[default]
    Local,
    /// Records kept in a remote document store.
    Remote,
    /// Remote first, local on failure.
    Hybrid,
}

/// License gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LicenseConfig {
    /// Refuse chat/image commands without an active license.
    pub required: bool,

    /// Backend holding license records.
    pub backend: LicenseBackendKind,

    /// Base URL of the remote document store (remote/hybrid backends).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_base_url: Option<String>,

    /// Remote store token (env-only, never serialized to config files).
    #[serde(skip)]
    #[schemars(skip)]
    pub api_key: Option<SecretString>,
}

/// Local persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory. Defaults to the platform data dir + `nothingai`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

impl StorageConfig {
    /// Resolve the data directory, falling back to the platform default.
    pub fn resolve_data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = self.data_dir.as_deref().map(str::trim)
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data dir"))?;
        Ok(base.join("nothingai"))
    }
}

/// Logging and diagnostics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Whether to emit JSON-formatted logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            json: false,
        }
    }
}
