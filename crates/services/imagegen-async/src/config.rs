use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Primary URL-template endpoint; `{prompt}` is replaced by the encoded prompt
pub const PRIMARY_ENDPOINT: &str = "https://image.pollinations.ai/prompt/{prompt}";
/// Secondary URL-template endpoint used after the primary is exhausted
pub const SECONDARY_ENDPOINT: &str = "https://pollinations.ai/p/{prompt}";
/// Default inference API base for the blob provider
pub const BLOB_DEFAULT_BASE: &str = "https://api-inference.huggingface.co";
/// Placeholder that every endpoint template must contain
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration for the image client
///
/// Debug output redacts `api_key` via [`SecretString`].
#[derive(Clone, Debug)]
pub struct ImageConfig {
    endpoints: Vec<String>,
    blob_base: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    max_model_wait: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![PRIMARY_ENDPOINT.into(), SECONDARY_ENDPOINT.into()],
            blob_base: env_trimmed("NOTHINGAI_IMAGE_BLOB_BASE_URL")
                .unwrap_or_else(|| BLOB_DEFAULT_BASE.into()),
            api_key: env_trimmed("HF_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_model_wait: Duration::from_secs(30),
        }
    }
}

impl ImageConfig {
    /// Creates a configuration from the environment
    ///
    /// - `HF_API_TOKEN` for the blob provider
    /// - `NOTHINGAI_IMAGE_BLOB_BASE_URL` for a custom inference API
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the URL endpoint templates, in failover order
    #[must_use]
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the blob provider base URL
    #[must_use]
    pub fn with_blob_base(mut self, base: impl Into<String>) -> Self {
        self.blob_base = base.into();
        self
    }

    /// Sets the blob provider token
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the blob provider token from an existing secret
    #[must_use]
    pub fn with_secret(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempts per endpoint
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base of the linear delay between attempts
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Cap on waiting for a loading model
    #[must_use]
    pub const fn with_max_model_wait(mut self, wait: Duration) -> Self {
        self.max_model_wait = wait;
        self
    }
}

/// Configuration trait for the image client
pub trait Config: Send + Sync {
    /// URL endpoint templates in failover order
    fn endpoints(&self) -> &[String];

    /// Base URL of the blob provider
    fn blob_base(&self) -> &str;

    /// Full URL of the blob provider for a model
    fn blob_url(&self, model: &str) -> String {
        let base = self.blob_base().trim_end_matches('/');
        format!("{base}/models/{}", model.trim_start_matches('/'))
    }

    /// Headers for blob provider requests
    fn blob_headers(&self) -> Result<HeaderMap, crate::error::ImageError>;

    /// Fails when the blob provider has no credentials
    fn validate_blob_auth(&self) -> Result<(), crate::error::ImageError>;

    /// Per-request timeout
    fn timeout(&self) -> Duration;

    /// Attempts per endpoint, at least 1
    fn max_retries(&self) -> u32;

    /// Base of the linear delay between attempts
    fn retry_delay(&self) -> Duration;

    /// Cap on waiting for a loading model
    fn max_model_wait(&self) -> Duration;
}

impl Config for ImageConfig {
    fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn blob_base(&self) -> &str {
        &self.blob_base
    }

    fn blob_headers(&self) -> Result<HeaderMap, crate::error::ImageError> {
        let mut h = HeaderMap::new();
        if let Some(secret) = &self.api_key {
            let key = secret.expose_secret().trim();
            if !key.is_empty() {
                h.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                        crate::error::ImageError::Config("Invalid API token value".into())
                    })?,
                );
            }
        }
        Ok(h)
    }

    fn validate_blob_auth(&self) -> Result<(), crate::error::ImageError> {
        match &self.api_key {
            Some(secret) if !secret.expose_secret().trim().is_empty() => Ok(()),
            _ => Err(crate::error::ImageError::Config(
                "Missing image provider credentials: set HF_API_TOKEN".into(),
            )),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn max_retries(&self) -> u32 {
        self.max_retries.max(1)
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn max_model_wait(&self) -> Duration {
        self.max_model_wait
    }
}
