use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default completion gateway base URL
pub const COMPLETION_DEFAULT_BASE: &str = "https://openrouter.ai/api/v1";
/// Attribution header naming the calling site
pub const HDR_REFERER: &str = "HTTP-Referer";
/// Attribution header naming the calling app
pub const HDR_TITLE: &str = "X-Title";
/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration for the completion client
///
/// Debug output redacts `api_key` via [`SecretString`].
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    api_base: String,
    api_key: Option<SecretString>,
    referer: Option<String>,
    title: Option<String>,
    timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: env_trimmed("NOTHINGAI_COMPLETION_BASE_URL")
                .unwrap_or_else(|| COMPLETION_DEFAULT_BASE.into()),
            api_key: env_trimmed("OPENROUTER_API_KEY").map(SecretString::from),
            referer: None,
            title: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CompletionConfig {
    /// Creates a configuration from the environment
    ///
    /// - `OPENROUTER_API_KEY` for bearer authentication
    /// - `NOTHINGAI_COMPLETION_BASE_URL` for a custom gateway
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the API key from an existing secret
    #[must_use]
    pub fn with_secret(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Sets the `HTTP-Referer` attribution header
    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the `X-Title` attribution header
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured API base URL
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

/// Configuration trait for the completion client
pub trait Config: Send + Sync {
    /// HTTP headers to include in requests
    fn headers(&self) -> Result<HeaderMap, crate::error::CompletionError>;

    /// Full URL for an API path
    fn url(&self, path: &str) -> String;

    /// Query parameters to include in requests
    fn query(&self) -> Vec<(&str, &str)>;

    /// Fails when credentials are missing
    fn validate_auth(&self) -> Result<(), crate::error::CompletionError>;

    /// Upper bound for one attempt (connect + first byte for streams)
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

impl Config for CompletionConfig {
    fn headers(&self) -> Result<HeaderMap, crate::error::CompletionError> {
        use crate::error::CompletionError;

        let mut h = HeaderMap::new();

        if let Some(secret) = &self.api_key {
            let key = secret.expose_secret().trim();
            if !key.is_empty() {
                h.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|_| CompletionError::Config("Invalid API key value".into()))?,
                );
            }
        }
        if let Some(referer) = &self.referer {
            h.insert(
                HDR_REFERER,
                HeaderValue::from_str(referer)
                    .map_err(|_| CompletionError::Config("Invalid referer value".into()))?,
            );
        }
        if let Some(title) = &self.title {
            h.insert(
                HDR_TITLE,
                HeaderValue::from_str(title)
                    .map_err(|_| CompletionError::Config("Invalid title value".into()))?,
            );
        }

        Ok(h)
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn query(&self) -> Vec<(&str, &str)> {
        vec![]
    }

    fn validate_auth(&self) -> Result<(), crate::error::CompletionError> {
        match &self.api_key {
            Some(secret) if !secret.expose_secret().trim().is_empty() => Ok(()),
            _ => Err(crate::error::CompletionError::Config(
                "Missing completion credentials: set OPENROUTER_API_KEY".into(),
            )),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
