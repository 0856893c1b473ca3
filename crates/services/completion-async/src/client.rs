use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;

use crate::{catalog::ModelCatalog, config::Config, error::CompletionError, retry};

/// Completion gateway client
///
/// Generic over a [`Config`] that supplies the base URL, credentials and
/// attribution headers. Holds the model catalog used for token clamping and
/// fallback.
#[derive(Debug, Clone)]
pub struct Client<C: Config> {
    http: reqwest::Client,
    config: C,
    backoff: ExponentialBuilder,
    catalog: ModelCatalog,
}

impl Client<crate::config::CompletionConfig> {
    /// Creates a new client with default configuration
    ///
    /// Uses environment variables:
    /// - `OPENROUTER_API_KEY` for bearer authentication
    /// - `NOTHINGAI_COMPLETION_BASE_URL` for a custom gateway
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(crate::config::CompletionConfig::new())
    }
}

impl<C: Config + Default> Default for Client<C> {
    fn default() -> Self {
        Self::with_config(C::default())
    }
}

impl<C: Config> Client<C> {
    /// Creates a new client with the given configuration
    ///
    /// Per-attempt timeouts come from [`Config::timeout`] and are applied by
    /// the resources, so the HTTP client itself only bounds connecting.
    #[must_use]
    pub fn with_config(config: C) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            config,
            backoff: retry::default_backoff_builder(),
            catalog: ModelCatalog::default(),
        }
    }

    /// Replaces the HTTP client with a custom one
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Replaces the backoff configuration for retries and fallback pauses
    #[must_use]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces the model catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Returns the model catalog
    #[must_use]
    pub const fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) const fn backoff(&self) -> ExponentialBuilder {
        self.backoff
    }

    pub(crate) async fn get<O>(&self, path: &str) -> Result<O, CompletionError>
    where
        O: DeserializeOwned,
    {
        let mk = || async {
            let headers = self.config.headers()?;
            Ok(self
                .http
                .get(self.config.url(path))
                .headers(headers)
                .query(&self.config.query())
                .timeout(self.config.timeout())
                .build()?)
        };
        self.execute(mk).await
    }

    async fn execute<O, M, Fut>(&self, mk: M) -> Result<O, CompletionError>
    where
        O: DeserializeOwned,
        M: Fn() -> Fut + Send + Sync,
        Fut: core::future::Future<Output = Result<reqwest::Request, CompletionError>> + Send,
    {
        self.config.validate_auth()?;

        let bytes = self.execute_raw(mk).await?;
        let resp: O =
            serde_json::from_slice(&bytes).map_err(|e| crate::error::map_deser(&e, &bytes))?;
        Ok(resp)
    }

    async fn execute_raw<M, Fut>(&self, mk: M) -> Result<bytes::Bytes, CompletionError>
    where
        M: Fn() -> Fut + Send + Sync,
        Fut: core::future::Future<Output = Result<reqwest::Request, CompletionError>> + Send,
    {
        let http_client = self.http.clone();

        (|| async {
            let request = mk().await?;
            let response = http_client
                .execute(request)
                .await
                .map_err(CompletionError::Reqwest)?;

            let status = response.status();
            let bytes = response.bytes().await.map_err(CompletionError::Reqwest)?;

            if status.is_success() {
                return Ok(bytes);
            }

            Err(crate::error::deserialize_api_error(status, &bytes))
        })
        .retry(self.backoff)
        .when(CompletionError::is_retryable)
        .notify(|err, dur| {
            tracing::debug!(error = %err, delay_ms = dur.as_millis(), "retrying completion request");
        })
        .await
    }
}
