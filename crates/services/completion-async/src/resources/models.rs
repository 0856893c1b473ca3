use crate::{
    client::Client,
    config::Config,
    error::CompletionError,
    types::ModelListResponse,
};

/// API resource for `/models`
pub struct Models<'c, C: Config> {
    client: &'c Client<C>,
}

impl<'c, C: Config> Models<'c, C> {
    /// Creates a new Models resource
    #[must_use]
    pub const fn new(client: &'c Client<C>) -> Self {
        Self { client }
    }

    /// List the models the gateway currently serves
    ///
    /// Retried with exponential backoff on 408/409/429/5xx.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing, the request keeps failing,
    /// or the body cannot be decoded.
    pub async fn list(&self) -> Result<ModelListResponse, CompletionError> {
        self.client.get("/models").await
    }
}

impl<C: Config> crate::Client<C> {
    /// Returns the Models API resource
    #[must_use]
    pub const fn models(&self) -> Models<'_, C> {
        Models::new(self)
    }
}
