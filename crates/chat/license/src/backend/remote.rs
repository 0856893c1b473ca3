use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::LicenseBackend;
use crate::error::LicenseError;
use crate::record::LicenseRecord;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Records kept in a REST document store
///
/// - `GET {base}/licenses/{key}` fetches one record (404 when absent)
/// - `PATCH {base}/licenses/{key}` upserts a record
/// - `DELETE {base}/licenses/{key}` removes it
/// - `GET {base}/licenses` lists all records
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<LicenseRecord>),
    Wrapped { licenses: Vec<LicenseRecord> },
}

impl RemoteBackend {
    /// Backend for the document store at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Bearer token sent with every request
    #[must_use]
    pub fn with_api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Replaces the HTTP client
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn headers(&self) -> Result<HeaderMap, LicenseError> {
        let mut h = HeaderMap::new();
        if let Some(secret) = &self.api_key {
            let key = secret.expose_secret().trim();
            if !key.is_empty() {
                h.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|_| LicenseError::Config("invalid license API key".into()))?,
                );
            }
        }
        Ok(h)
    }

    fn record_url(&self, key: &str) -> String {
        format!("{}/licenses/{key}", self.base_url)
    }

    async fn error_for(response: reqwest::Response) -> LicenseError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        LicenseError::Remote {
            status,
            message: body.chars().take(200).collect(),
        }
    }
}

#[async_trait]
impl LicenseBackend for RemoteBackend {
    async fn get(&self, key: &str) -> Result<Option<LicenseRecord>, LicenseError> {
        let response = self
            .http
            .get(self.record_url(key))
            .headers(self.headers()?)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let bytes = response.bytes().await?;
                serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|e| LicenseError::Serde(e.to_string()))
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn put(&self, record: &LicenseRecord) -> Result<(), LicenseError> {
        let response = self
            .http
            .patch(self.record_url(&record.key))
            .headers(self.headers()?)
            .json(record)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, LicenseError> {
        let response = self
            .http
            .delete(self.record_url(key))
            .headers(self.headers()?)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError> {
        let response = self
            .http
            .get(format!("{}/licenses", self.base_url))
            .headers(self.headers()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let bytes = response.bytes().await?;
        let body: ListBody =
            serde_json::from_slice(&bytes).map_err(|e| LicenseError::Serde(e.to_string()))?;
        Ok(match body {
            ListBody::Bare(records) | ListBody::Wrapped { licenses: records } => records,
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
