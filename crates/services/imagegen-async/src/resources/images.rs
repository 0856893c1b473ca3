use chrono::Utc;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Client,
    config::{Config, PROMPT_PLACEHOLDER},
    enhance::enhance_prompt,
    error::{AttemptFailure, ImageError},
    types::{
        BlobErrorBody, BlobParameters, BlobRequest, EndpointHealth, GeneratedImage, ImageBlob,
        ImageProvider, ImageRequest,
    },
};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const BLOB_STEPS: u32 = 4;
const BLOB_GUIDANCE: f32 = 0.0;
const SEED_RANGE: std::ops::Range<u32> = 0..1_000_000_000;

/// API resource for image generation
pub struct Images<'c, C: Config> {
    client: &'c Client<C>,
}

/// Prompt and seed after enhancement, fixed for every attempt
struct Prepared {
    prompt: String,
    seed: u32,
}

type AttemptResult<T> = Result<Result<T, AttemptFailure>, ImageError>;

impl<'c, C: Config> Images<'c, C> {
    /// Creates a new Images resource
    #[must_use]
    pub const fn new(client: &'c Client<C>) -> Self {
        Self { client }
    }

    /// Generate one image
    ///
    /// # Errors
    ///
    /// [`ImageError::Validation`] for a bad prompt or size, before any
    /// request. [`ImageError::Service`] once every attempt on every endpoint
    /// failed, carrying the last failure.
    pub async fn generate(&self, req: ImageRequest) -> Result<GeneratedImage, ImageError> {
        self.generate_with_cancel(req, &CancellationToken::new())
            .await
    }

    /// [`Images::generate`] that stops early when `cancel` fires
    ///
    /// # Errors
    ///
    /// As [`Images::generate`], plus [`ImageError::Cancelled`].
    pub async fn generate_with_cancel(
        &self,
        req: ImageRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ImageError> {
        req.validate().map_err(ImageError::Validation)?;
        let prepared = prepare(&req, &mut rand::thread_rng());

        tracing::debug!(
            provider = ?req.provider,
            model = %req.model,
            width = req.width,
            height = req.height,
            seed = prepared.seed,
            "generating image"
        );

        match req.provider {
            ImageProvider::Url => self.generate_url(&req, &prepared, cancel).await,
            ImageProvider::Blob => self.generate_blob(&req, &prepared, cancel).await,
        }
    }

    /// Probe every configured endpoint once
    ///
    /// Display only: a healthy endpoint may still fail a real request.
    pub async fn health(&self) -> Vec<EndpointHealth> {
        let config = self.client.config();
        let mut targets: Vec<String> = config.endpoints().to_vec();
        targets.push(config.blob_base().to_string());

        let mut report = Vec::with_capacity(targets.len());
        for endpoint in targets {
            let healthy = match health_url(&endpoint) {
                Some(url) => self
                    .client
                    .http()
                    .get(url)
                    .timeout(HEALTH_TIMEOUT)
                    .send()
                    .await
                    .is_ok_and(|r| !r.status().is_server_error()),
                None => false,
            };
            tracing::debug!(%endpoint, healthy, "image endpoint health");
            report.push(EndpointHealth { endpoint, healthy });
        }
        report
    }

    async fn generate_url(
        &self,
        req: &ImageRequest,
        prepared: &Prepared,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ImageError> {
        let config = self.client.config();
        let endpoints = config.endpoints();
        if endpoints.is_empty() {
            return Err(ImageError::Config("no image endpoints configured".into()));
        }

        let max_retries = config.max_retries();
        let mut attempts = 0;
        let mut last: Option<AttemptFailure> = None;

        for (index, template) in endpoints.iter().enumerate() {
            let url = build_image_url(template, &prepared.prompt, req, prepared.seed)?;

            for attempt in 1..=max_retries {
                if cancel.is_cancelled() {
                    return Err(ImageError::Cancelled);
                }
                attempts += 1;

                match self.fetch_image(url.clone(), cancel).await? {
                    Ok(_) => {
                        return Ok(GeneratedImage {
                            id: uuid::Uuid::new_v4().to_string(),
                            url: url.to_string(),
                            prompt: prepared.prompt.clone(),
                            model: req.model.clone(),
                            width: req.width,
                            height: req.height,
                            seed: prepared.seed,
                            timestamp: Utc::now(),
                            blob: None,
                        });
                    }
                    Err(failure) => {
                        tracing::warn!(endpoint = index, attempt, error = %failure, "image attempt failed");
                        last = Some(failure);
                        if attempt < max_retries {
                            pause(config.retry_delay() * attempt, cancel).await?;
                        }
                    }
                }
            }

            if index + 1 < endpoints.len() {
                tracing::warn!(from = index, to = index + 1, "failing over to next image endpoint");
            }
        }

        Err(service_error(attempts, last))
    }

    async fn generate_blob(
        &self,
        req: &ImageRequest,
        prepared: &Prepared,
        cancel: &CancellationToken,
    ) -> Result<GeneratedImage, ImageError> {
        let config = self.client.config();
        config.validate_blob_auth()?;

        let url = config.blob_url(&req.model);
        let body = BlobRequest {
            inputs: &prepared.prompt,
            parameters: BlobParameters {
                negative_prompt: req.negative_prompt.as_deref(),
                width: req.width,
                height: req.height,
                num_inference_steps: BLOB_STEPS,
                guidance_scale: BLOB_GUIDANCE,
                seed: prepared.seed,
            },
        };

        let max_retries = config.max_retries();
        let mut last: Option<AttemptFailure> = None;

        for attempt in 1..=max_retries {
            if cancel.is_cancelled() {
                return Err(ImageError::Cancelled);
            }

            match self.fetch_blob(&url, &body, cancel).await? {
                Ok(blob) => {
                    return Ok(GeneratedImage {
                        id: uuid::Uuid::new_v4().to_string(),
                        url: blob.data_url(),
                        prompt: prepared.prompt.clone(),
                        model: req.model.clone(),
                        width: req.width,
                        height: req.height,
                        seed: prepared.seed,
                        timestamp: Utc::now(),
                        blob: Some(blob),
                    });
                }
                Err(failure) => {
                    tracing::warn!(attempt, model = %req.model, error = %failure, "blob image attempt failed");
                    let wait = match &failure {
                        AttemptFailure::ModelLoading { estimated_secs } => {
                            Duration::try_from_secs_f64(*estimated_secs)
                                .map_or(config.max_model_wait(), |d| d.min(config.max_model_wait()))
                        }
                        _ => config.retry_delay() * attempt,
                    };
                    last = Some(failure);
                    if attempt < max_retries {
                        pause(wait, cancel).await?;
                    }
                }
            }
        }

        Err(service_error(max_retries, last))
    }

    /// One GET against a URL endpoint; the body is checked, not kept
    async fn fetch_image(
        &self,
        url: reqwest::Url,
        cancel: &CancellationToken,
    ) -> AttemptResult<usize> {
        let timeout = self.client.config().timeout();
        let request = async {
            let response = self.client.http().get(url).send().await?;
            let status = response.status();
            let content_type = content_type_of(&response);
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, bytes))
        };

        let (status, content_type, bytes) = match race(request, timeout, cancel).await? {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => return Ok(Err(AttemptFailure::Transport(e.to_string()))),
            Err(failure) => return Ok(Err(failure)),
        };

        if !status.is_success() {
            return Ok(Err(AttemptFailure::Status {
                status: status.as_u16(),
                message: excerpt(&bytes),
            }));
        }
        Ok(check_image(&content_type, &bytes).map(|()| bytes.len()))
    }

    async fn fetch_blob(
        &self,
        url: &str,
        body: &BlobRequest<'_>,
        cancel: &CancellationToken,
    ) -> AttemptResult<ImageBlob> {
        let config = self.client.config();
        let headers = config.blob_headers()?;
        let request = async {
            let response = self
                .client
                .http()
                .post(url)
                .headers(headers)
                .json(body)
                .send()
                .await?;
            let status = response.status();
            let content_type = content_type_of(&response);
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, bytes))
        };

        let (status, content_type, bytes) = match race(request, config.timeout(), cancel).await? {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => return Ok(Err(AttemptFailure::Transport(e.to_string()))),
            Err(failure) => return Ok(Err(failure)),
        };

        if !status.is_success() {
            let parsed = serde_json::from_slice::<BlobErrorBody>(&bytes).unwrap_or_default();
            if let Some(estimated_secs) = parsed.estimated_time {
                return Ok(Err(AttemptFailure::ModelLoading { estimated_secs }));
            }
            return Ok(Err(AttemptFailure::Status {
                status: status.as_u16(),
                message: parsed.error.unwrap_or_else(|| excerpt(&bytes)),
            }));
        }

        if let Err(failure) = check_image(&content_type, &bytes) {
            return Ok(Err(failure));
        }
        Ok(Ok(ImageBlob {
            bytes,
            content_type,
        }))
    }
}

fn prepare<R: Rng + ?Sized>(req: &ImageRequest, rng: &mut R) -> Prepared {
    let prompt = if req.enhance {
        enhance_prompt(&req.prompt, rng)
    } else {
        req.prompt.trim().to_string()
    };
    let seed = req.seed.unwrap_or_else(|| rng.gen_range(SEED_RANGE));
    Prepared { prompt, seed }
}

/// Fill a URL template with the encoded prompt and generation parameters
///
/// # Errors
///
/// [`ImageError::Config`] when the template lacks `{prompt}` or is not a URL.
pub fn build_image_url(
    template: &str,
    prompt: &str,
    req: &ImageRequest,
    seed: u32,
) -> Result<reqwest::Url, ImageError> {
    if !template.contains(PROMPT_PLACEHOLDER) {
        return Err(ImageError::Config(format!(
            "endpoint template '{template}' has no {PROMPT_PLACEHOLDER} placeholder"
        )));
    }
    let filled = template.replace(PROMPT_PLACEHOLDER, &urlencoding::encode(prompt));
    let mut url = reqwest::Url::parse(&filled)
        .map_err(|e| ImageError::Config(format!("invalid endpoint template '{template}': {e}")))?;
    url.query_pairs_mut()
        .append_pair("width", &req.width.to_string())
        .append_pair("height", &req.height.to_string())
        .append_pair("model", &req.model)
        .append_pair("nologo", "true")
        .append_pair("seed", &seed.to_string());
    Ok(url)
}

fn health_url(endpoint: &str) -> Option<reqwest::Url> {
    let mut url = reqwest::Url::parse(&endpoint.replace(PROMPT_PLACEHOLDER, "ping")).ok()?;
    url.set_path("/");
    url.set_query(None);
    Some(url)
}

fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn check_image(content_type: &str, bytes: &[u8]) -> Result<(), AttemptFailure> {
    if !content_type.starts_with("image/") {
        return Err(AttemptFailure::NotAnImage(content_type.to_string()));
    }
    if bytes.is_empty() {
        return Err(AttemptFailure::EmptyBody);
    }
    Ok(())
}

fn excerpt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).trim().to_string()
}

fn service_error(attempts: u32, last: Option<AttemptFailure>) -> ImageError {
    ImageError::Service {
        attempts,
        message: last.map_or_else(|| "no attempt was made".to_string(), |f| f.to_string()),
    }
}

/// Run `fut` under a timeout, aborting on cancellation
async fn race<F, T>(
    fut: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Result<T, AttemptFailure>, ImageError>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ImageError::Cancelled),
        r = tokio::time::timeout(timeout, fut) => Ok(r.map_err(|_| {
            AttemptFailure::Transport(format!("timed out after {timeout:?}"))
        })),
    }
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), ImageError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ImageError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

impl<C: Config> crate::Client<C> {
    /// Returns the Images API resource
    #[must_use]
    pub const fn images(&self) -> Images<'_, C> {
        Images::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn url_carries_encoded_prompt_and_params() {
        let req = ImageRequest::new("x").with_size(512, 768).with_model("turbo");
        let url = build_image_url(
            "https://image.example/prompt/{prompt}",
            "a red bicycle, 8k",
            &req,
            42,
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://image.example/prompt/a%20red%20bicycle%2C%208k?width=512&height=768&model=turbo&nologo=true&seed=42"
        );
    }

    #[test]
    fn template_without_placeholder_is_config_error() {
        let req = ImageRequest::new("x");
        let err = build_image_url("https://image.example/prompt/", "x", &req, 1).unwrap_err();
        assert!(matches!(err, ImageError::Config(_)));
    }

    #[test]
    fn prepare_keeps_explicit_seed_and_draws_otherwise() {
        let mut rng = StdRng::seed_from_u64(3);
        let fixed = prepare(&ImageRequest::new("a cat").with_enhance(false).with_seed(5), &mut rng);
        assert_eq!(fixed.seed, 5);
        assert_eq!(fixed.prompt, "a cat");

        let drawn = prepare(&ImageRequest::new("draw a cat"), &mut rng);
        assert!(SEED_RANGE.contains(&drawn.seed));
        assert!(drawn.prompt.starts_with("a cat, "));
    }

    #[test]
    fn health_url_is_origin_root() {
        let url = health_url("https://image.example/prompt/{prompt}").unwrap();
        assert_eq!(url.as_str(), "https://image.example/");
        assert!(health_url("not a url").is_none());
    }

    #[test]
    fn image_checks() {
        assert_eq!(check_image("image/png", b"x"), Ok(()));
        assert_eq!(
            check_image("text/html", b"<html>"),
            Err(AttemptFailure::NotAnImage("text/html".into()))
        );
        assert_eq!(check_image("image/jpeg", b""), Err(AttemptFailure::EmptyBody));
    }
}
