use futures::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Client,
    config::Config,
    error::{CompletionError, deserialize_api_error, map_deser, parse_error_envelope},
    fallback::{Attempt, FallbackState},
    handler::StreamHandler,
    sse,
    types::{ChatCompletionRequest, ChatCompletionResponse, ChatRequest, Completion},
};

const CHAT_PATH: &str = "/chat/completions";
const FALLBACK_PAUSE: Duration = Duration::from_millis(500);

/// API resource for `/chat/completions`
///
/// Every call runs the model fallback policy: up to three attempts, swapping
/// to the top free model or shrinking the token budget after each failure.
pub struct Chat<'c, C: Config> {
    client: &'c Client<C>,
}

/// Placeholder sink for non-streaming calls
struct NoTokens;

impl StreamHandler for NoTokens {
    fn on_token(&mut self, _token: &str) {}
    fn on_complete(&mut self, _completion: &Completion) {}
    fn on_error(&mut self, _error: &CompletionError) {}
}

impl<'c, C: Config> Chat<'c, C> {
    /// Creates a new Chat resource
    #[must_use]
    pub const fn new(client: &'c Client<C>) -> Self {
        Self { client }
    }

    /// Run a non-streaming completion
    ///
    /// # Errors
    ///
    /// Validation and configuration errors are returned before any request.
    /// Service failures are retried through the fallback policy and surface as
    /// [`CompletionError::Exhausted`].
    pub async fn create(&self, req: ChatRequest) -> Result<Completion, CompletionError> {
        self.create_with_cancel(req, &CancellationToken::new()).await
    }

    /// [`Chat::create`] that stops early when `cancel` fires
    ///
    /// # Errors
    ///
    /// As [`Chat::create`], plus [`CompletionError::Cancelled`].
    pub async fn create_with_cancel(
        &self,
        req: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Completion, CompletionError> {
        self.preflight(&req)?;
        self.run::<NoTokens>(&req, cancel, None).await
    }

    /// Run a streaming completion, feeding `handler`
    ///
    /// `handler` receives tokens in order, then exactly one terminal callback,
    /// including for validation failures. The same outcome is returned.
    ///
    /// # Errors
    ///
    /// As [`Chat::create`]. A failure after the first token has been delivered
    /// is returned as-is without further attempts.
    pub async fn stream<H: StreamHandler>(
        &self,
        req: ChatRequest,
        handler: &mut H,
    ) -> Result<Completion, CompletionError> {
        self.stream_with_cancel(req, handler, &CancellationToken::new())
            .await
    }

    /// [`Chat::stream`] that stops early when `cancel` fires
    ///
    /// # Errors
    ///
    /// As [`Chat::stream`], plus [`CompletionError::Cancelled`].
    pub async fn stream_with_cancel<H: StreamHandler>(
        &self,
        req: ChatRequest,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<Completion, CompletionError> {
        let result = match self.preflight(&req) {
            Ok(()) => self.run(&req, cancel, Some(&mut *handler)).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(completion) => handler.on_complete(completion),
            Err(e) => handler.on_error(e),
        }
        result
    }

    fn preflight(&self, req: &ChatRequest) -> Result<(), CompletionError> {
        req.validate().map_err(CompletionError::Validation)?;
        self.client.config().validate_auth()
    }

    async fn run<H: StreamHandler>(
        &self,
        req: &ChatRequest,
        cancel: &CancellationToken,
        mut sink: Option<&mut H>,
    ) -> Result<Completion, CompletionError> {
        let mut state = FallbackState::start(self.client.catalog(), &req.model, req.max_tokens);
        let mut pauses = backon::BackoffBuilder::build(self.client.backoff());

        loop {
            if cancel.is_cancelled() {
                return Err(CompletionError::Cancelled);
            }
            let attempt = state.current().clone();
            tracing::debug!(
                attempt = attempt.number,
                model = %attempt.model,
                max_tokens = attempt.max_tokens,
                stream = sink.is_some(),
                "chat completion attempt"
            );

            let mut delivered = false;
            let outcome = self
                .attempt(req, &attempt, cancel, sink.as_deref_mut(), &mut delivered)
                .await;

            let err = match outcome {
                Ok(completion) => {
                    if completion.fell_back() {
                        tracing::info!(
                            requested = %completion.requested_model,
                            served_by = %completion.model,
                            attempts = completion.attempts,
                            "completion served by fallback model"
                        );
                    }
                    return Ok(completion);
                }
                Err(e) if !e.triggers_fallback() => return Err(e),
                Err(e) if delivered => {
                    tracing::warn!(error = %e, model = %attempt.model, "stream failed after output began");
                    return Err(e);
                }
                Err(e) => e,
            };

            tracing::warn!(
                attempt = attempt.number,
                model = %attempt.model,
                kind = ?err.kind(),
                error = %err,
                "chat completion attempt failed"
            );

            let Some(next) = state.advance() else {
                return Err(CompletionError::Exhausted {
                    attempts: attempt.number,
                    last: Box::new(err),
                });
            };
            tracing::warn!(
                next_model = %next.model,
                next_max_tokens = next.max_tokens,
                "falling back"
            );

            let pause = pauses.next().unwrap_or(FALLBACK_PAUSE);
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompletionError::Cancelled),
                () = tokio::time::sleep(pause) => {}
            }
        }
    }

    async fn attempt<H: StreamHandler>(
        &self,
        req: &ChatRequest,
        attempt: &Attempt,
        cancel: &CancellationToken,
        sink: Option<&mut H>,
        delivered: &mut bool,
    ) -> Result<Completion, CompletionError> {
        let config = self.client.config();
        let timeout = config.timeout();
        let body = ChatCompletionRequest {
            model: &attempt.model,
            messages: &req.messages,
            temperature: req.temperature,
            max_tokens: attempt.max_tokens,
            top_p: req.top_p,
            stream: sink.is_some(),
        };

        let send = self
            .client
            .http()
            .post(config.url(CHAT_PATH))
            .headers(config.headers()?)
            .query(&config.query())
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CompletionError::Cancelled),
            r = tokio::time::timeout(timeout, send) => {
                r.map_err(|_| CompletionError::Timeout(timeout))??
            }
        };

        let status = response.status();
        let Some(handler) = sink.filter(|_| status.is_success()) else {
            let bytes = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompletionError::Cancelled),
                r = tokio::time::timeout(timeout, response.bytes()) => {
                    r.map_err(|_| CompletionError::Timeout(timeout))??
                }
            };
            if !status.is_success() {
                return Err(deserialize_api_error(status, &bytes));
            }
            return parse_full_response(req, attempt, &bytes);
        };

        let mut stream = sse::chunk_stream_from_response(response);
        let mut content = String::new();
        let mut served_by = None;
        let mut finish_reason = None;
        let mut usage = None;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompletionError::Cancelled),
                n = tokio::time::timeout(timeout, stream.next()) => {
                    n.map_err(|_| CompletionError::Timeout(timeout))?
                }
            };
            let Some(item) = next else { break };
            let chunk = item?;

            if served_by.is_none() {
                served_by.clone_from(&chunk.model);
            }
            if let Some(reason) = chunk.finish_reason() {
                finish_reason = Some(reason.to_string());
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if let Some(text) = chunk.delta_text() {
                *delivered = true;
                content.push_str(text);
                handler.on_token(text);
            }
        }

        Ok(Completion {
            content,
            model: served_by.unwrap_or_else(|| attempt.model.clone()),
            requested_model: req.model.clone(),
            max_tokens: attempt.max_tokens,
            attempts: attempt.number,
            finish_reason,
            usage,
        })
    }
}

fn parse_full_response(
    req: &ChatRequest,
    attempt: &Attempt,
    bytes: &[u8],
) -> Result<Completion, CompletionError> {
    // Some gateways answer 200 with an error envelope
    if let Some(err) = parse_error_envelope(bytes) {
        return Err(CompletionError::Api(err));
    }
    let parsed: ChatCompletionResponse =
        serde_json::from_slice(bytes).map_err(|e| map_deser(&e, bytes))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Serde("response contained no choices".into()))?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        model: parsed.model.unwrap_or_else(|| attempt.model.clone()),
        requested_model: req.model.clone(),
        max_tokens: attempt.max_tokens,
        attempts: attempt.number,
        finish_reason: choice.finish_reason,
        usage: parsed.usage,
    })
}

impl<C: Config> crate::Client<C> {
    /// Returns the Chat API resource
    #[must_use]
    pub const fn chat(&self) -> Chat<'_, C> {
        Chat::new(self)
    }
}
