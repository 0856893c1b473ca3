use completion_async::handler::Recorder;
use completion_async::prelude::*;
use completion_async::{CompletionError, StreamHandler};
use completion_async::types::Completion;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOP_FREE: &str = "meta-llama/llama-3.3-70b-instruct:free";

fn test_client_fast_retry(server: &MockServer) -> Client<CompletionConfig> {
    let config = CompletionConfig::new()
        .with_api_base(server.uri())
        .with_api_key("test-api-key");
    Client::with_config(config).with_backoff(
        backon::ExponentialBuilder::default()
            .with_min_delay(std::time::Duration::from_millis(10))
            .with_max_delay(std::time::Duration::from_millis(50))
            .with_max_times(3),
    )
}

fn sse_body(model: &str, tokens: &[&str], done: bool) -> String {
    let mut body = String::new();
    for t in tokens {
        let chunk = json!({"model": model, "choices": [{"delta": {"content": t}, "finish_reason": null}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    let last = json!({"model": model, "choices": [{"delta": {}, "finish_reason": "stop"}]});
    body.push_str(&format!("data: {last}\n\n"));
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn request(model: &str) -> ChatRequest {
    ChatRequest::new(model, vec![ChatMessage::user("tell me a story")]).with_max_tokens(1000)
}

#[tokio::test]
async fn tokens_arrive_in_order_then_one_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(sse_response(sse_body(TOP_FREE, &["Once", " upon", " a time"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let mut recorder = Recorder::default();
    let completion = client
        .chat()
        .stream(request(TOP_FREE), &mut recorder)
        .await
        .unwrap();

    assert_eq!(recorder.tokens, vec!["Once", " upon", " a time"]);
    assert_eq!(recorder.completed.as_deref(), Some("Once upon a time"));
    assert_eq!(recorder.terminal_calls, 1);
    assert!(recorder.error.is_none());
    assert_eq!(completion.content, "Once upon a time");
    assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn stream_failure_before_first_token_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "anthropic/claude-3.5-sonnet"})))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit exceeded", "code": 429}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": TOP_FREE, "max_tokens": 2048})))
        .respond_with(sse_response(sse_body(TOP_FREE, &["fallback"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let mut recorder = Recorder::default();
    let completion = client
        .chat()
        .stream(request("anthropic/claude-3.5-sonnet"), &mut recorder)
        .await
        .unwrap();

    assert_eq!(completion.attempts, 2);
    assert_eq!(recorder.tokens, vec!["fallback"]);
    assert_eq!(recorder.terminal_calls, 1);
}

#[tokio::test]
async fn in_stream_error_after_tokens_is_not_retried() {
    let server = MockServer::start().await;

    let mut body = String::new();
    body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n");
    body.push_str("data: {\"error\":{\"message\":\"provider dropped the stream\"}}\n\n");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let mut recorder = Recorder::default();
    let err = client
        .chat()
        .stream(request(TOP_FREE), &mut recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Api(_)));
    assert_eq!(recorder.tokens, vec!["partial"]);
    assert_eq!(recorder.terminal_calls, 1);
    assert!(recorder.completed.is_none());
}

#[tokio::test]
async fn exhausted_stream_reports_one_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let mut recorder = Recorder::default();
    let err = client
        .chat()
        .stream(request("openai/gpt-4o"), &mut recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Exhausted { attempts: 3, .. }));
    assert_eq!(recorder.terminal_calls, 1);
    assert!(recorder.error.unwrap().contains("boom"));
}

/// Cancels the call as soon as the first token shows up
struct CancelOnFirstToken {
    cancel: CancellationToken,
    inner: Recorder,
}

impl StreamHandler for CancelOnFirstToken {
    fn on_token(&mut self, token: &str) {
        self.inner.on_token(token);
        self.cancel.cancel();
    }

    fn on_complete(&mut self, completion: &Completion) {
        self.inner.on_complete(completion);
    }

    fn on_error(&mut self, error: &CompletionError) {
        self.inner.on_error(error);
    }
}

#[tokio::test]
async fn cancel_mid_stream_stops_delivery() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(sse_body(TOP_FREE, &["one", "two", "three"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let cancel = CancellationToken::new();
    let mut handler = CancelOnFirstToken {
        cancel: cancel.clone(),
        inner: Recorder::default(),
    };
    let err = client
        .chat()
        .stream_with_cancel(request(TOP_FREE), &mut handler, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Cancelled));
    assert_eq!(handler.inner.tokens, vec!["one"]);
    assert_eq!(handler.inner.terminal_calls, 1);
    assert!(handler.inner.completed.is_none());
}

#[tokio::test]
async fn cancel_before_start_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut recorder = Recorder::default();
    let err = client
        .chat()
        .stream_with_cancel(request(TOP_FREE), &mut recorder, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::Cancelled));
    assert_eq!(recorder.terminal_calls, 1);
}

#[tokio::test]
async fn slow_first_byte_times_out_and_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o"})))
        .respond_with(
            sse_response(sse_body("openai/gpt-4o", &["late"], true))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": TOP_FREE})))
        .respond_with(sse_response(sse_body(TOP_FREE, &["fast"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let config = CompletionConfig::new()
        .with_api_base(server.uri())
        .with_api_key("k")
        .with_timeout(std::time::Duration::from_millis(100));
    let client = Client::with_config(config).with_backoff(
        backon::ExponentialBuilder::default()
            .with_min_delay(std::time::Duration::from_millis(10))
            .with_max_times(3),
    );
    let mut recorder = Recorder::default();
    let completion = client
        .chat()
        .stream(request("openai/gpt-4o"), &mut recorder)
        .await
        .unwrap();

    assert_eq!(completion.model, TOP_FREE);
    assert_eq!(recorder.tokens, vec!["fast"]);
}
