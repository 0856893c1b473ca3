use completion_async::handler::Recorder;
use completion_async::prelude::*;
use completion_async::{CompletionError, ErrorKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOP_FREE: &str = "meta-llama/llama-3.3-70b-instruct:free";

fn test_client_fast_retry(server: &MockServer) -> Client<CompletionConfig> {
    let config = CompletionConfig::new()
        .with_api_base(server.uri())
        .with_api_key("test-api-key")
        .with_title("NothingAI");
    Client::with_config(config).with_backoff(
        backon::ExponentialBuilder::default()
            .with_min_delay(std::time::Duration::from_millis(10))
            .with_max_delay(std::time::Duration::from_millis(50))
            .with_max_times(3),
    )
}

fn completion_body(model: &str, content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "model": model,
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

fn request(model: &str, max_tokens: u32) -> ChatRequest {
    ChatRequest::new(model, vec![ChatMessage::system("be brief"), ChatMessage::user("hi")])
        .with_temperature(0.7)
        .with_max_tokens(max_tokens)
}

#[tokio::test]
async fn create_sends_headers_and_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(header("x-title", "NothingAI"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4o-mini",
            "max_tokens": 512,
            "stream": false,
            "messages": [{"role": "system", "content": "be brief"}, {"role": "user", "content": "hi"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("openai/gpt-4o-mini", "Hello!")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let completion = client
        .chat()
        .create(request("openai/gpt-4o-mini", 512))
        .await
        .unwrap();

    assert_eq!(completion.content, "Hello!");
    assert_eq!(completion.attempts, 1);
    assert!(!completion.fell_back());
    assert_eq!(completion.usage.unwrap().total_tokens, 7);
}

#[tokio::test]
async fn token_budget_is_clamped_to_tier_maximum() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": TOP_FREE, "max_tokens": 4096})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(TOP_FREE, "ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let completion = client.chat().create(request(TOP_FREE, 50_000)).await.unwrap();
    assert_eq!(completion.max_tokens, 4096);
}

#[tokio::test]
async fn premium_failure_falls_back_to_top_free_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o", "max_tokens": 8000})))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {"message": "Insufficient credits", "code": 402}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": TOP_FREE, "max_tokens": 2048})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(TOP_FREE, "free answer")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let completion = client
        .chat()
        .create(request("openai/gpt-4o", 8000))
        .await
        .unwrap();

    assert_eq!(completion.content, "free answer");
    assert_eq!(completion.attempts, 2);
    assert_eq!(completion.model, TOP_FREE);
    assert_eq!(completion.requested_model, "openai/gpt-4o");
    assert_eq!(completion.max_tokens, 2048);
    assert!(completion.fell_back());
}

#[tokio::test]
async fn top_free_model_shrinks_budget_then_exhausts() {
    let server = MockServer::start().await;

    for budget in [4000, 2800, 1960] {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": TOP_FREE, "max_tokens": budget})))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = test_client_fast_retry(&server);
    let err = client
        .chat()
        .create(request(TOP_FREE, 4000))
        .await
        .unwrap_err();

    let CompletionError::Exhausted { attempts, last } = &err else {
        panic!("expected Exhausted, got {err:?}");
    };
    assert_eq!(*attempts, 3);
    assert!(last.to_string().contains("upstream unavailable"));
    assert_eq!(err.kind(), ErrorKind::Server);
}

#[tokio::test]
async fn missing_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = CompletionConfig::new()
        .with_api_base(server.uri())
        .with_secret(None);
    let client = Client::with_config(config);
    let err = client.chat().create(request(TOP_FREE, 10)).await.unwrap_err();
    assert!(matches!(err, CompletionError::Config(_)));
}

#[tokio::test]
async fn invalid_temperature_is_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let mut recorder = Recorder::default();
    let req = request(TOP_FREE, 10).with_temperature(3.5);
    let err = client.chat().stream(req, &mut recorder).await.unwrap_err();

    assert!(matches!(err, CompletionError::Validation(_)));
    assert_eq!(recorder.terminal_calls, 1);
    assert!(recorder.tokens.is_empty());
    assert!(recorder.error.is_some());
}

#[tokio::test]
async fn error_envelope_with_200_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "model overloaded"}
        })))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client_fast_retry(&server);
    let err = client.chat().create(request(TOP_FREE, 100)).await.unwrap_err();
    assert!(err.to_string().contains("model overloaded"));
}
