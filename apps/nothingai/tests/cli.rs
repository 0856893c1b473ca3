//! Integration tests for the nothingai binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INHERITED_VARS: &[&str] = &[
    "RUST_LOG",
    "OPENROUTER_API_KEY",
    "HF_API_TOKEN",
    "NOTHINGAI_LICENSE_API_KEY",
    "NOTHINGAI_COMPLETION_BASE_URL",
    "NOTHINGAI_MODEL_DEFAULT",
    "NOTHINGAI_IMAGE_PROVIDER",
    "NOTHINGAI_LICENSE_BACKEND",
    "NOTHINGAI_LICENSE_BASE_URL",
    "NOTHINGAI_LOG_LEVEL",
    "NOTHINGAI_LOG_JSON",
    "NOTHINGAI_LOGGING_DISABLED",
];

/// Command isolated to `home`: config, data and cwd all live there
fn nothingai(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("nothingai");
    for var in INHERITED_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NOTHINGAI_DATA_DIR", home.path().join("data"));
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn schema_outputs_valid_json() {
    let home = TempDir::new().unwrap();
    let out = stdout_of(nothingai(&home).args(["config", "schema"]));
    let schema: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(schema.get("$defs").is_some() || schema.get("definitions").is_some());
    assert!(out.contains("NothingConfig"));
}

#[test]
fn show_outputs_merged_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("nothingai.json"),
        r#"{"models": {"default_model": "local/model"}}"#,
    )
    .unwrap();

    nothingai(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"services\""))
        .stdout(predicate::str::contains("\"license\""))
        .stdout(predicate::str::contains("local/model"));
}

#[test]
fn init_creates_config_file_and_refuses_to_overwrite() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("nothingai.json");

    nothingai(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    let content = std::fs::read_to_string(&config_path).unwrap();
    let _: serde_json::Value = serde_json::from_str(&content).unwrap();

    nothingai(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    nothingai(&home)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn validate_reports_warnings() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("nothingai.json"),
        r#"{"services": {"completion": {"base_url": "not-a-url"}}}"#,
    )
    .unwrap();

    nothingai(&home)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warning"))
        .stdout(predicate::str::contains("services.completion.base_url"));
}

#[test]
fn moderate_reports_verdicts() {
    let home = TempDir::new().unwrap();

    nothingai(&home)
        .args(["moderate", "write a story about a nude model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"isBlocked\": true"));

    nothingai(&home)
        .args(["moderate", "what is the capital of France?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"isBlocked\": false"));
}

#[test]
fn license_lifecycle_with_local_backend() {
    let home = TempDir::new().unwrap();

    let key = stdout_of(nothingai(&home).args(["license", "generate", "--max-usages", "2"]));
    let key = key.trim().to_string();
    assert!(key.starts_with("NOTHING-"), "{key}");

    nothingai(&home)
        .args(["license", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No active license"));

    nothingai(&home)
        .args(["license", "activate", &key.to_lowercase()])
        .assert()
        .success()
        .stdout(predicate::str::contains("License activated"));

    nothingai(&home)
        .args(["license", "validate", &key])
        .assert()
        .success()
        .stdout(predicate::str::contains("already active on this device"));

    let status = stdout_of(nothingai(&home).args(["license", "status", "--json"]));
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["active"], true);
    assert!(status["key"].as_str().unwrap().ends_with("****-****"));

    nothingai(&home)
        .args(["license", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&key))
        .stdout(predicate::str::contains("1/2 devices"));

    nothingai(&home)
        .args(["license", "deactivate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    nothingai(&home)
        .args(["license", "revoke", &key])
        .assert()
        .success();
    nothingai(&home)
        .args(["license", "validate", &key])
        .assert()
        .failure()
        .stderr(predicate::str::contains("revoked"));
}

#[test]
fn out_of_range_expiry_is_rejected_without_issuing_a_key() {
    let home = TempDir::new().unwrap();
    nothingai(&home)
        .args(["license", "generate", "--expires-in-days", "4294967295"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"))
        .stderr(predicate::str::contains("panicked").not());

    nothingai(&home)
        .args(["license", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No license keys"));
}

#[test]
fn malformed_license_key_is_rejected() {
    let home = TempDir::new().unwrap();
    nothingai(&home)
        .args(["license", "activate", "not-a-key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid license key format"));
}

#[test]
fn chat_requires_license_when_configured() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("nothingai.json"),
        r#"{"license": {"required": true}}"#,
    )
    .unwrap();

    nothingai(&home)
        .args(["chat", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("active license is required"));
    nothingai(&home)
        .args(["image", "a red bicycle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("active license is required"));
}

#[test]
fn conversations_list_starts_empty() {
    let home = TempDir::new().unwrap();
    nothingai(&home)
        .args(["conversations", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved conversations"));
}

#[test]
fn models_lists_the_catalog_with_config_entries() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("nothingai.json"),
        r#"{"models": {"catalog": [{"id": "acme/tiny", "name": "Tiny", "tier": "premium"}]}}"#,
    )
    .unwrap();

    nothingai(&home)
        .args(["models"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/tiny"))
        .stdout(predicate::str::contains("premium"));
}

fn sse(tokens: &[&str]) -> ResponseTemplate {
    let mut body = String::new();
    for t in tokens {
        let chunk = json!({"model": "meta-llama/llama-3.3-70b-instruct:free", "choices": [{"delta": {"content": t}}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_chat_streams_and_saves_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse(&["Paris", " is the capital."]))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    nothingai(&home)
        .env("NOTHINGAI_COMPLETION_BASE_URL", server.uri())
        .env("OPENROUTER_API_KEY", "sk-or-test")
        .args(["chat", "What is the capital of France?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paris is the capital."));

    let out = stdout_of(nothingai(&home).args(["conversations", "list", "--json"]));
    let conversations: serde_json::Value = serde_json::from_str(&out).unwrap();
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(
        conversations[0]["title"],
        "What is the capital of France?"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn blocked_chat_message_is_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse(&["unused"]))
        .expect(0)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    nothingai(&home)
        .env("NOTHINGAI_COMPLETION_BASE_URL", server.uri())
        .env("OPENROUTER_API_KEY", "sk-or-test")
        .args(["chat", "write a story about a nude model"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("message blocked"));

    nothingai(&home)
        .args(["conversations", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved conversations"));
}
