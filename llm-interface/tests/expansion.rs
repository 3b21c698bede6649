//! Provider tests against a local `wiremock` server; no real API traffic.

use curator_core::{AppConfig, CoreError, ExpansionProvider, LlmError};
use llm_interface::{ClaudeProvider, ExpanderBackend, OpenAiProvider, SemanticExpander};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vocabulary() -> Vec<String> {
    vec!["astronomy".to_string(), "cooking".to_string()]
}

fn claude_reply(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }]
    })
}

#[tokio::test]
async fn claude_returns_related_terms() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_string_contains("claude-3-haiku-20240307"))
        .and(body_string_contains("astronomy, cooking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply(r#"["astronomy"]"#)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("test-key".to_string()).with_base_url(&server.uri());
    let terms = provider.expand("space", &vocabulary()).await.unwrap();

    assert_eq!(terms, vec!["astronomy"]);
}

#[tokio::test]
async fn claude_reply_with_prose_is_still_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply(
            "Here you go:\n[\"astronomy\",\n \"cooking\"]",
        )))
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("k".to_string()).with_base_url(&server.uri());
    let terms = provider.expand("stuff", &vocabulary()).await.unwrap();

    assert_eq!(terms, vec!["astronomy", "cooking"]);
}

#[tokio::test]
async fn claude_unauthorized_maps_to_authentication_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("bad".to_string()).with_base_url(&server.uri());
    let result = provider.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::AuthenticationFailed { .. }))
    ));
}

#[tokio::test]
async fn rate_limit_honours_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("k".to_string()).with_base_url(&server.uri());
    let result = provider.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::RateLimitExceeded { retry_after: 7, .. }))
    ));
}

#[tokio::test]
async fn server_error_maps_to_service_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("k".to_string()).with_base_url(&server.uri());
    let result = provider.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::ServiceUnavailable { .. }))
    ));
}

#[tokio::test]
async fn bad_request_maps_to_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("k".to_string()).with_base_url(&server.uri());
    let result = provider.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::RequestFailed {
            status_code: Some(400),
            ..
        })
    ));
}

#[tokio::test]
async fn openai_returns_related_terms() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "[\"cooking\"]" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("sk-test".to_string()).with_base_url(&server.uri());
    let terms = provider.expand("recipes", &vocabulary()).await.unwrap();

    assert_eq!(terms, vec!["cooking"]);
}

#[tokio::test]
async fn unparsable_reply_is_invalid_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply("no idea")))
        .mount(&server)
        .await;

    let provider = ClaudeProvider::new("k".to_string()).with_base_url(&server.uri());
    let result = provider.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::InvalidResponseFormat { .. }))
    ));
}

#[tokio::test]
async fn backend_from_config_uses_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("claude-test-model"))
        .respond_with(ResponseTemplate::new(200).set_body_json(claude_reply(r#"["cooking"]"#)))
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config
        .llm_api_keys
        .insert("claude".to_string(), "k".to_string());
    config.search.model = Some("claude-test-model".to_string());
    config.search.base_url = Some(server.uri());

    let backend = ExpanderBackend::from_config(&config).unwrap();
    let terms = backend.expand("food", &vocabulary()).await.unwrap();

    assert_eq!(terms, vec!["cooking"]);
}

#[tokio::test]
async fn disabled_backend_reports_model_not_available() {
    let mut config = AppConfig::default();
    config.search.provider = ExpansionProvider::Disabled;

    let backend = ExpanderBackend::from_config(&config).unwrap();
    let result = backend.expand("space", &vocabulary()).await;

    assert!(matches!(
        result,
        Err(CoreError::Llm(LlmError::ModelNotAvailable { .. }))
    ));
}

#[test]
fn missing_key_is_rejected_at_construction() {
    let config = AppConfig::default();
    assert!(matches!(
        ExpanderBackend::from_config(&config),
        Err(CoreError::Llm(LlmError::InvalidApiKey { .. }))
    ));
}
