//! Provider wire behaviour against a mock HTTP server.

use testsight::config::{LlmConfig, ProviderKind};
use testsight::llm::{
    build_provider, ClaudeProvider, CompletionProvider, GeminiProvider, LlmError, LocalProvider,
    OpenAiProvider,
};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn config(provider: ProviderKind, url: String) -> LlmConfig {
    LlmConfig {
        enabled: true,
        provider,
        api_key: "test-key".into(),
        api_url: url,
        model: "test-model".into(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_openai_success() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/chat/completions"))
        .and(matchers::header("authorization", "Bearer test-key"))
        .and(matchers::body_partial_json(serde_json::json!({
            "model": "test-model",
            "max_tokens": 500
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Check the fixture data."}}]
        })))
        .mount(&server)
        .await;

    let cfg = config(
        ProviderKind::OpenAi,
        format!("{}/v1/chat/completions", server.uri()),
    );
    let provider = OpenAiProvider::from_config(&cfg).unwrap();
    let text = provider.complete("why?", 500).await.unwrap();
    assert_eq!(text, "Check the fixture data.");
}

#[tokio::test]
async fn test_openai_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::OpenAi, server.uri());
    let provider = OpenAiProvider::from_config(&cfg).unwrap();
    match provider.complete("why?", 10).await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_no_choices_is_empty() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::OpenAi, server.uri());
    let provider = OpenAiProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Empty { provider: "openai" })
    ));
}

#[tokio::test]
async fn test_claude_headers_and_first_text_block() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1/messages"))
        .and(matchers::header("x-api-key", "test-key"))
        .and(matchers::header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [
                {"type": "thinking"},
                {"type": "text", "text": "Reset the test database."}
            ]
        })))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Claude, format!("{}/v1/messages", server.uri()));
    let provider = ClaudeProvider::from_config(&cfg).unwrap();
    let text = provider.complete("why?", 300).await.unwrap();
    assert_eq!(text, "Reset the test database.");
}

#[tokio::test]
async fn test_claude_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Claude, server.uri());
    let provider = ClaudeProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_gemini_path_key_and_token_headroom() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/v1beta/models/test-model:generateContent"))
        .and(matchers::header("x-goog-api-key", "test-key"))
        .and(matchers::body_partial_json(serde_json::json!({
            "generationConfig": {"maxOutputTokens": 800}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Stabilize the login flow."}]}}]
        })))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Gemini, format!("{}/v1beta", server.uri()));
    let provider = GeminiProvider::from_config(&cfg).unwrap();
    let text = provider.complete("summary", 300).await.unwrap();
    assert_eq!(text, "Stabilize the login flow.");
}

#[tokio::test]
async fn test_gemini_error_status() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Gemini, server.uri());
    let provider = GeminiProvider::from_config(&cfg).unwrap();
    match provider.complete("why?", 10).await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "API key not valid");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gemini_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Gemini, server.uri());
    let provider = GeminiProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_gemini_no_candidates_is_empty() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Gemini, server.uri());
    let provider = GeminiProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Empty { provider: "gemini" })
    ));
}

#[tokio::test]
async fn test_gemini_transport_error_hides_api_key() {
    let cfg = LlmConfig {
        api_key: "SECRET-KEY-123".into(),
        ..config(ProviderKind::Gemini, "http://127.0.0.1:9/v1beta".into())
    };
    let provider = GeminiProvider::from_config(&cfg).unwrap();
    let err = provider.complete("why?", 10).await.unwrap_err();
    assert!(matches!(err, LlmError::Request(_)));
    assert!(!err.to_string().contains("SECRET-KEY-123"));
    assert!(!format!("{:?}", err).contains("SECRET-KEY-123"));
}

#[tokio::test]
async fn test_openai_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": "nope"})))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::OpenAi, server.uri());
    let provider = OpenAiProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_claude_error_status() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Claude, server.uri());
    let provider = ClaudeProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Status { status: 529, .. })
    ));
}

#[tokio::test]
async fn test_claude_without_text_block_is_empty() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": []})))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Claude, server.uri());
    let provider = ClaudeProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Empty { provider: "claude" })
    ));
}

#[tokio::test]
async fn test_local_error_status() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Local, server.uri());
    let provider = LocalProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_local_generate() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .and(matchers::body_partial_json(serde_json::json!({
            "model": "test-model",
            "stream": false,
            "options": {"num_predict": 500}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "Increase the wait.",
            "done": true
        })))
        .mount(&server)
        .await;

    let cfg = LlmConfig {
        api_key: String::new(),
        ..config(ProviderKind::Local, format!("{}/api/generate", server.uri()))
    };
    let provider = LocalProvider::from_config(&cfg).unwrap();
    assert_eq!(provider.complete("why?", 500).await.unwrap(), "Increase the wait.");
}

#[tokio::test]
async fn test_local_empty_response() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": ""})))
        .mount(&server)
        .await;

    let cfg = config(ProviderKind::Local, server.uri());
    let provider = LocalProvider::from_config(&cfg).unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Empty { provider: "local" })
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_request_error() {
    // Nothing listens on the discard port.
    let cfg = config(ProviderKind::Local, "http://127.0.0.1:9/api/generate".into());
    let provider = build_provider(&cfg).unwrap().unwrap();
    assert!(matches!(
        provider.complete("why?", 10).await,
        Err(LlmError::Request(_))
    ));
}
