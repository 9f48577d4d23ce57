//! Vendor failures surface as classified errors

mod harness;

use axum::http::StatusCode;
use harness::config::ConfigBuilder;
use harness::mock_vendor::{MockVendor, Reply};
use harness::sink::Events;
use relay_config::{Config, ProviderName};
use relay_llm::{Adapter, ChatRequest, ErrorKind, Message};
use serde_json::json;

async fn run(config: Config, provider: ProviderName, model: &str) -> Events {
    let adapter = Adapter::new(config);
    let (sink, mut rx) = relay_llm::channel();
    adapter
        .send_chat(ChatRequest::new(provider, model, vec![Message::user("hi")]), sink)
        .await;
    Events::drain(&mut rx)
}

#[tokio::test]
async fn unauthorized_names_the_provider_for_every_family() {
    let rejected = || Reply::Json(StatusCode::UNAUTHORIZED, json!({"error": {"message": "bad key"}}));
    let cases = [
        (ProviderName::OpenAi, "/v1", "/v1/chat/completions", "gpt-4o", "Invalid OpenAI API key."),
        (ProviderName::Anthropic, "/v1", "/v1/messages", "claude-sonnet-4-5", "Invalid Anthropic API key."),
        (
            ProviderName::Gemini,
            "/v1beta",
            "/v1beta/models/gemini-2.5-pro:streamGenerateContent",
            "gemini-2.5-pro",
            "Invalid Gemini API key.",
        ),
        (ProviderName::Groq, "/v1", "/v1/chat/completions", "llama-3.3-70b", "Invalid Groq API key."),
    ];

    for (provider, prefix, path, model, expected) in cases {
        let mock = MockVendor::start([(path, rejected())]).await.unwrap();
        let config = ConfigBuilder::new().with_provider(provider, &mock.url_with(prefix)).build();

        let events = run(config, provider, model).await;

        assert!(events.texts.is_empty());
        assert_eq!(events.error().kind(), ErrorKind::InvalidCredential, "{provider}");
        assert_eq!(events.error().to_string(), expected);
    }
}

#[tokio::test]
async fn too_many_requests_is_rate_limited_with_the_vendor_message() {
    let mock = MockVendor::start([(
        "/v1/chat/completions",
        Reply::Json(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "Slow down, try again in 20s."}}),
        ),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Deepseek, &mock.url_with("/v1"))
        .build();

    let events = run(config, ProviderName::Deepseek, "deepseek-chat").await;

    assert_eq!(events.error().kind(), ErrorKind::RateLimited);
    assert_eq!(
        events.error().to_string(),
        "Rate limit reached for DeepSeek. Slow down, try again in 20s."
    );
}

#[tokio::test]
async fn gemini_bad_request_for_invalid_key_is_a_credential_error() {
    let mock = MockVendor::start([(
        "/v1beta/models/gemini-2.5-pro:streamGenerateContent",
        Reply::Json(
            StatusCode::BAD_REQUEST,
            json!([{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}]),
        ),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Gemini, &mock.url_with("/v1beta"))
        .build();

    let events = run(config, ProviderName::Gemini, "gemini-2.5-pro").await;

    assert_eq!(events.error().kind(), ErrorKind::InvalidCredential);
    assert_eq!(events.error().to_string(), "Invalid Gemini API key.");
}

#[tokio::test]
async fn server_error_is_a_transport_failure_with_the_vendor_summary() {
    let mock = MockVendor::start([(
        "/v1/chat/completions",
        Reply::Json(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": {"message": "upstream   model\n crashed"}}),
        ),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::OpenAi, &mock.url_with("/v1"))
        .build();

    let events = run(config, ProviderName::OpenAi, "gpt-4o").await;

    assert_eq!(events.error().kind(), ErrorKind::Transport);
    assert_eq!(events.error().to_string(), "upstream model crashed");
}

#[tokio::test]
async fn error_event_inside_the_stream_ends_the_request() {
    let mock = MockVendor::start([(
        "/v1/messages",
        Reply::sse([
            json!({"type": "message_start", "message": {}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Partial"}}),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        ]),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Anthropic, &mock.url_with("/v1"))
        .build();

    let events = run(config, ProviderName::Anthropic, "claude-sonnet-4-5").await;

    assert_eq!(events.full_texts(), vec!["Partial"]);
    assert_eq!(events.error().kind(), ErrorKind::Transport);
    assert_eq!(events.error().to_string(), "Overloaded");
}

#[tokio::test]
async fn missing_credentials_fail_before_any_network_call() {
    let mock = MockVendor::start([]).await.unwrap();
    let mut config = ConfigBuilder::new()
        .with_provider(ProviderName::Mistral, &mock.url_with("/v1"))
        .build();
    config.providers.get_mut(&ProviderName::Mistral).unwrap().api_key = None;

    let events = run(config, ProviderName::Mistral, "mistral-large-latest").await;

    assert_eq!(events.error().kind(), ErrorKind::Config);
    assert_eq!(
        events.error().to_string(),
        "Mistral API key is not set. Add it in the provider settings."
    );
    assert!(mock.requests().is_empty());
}
