//! Fill-in-middle against mock vendor servers

mod harness;

use axum::http::StatusCode;
use harness::config::ConfigBuilder;
use harness::mock_vendor::{MockVendor, Reply};
use harness::sink::Events;
use relay_config::{ModelOverride, ProviderName};
use relay_llm::{Adapter, ErrorKind, FimRequest, FinalMessage};
use serde_json::json;

async fn run(adapter: &Adapter, request: FimRequest) -> Events {
    let (sink, mut rx) = relay_llm::channel();
    adapter.send_fill_in_middle(request, sink).await;
    Events::drain(&mut rx)
}

#[tokio::test]
async fn compatible_gateway_completes_in_one_emission() {
    let mock = MockVendor::start([(
        "/v1/completions",
        Reply::Json(StatusCode::OK, json!({"choices": [{"index": 0, "text": "a + b"}]})),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::OpenAiCompatible, &mock.url_with("/v1"))
        .build();
    let adapter = Adapter::new(config);

    let request = FimRequest::new(
        ProviderName::OpenAiCompatible,
        "qwen2.5-coder-7b",
        "fn add(a: i32, b: i32) -> i32 {\n    ",
        "\n}",
    )
    .with_stop(vec!["\n\n".to_owned()]);
    let events = run(&adapter, request).await;

    assert_eq!(events.full_texts(), vec!["a + b"]);
    assert_eq!(events.final_message(), &FinalMessage::text("a + b"));

    let body = mock.only_request().body;
    assert_eq!(body["model"], "qwen2.5-coder-7b");
    assert_eq!(body["prompt"], "fn add(a: i32, b: i32) -> i32 {\n    ");
    assert_eq!(body["suffix"], "\n}");
    assert_eq!(body["stop"], json!(["\n\n"]));
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn mistral_uses_its_fim_endpoint_and_message_shape() {
    let mock = MockVendor::start([(
        "/v1/fim/completions",
        Reply::Json(
            StatusCode::OK,
            json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "x * 2"}}]}),
        ),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Mistral, &mock.url_with("/v1"))
        .build();
    let adapter = Adapter::new(config);

    let events = run(
        &adapter,
        FimRequest::new(ProviderName::Mistral, "codestral-latest", "let y = ", ";"),
    )
    .await;

    assert_eq!(events.final_message().full_text, "x * 2");
    let request = mock.only_request();
    assert_eq!(request.path, "/v1/fim/completions");
    assert_eq!(request.headers["authorization"], "Bearer test-key");
}

#[tokio::test]
async fn ollama_streams_ndjson_until_done() {
    let mock = MockVendor::start([(
        "/api/generate",
        Reply::Lines(vec![
            json!({"model": "qwen2.5-coder", "response": "Some(", "done": false}).to_string(),
            json!({"model": "qwen2.5-coder", "response": "value)", "done": false}).to_string(),
            json!({"model": "qwen2.5-coder", "response": "", "done": true}).to_string(),
        ]),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Ollama, &mock.url())
        .build();
    let adapter = Adapter::new(config);

    let events = run(
        &adapter,
        FimRequest::new(ProviderName::Ollama, "qwen2.5-coder:7b", "return ", "\n"),
    )
    .await;

    assert_eq!(events.full_texts(), vec!["Some(", "Some(value)"]);
    assert_eq!(events.final_message().full_text, "Some(value)");

    let body = mock.only_request().body;
    assert_eq!(body["stream"], true);
    assert_eq!(body["options"]["num_predict"], 300);
}

#[tokio::test]
async fn resolved_model_name_is_sent_and_reported() {
    let mock = MockVendor::start([(
        "/api/generate",
        Reply::Lines(vec![json!({"response": "ok", "done": true}).to_string()]),
    )])
    .await
    .unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Ollama, &mock.url())
        .with_model(
            ProviderName::Ollama,
            "coder",
            ModelOverride {
                resolved_name: Some("starcoder2:3b".to_owned()),
                supports_fim: Some(true),
                ..ModelOverride::default()
            },
        )
        .with_model(
            ProviderName::Ollama,
            "chatty",
            ModelOverride {
                resolved_name: Some("llama3.1:8b".to_owned()),
                ..ModelOverride::default()
            },
        )
        .build();
    let adapter = Adapter::new(config);

    let events = run(&adapter, FimRequest::new(ProviderName::Ollama, "coder", "a", "b")).await;
    assert_eq!(events.full_texts(), vec!["ok"]);
    assert_eq!(events.final_message().full_text, "ok");
    assert_eq!(mock.only_request().body["model"], "starcoder2:3b");

    let events = run(&adapter, FimRequest::new(ProviderName::Ollama, "chatty", "a", "b")).await;
    assert_eq!(events.error().kind(), ErrorKind::Unsupported);
    assert_eq!(
        events.error().to_string(),
        "Model chatty (llama3.1:8b) does not support FIM."
    );
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn providers_without_fim_refuse_without_a_request() {
    let mock = MockVendor::start([]).await.unwrap();
    let config = ConfigBuilder::new()
        .with_provider(ProviderName::Anthropic, &mock.url_with("/v1"))
        .build();
    let adapter = Adapter::new(config);

    let events = run(
        &adapter,
        FimRequest::new(ProviderName::Anthropic, "claude-sonnet-4-5", "a", "b"),
    )
    .await;

    assert_eq!(events.error().kind(), ErrorKind::Unsupported);
    assert_eq!(events.error().to_string(), "Anthropic does not support fill-in-middle.");
    assert!(mock.requests().is_empty());
}
