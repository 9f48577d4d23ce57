//! Task-decomposition provider against a mock service

mod harness;

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use harness::config::ConfigBuilder;
use harness::mock_vendor::{MockVendor, Reply};
use harness::sink::Events;
use relay_config::ProviderName;
use relay_llm::{
    AbortHandle, AbortRegistration, Adapter, Callbacks, ChatRequest, ErrorKind, FinalMessage, IncrementalDelta,
    LlmError, Message,
};
use serde_json::json;

fn tasks(count: usize) -> Reply {
    let tasks: Vec<_> = (1..=count)
        .map(|n| json!({"id": format!("t{n}"), "description": format!("step {n}")}))
        .collect();
    Reply::Json(StatusCode::OK, json!({ "tasks": tasks }))
}

fn output(text: &str) -> Reply {
    Reply::Json(StatusCode::OK, json!({ "output": text }))
}

fn adapter(mock: &MockVendor) -> Adapter {
    Adapter::new(
        ConfigBuilder::new()
            .with_provider(ProviderName::Division, &mock.url())
            .build(),
    )
}

fn request() -> ChatRequest {
    ChatRequest::new(ProviderName::Division, "division-default", vec![Message::user("Write a CLI")])
}

async fn run(adapter: &Adapter, request: ChatRequest) -> Events {
    let (sink, mut rx) = relay_llm::channel();
    adapter.send_chat(request, sink).await;
    Events::drain(&mut rx)
}

#[tokio::test]
async fn subtask_outputs_accumulate_with_separator() {
    let mock = MockVendor::start([
        ("/decompose", tasks(2)),
        ("/generate", Reply::Sequence(vec![output("Parse args."), output("Print help.")])),
    ])
    .await
    .unwrap();

    let events = run(&adapter(&mock), request()).await;

    assert_eq!(events.full_texts(), vec!["Parse args.", "Parse args.\n\nPrint help."]);
    assert_eq!(events.final_message(), &FinalMessage::text("Parse args.\n\nPrint help."));

    let requests = mock.requests();
    let paths: Vec<_> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/decompose", "/generate", "/generate"]);
    assert_eq!(requests[0].body["prompt"], "User: Write a CLI");
    assert_eq!(requests[0].body["model"], "division-default");
    assert_eq!(requests[0].headers["authorization"], "Bearer test-key");
    assert_eq!(requests[2].body["task"]["id"], "t2");
    assert_eq!(requests[2].body["task"]["description"], "step 2");
}

#[tokio::test]
async fn empty_subtask_outputs_are_skipped() {
    let mock = MockVendor::start([
        ("/decompose", tasks(3)),
        ("/generate", Reply::Sequence(vec![output(""), output("Only this."), output("")])),
    ])
    .await
    .unwrap();

    let events = run(&adapter(&mock), request()).await;

    assert_eq!(events.full_texts(), vec!["Only this."]);
    assert_eq!(events.final_message().full_text, "Only this.");
    assert_eq!(mock.requests().len(), 4);
}

#[tokio::test]
async fn nothing_generated_is_an_empty_response() {
    let mock = MockVendor::start([("/decompose", tasks(2)), ("/generate", output(""))])
        .await
        .unwrap();

    let events = run(&adapter(&mock), request()).await;

    assert!(events.texts.is_empty());
    assert_eq!(events.error().kind(), ErrorKind::EmptyResponse);
}

#[tokio::test]
async fn no_subtasks_is_an_empty_response() {
    let mock = MockVendor::start([("/decompose", tasks(0))]).await.unwrap();

    let events = run(&adapter(&mock), request()).await;

    assert_eq!(events.error().kind(), ErrorKind::EmptyResponse);
    assert_eq!(mock.only_request().path, "/decompose");
}

#[tokio::test]
async fn rejected_key_names_the_service() {
    let mock = MockVendor::start([(
        "/decompose",
        Reply::Json(StatusCode::UNAUTHORIZED, json!({"error": "unauthorized"})),
    )])
    .await
    .unwrap();

    let events = run(&adapter(&mock), request()).await;

    assert_eq!(events.error().kind(), ErrorKind::InvalidCredential);
    assert_eq!(events.error().to_string(), "Invalid Division API key.");
}

#[tokio::test]
async fn abort_between_subtasks_resolves_as_empty_final() {
    let mock = MockVendor::start([
        ("/decompose", tasks(3)),
        ("/generate", Reply::Sequence(vec![output("first"), output("second")])),
    ])
    .await
    .unwrap();

    let handle: Arc<Mutex<Option<AbortHandle>>> = Arc::default();
    let slot = Arc::clone(&handle);
    let registration = AbortRegistration::new(move |h| *slot.lock().unwrap() = Some(h));

    let texts: Arc<Mutex<Vec<String>>> = Arc::default();
    let finals: Arc<Mutex<Vec<FinalMessage>>> = Arc::default();
    let errors: Arc<Mutex<Vec<LlmError>>> = Arc::default();
    let sink = Callbacks {
        on_text: {
            let texts = Arc::clone(&texts);
            let handle = Arc::clone(&handle);
            move |delta: &IncrementalDelta| {
                texts.lock().unwrap().push(delta.full_text.clone());
                if let Some(handle) = handle.lock().unwrap().as_ref() {
                    handle.abort();
                }
            }
        },
        on_final_message: {
            let finals = Arc::clone(&finals);
            move |message: FinalMessage| finals.lock().unwrap().push(message)
        },
        on_error: {
            let errors = Arc::clone(&errors);
            move |error: LlmError| errors.lock().unwrap().push(error)
        },
    };

    adapter(&mock).send_chat(request().with_abort(registration), sink).await;

    assert_eq!(*texts.lock().unwrap(), vec!["first".to_owned()]);
    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(*finals.lock().unwrap(), vec![FinalMessage::empty()]);
    let generated = mock.requests().iter().filter(|r| r.path == "/generate").count();
    assert_eq!(generated, 1);
}
