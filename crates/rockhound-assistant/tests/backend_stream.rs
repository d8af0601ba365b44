//! Streams replies from a mock LLM server speaking server-sent events.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use futures::StreamExt;
use rockhound_assistant::AssistantClient;
use rockhound_core::config::{AssistantConfig, BackendKind};
use rockhound_core::{AssistantTransport, TransportError, TurnRequest};
use rockhound_types::{ChatMessage, DifficultyTier, GeoPoint, MessageAuthor};
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

const OPENAI_BODY: &str = concat!(
    ": keep-alive\n\n",
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Nice quartz! \"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"[NAME=Quartz][RARITY=Com\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"mon][SCORE=5]\"}}]}\n\n",
    "data: [DONE]\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
);

const ANTHROPIC_BODY: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Fair swap. \"}}\r\n\r\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"[TRADE_ACCEPTED=true]\"}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

async fn openai(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.requests.lock().await.push((headers, body));
    ([(header::CONTENT_TYPE, "text/event-stream")], OPENAI_BODY)
}

async fn anthropic(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    recorded.requests.lock().await.push((headers, body));
    ([(header::CONTENT_TYPE, "text/event-stream")], ANTHROPIC_BODY)
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

async fn mid_stream_error() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Let me look\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"rate limited\"}}\n\n",
        ),
    )
}

async fn spawn_mock() -> (String, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/v1/chat/completions", post(openai))
        .route("/v1/messages", post(anthropic))
        .route("/down/chat/completions", post(overloaded))
        .route("/flaky/chat/completions", post(mid_stream_error))
        .with_state(recorded.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn write_templates(dir: &Path) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
    for name in ["system", "chat", "challenge", "investigation", "trade"] {
        let file = format!("{name}.j2");
        std::fs::copy(root.join(&file), dir.join(&file)).unwrap();
    }
}

fn client(backend: BackendKind, api_url: String, templates: &Path) -> AssistantClient {
    let config = AssistantConfig {
        backend,
        api_url,
        api_key: Some("sk-test".to_owned()),
        templates_dir: templates.to_path_buf(),
        ..AssistantConfig::default()
    };
    AssistantClient::from_config(&config).unwrap()
}

fn chat(text: &str) -> TurnRequest {
    TurnRequest::Chat {
        text: text.to_owned(),
        images: Vec::new(),
        location: Some(GeoPoint {
            latitude: 38.5,
            longitude: -107.25,
        }),
        score: 0,
        tier: DifficultyTier::Beginner,
    }
}

async fn collect(
    client: &AssistantClient,
    request: TurnRequest,
    history: Vec<ChatMessage>,
) -> Vec<Result<String, TransportError>> {
    client.stream_reply(request, history).collect().await
}

#[tokio::test]
async fn openai_stream_yields_text_until_done() {
    let (base, recorded) = spawn_mock().await;
    let templates = tempfile::tempdir().unwrap();
    write_templates(templates.path());
    let client = client(BackendKind::OpenAi, format!("{base}/v1"), templates.path());

    let items = collect(&client, chat("What did I find?"), Vec::new()).await;
    let text: String = items.into_iter().map(Result::unwrap).collect();
    assert_eq!(text, "Nice quartz! [NAME=Quartz][RARITY=Common][SCORE=5]");

    let requests = recorded.requests.lock().await;
    let (headers, body) = &requests[0];
    assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-test");
    assert_eq!(body["stream"], Value::Bool(true));
    assert_eq!(body["messages"][0]["role"], "system");
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("What did I find?"));
    assert!(user.ends_with("Latitude: 38.5, Longitude: -107.25. My current score is 0."));
}

#[tokio::test]
async fn anthropic_stream_uses_its_own_headers_and_events() {
    let (base, recorded) = spawn_mock().await;
    let templates = tempfile::tempdir().unwrap();
    write_templates(templates.path());
    let client = client(BackendKind::Anthropic, format!("{base}/v1"), templates.path());

    let history = vec![
        ChatMessage {
            author: MessageAuthor::Assistant,
            text: "Welcome to RockHound!".to_owned(),
            image_url: None,
        },
        ChatMessage {
            author: MessageAuthor::User,
            text: "Hello".to_owned(),
            image_url: None,
        },
    ];
    let request = TurnRequest::Challenge {
        location: None,
        score: 900,
        tier: DifficultyTier::Intermediate,
    };
    let items = collect(&client, request, history).await;
    let text: String = items.into_iter().map(Result::unwrap).collect();
    assert_eq!(text, "Fair swap. [TRADE_ACCEPTED=true]");

    let requests = recorded.requests.lock().await;
    let (headers, body) = &requests[0];
    assert_eq!(headers["x-api-key"], "sk-test");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert!(body["system"].as_str().unwrap().contains("Clover A. Cole"));
}

#[tokio::test]
async fn error_status_becomes_a_single_error_item() {
    let (base, _) = spawn_mock().await;
    let templates = tempfile::tempdir().unwrap();
    write_templates(templates.path());
    let client = client(BackendKind::OpenAi, format!("{base}/down"), templates.path());

    let items = collect(&client, chat("hi"), Vec::new()).await;
    assert_eq!(
        items,
        vec![Err(TransportError::Status {
            status: 503,
            body: "overloaded".to_owned(),
        })]
    );
}

#[tokio::test]
async fn error_event_ends_the_stream() {
    let (base, _) = spawn_mock().await;
    let templates = tempfile::tempdir().unwrap();
    write_templates(templates.path());
    let client = client(BackendKind::OpenAi, format!("{base}/flaky"), templates.path());

    let items = collect(&client, chat("hi"), Vec::new()).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok("Let me look".to_owned()));
    assert!(matches!(&items[1], Err(TransportError::Aborted(message)) if message.contains("rate limited")));
}

#[tokio::test]
async fn unreachable_backend_is_reported() {
    let templates = tempfile::tempdir().unwrap();
    write_templates(templates.path());
    let client = client(
        BackendKind::OpenAi,
        "http://127.0.0.1:1/v1".to_owned(),
        templates.path(),
    );

    let items = collect(&client, chat("hi"), Vec::new()).await;
    assert!(matches!(items.as_slice(), [Err(TransportError::Unreachable(_))]));
}

#[tokio::test]
async fn missing_templates_fail_at_startup() {
    let empty = tempfile::tempdir().unwrap();
    let config = AssistantConfig {
        api_key: Some("sk-test".to_owned()),
        templates_dir: empty.path().to_path_buf(),
        ..AssistantConfig::default()
    };
    assert!(AssistantClient::from_config(&config).is_err());
}
