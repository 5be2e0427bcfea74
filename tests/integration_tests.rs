//! End-to-end tests of the chat driver against a mock server.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatter::chat::{ChatAccumulator, ChatConfig, ChatSession, Renderer};
use chatter::{ChatMessage, ChatRequest, Error, FinishReason, KnownModel, OpenAi};

fn client(base_url: String) -> OpenAi {
    OpenAi::with_options(
        Some("test-key".to_string()),
        Some(base_url),
        Some(Duration::from_secs(5)),
    )
    .expect("client")
}

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("Hi"),
    ]
}

fn sse(frames: &[&str]) -> String {
    frames.iter().map(|frame| format!("data: {frame}\n\n")).collect()
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

#[derive(Default)]
struct Transcript {
    text: String,
}

impl Renderer for Transcript {
    fn print_label(&mut self, _label: &str) {}

    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn print_info(&mut self, _info: &str) {}

    fn print_error(&mut self, _error: &str) {}

    fn finish_response(&mut self) {}
}

#[tokio::test]
async fn buffered_chat_sends_one_message_then_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json; charset=UTF-8"))
        .and(body_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-abc",
            "object": "chat.completion",
            "created": 1677652288,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello! How can I help?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 19, "completion_tokens": 6, "total_tokens": 25}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new(KnownModel::Gpt35Turbo, history());
    let (mut messages, outcome) = client.chat(request, CancellationToken::new()).into_parts();

    let response = messages.recv().await.expect("one response");
    assert_eq!(response.id, "chatcmpl-abc");
    assert_eq!(response.text(), "Hello! How can I help?");
    assert_eq!(
        response.first_choice().and_then(|c| c.finish_reason),
        Some(FinishReason::Stop)
    );
    assert!(messages.recv().await.is_none());
    assert!(outcome.await.expect("outcome").is_ok());
}

#[tokio::test]
async fn buffered_chat_failure_sends_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new(KnownModel::Gpt35Turbo, history());
    let (mut messages, outcome) = client.chat(request, CancellationToken::new()).into_parts();

    assert!(messages.recv().await.is_none());
    let err = outcome.await.expect("outcome").unwrap_err();
    match err {
        Error::UnexpectedStatus {
            status_code, body, ..
        } => {
            assert_eq!(status_code, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn streamed_chat_delivers_every_event_in_order() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#,
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"one"}}]}"#,
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":" two"}}]}"#,
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":" three"}}]}"#,
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let events = client
        .chat(request, CancellationToken::new())
        .collect()
        .await
        .expect("stream completes");

    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.is_chunk() && e.id == "c1"));
    let texts: Vec<&str> = events.iter().map(|e| e.text()).collect();
    assert_eq!(texts, vec!["", "one", " two", " three", ""]);
}

#[tokio::test]
async fn streamed_chat_without_done_is_an_error() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[r#"{"choices":[{"index":0,"delta":{"content":"cut"}}]}"#]),
    )
    .await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let mut stream = client.chat(request, CancellationToken::new());
    assert_eq!(stream.next_message().await.map(|e| e.text().to_string()), Some("cut".to_string()));
    assert!(stream.next_message().await.is_none());
    let err = stream.finish().await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_cancelled());
}

#[tokio::test]
async fn streamed_chat_skips_non_data_lines() {
    let server = MockServer::start().await;
    let body = concat!(
        ": keep-alive\n\n",
        "event: completion\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a\"}}]}\n\n",
        "retry: 1000\n",
        "\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"b\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    mount_stream(&server, body.to_string()).await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let events = client
        .chat(request, CancellationToken::new())
        .collect()
        .await
        .expect("stream completes");
    let texts: Vec<&str> = events.iter().map(|e| e.text()).collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[tokio::test]
async fn streamed_chat_stops_at_invalid_frame() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"never\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    mount_stream(&server, body.to_string()).await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let (mut messages, outcome) = client.chat(request, CancellationToken::new()).into_parts();

    let mut texts = Vec::new();
    while let Some(event) = messages.recv().await {
        texts.push(event.text().to_string());
    }
    assert_eq!(texts, vec!["ok".to_string()]);
    let err = outcome.await.expect("outcome").unwrap_err();
    assert!(matches!(err, Error::InvalidStreamFrame { .. }));
    assert!(err.is_decode());
}

#[tokio::test]
async fn streamed_deltas_accumulate_into_reply() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"lo"}}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let client = client(format!("{}/v1", server.uri()));
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let mut stream = client.chat(request, CancellationToken::new());
    let mut accumulator = ChatAccumulator::new();
    while let Some(event) = stream.next_message().await {
        accumulator.push(&event);
    }
    stream.finish().await.expect("stream completes");
    assert_eq!(accumulator.content(), "Hello");
    assert_eq!(accumulator.into_message(), ChatMessage::assistant("Hello"));
}

#[tokio::test]
async fn session_turn_accumulates_reply() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"lo"}}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let mut session = ChatSession::new(
        client(format!("{}/v1", server.uri())),
        ChatConfig::default(),
    );
    let mut transcript = Transcript::default();
    let reply = session
        .send("Hi", &mut transcript, &CancellationToken::new())
        .await
        .expect("turn succeeds");

    assert_eq!(reply.content, "Hello");
    assert_eq!(transcript.text, "Hello");
    let mut expected = history();
    expected.push(ChatMessage::assistant("Hello"));
    assert_eq!(session.messages(), expected.as_slice());
}

/// Serve one streamed response that sends a single frame and then stalls.
async fn stalled_stream_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = vec![0u8; 8192];
        let _ = socket.read(&mut request).await;
        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
        socket.write_all(head.as_bytes()).await.expect("write head");
        let frame = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"partial\"}}]}\n\n";
        socket.write_all(frame.as_bytes()).await.expect("write frame");
        socket.flush().await.expect("flush");
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    format!("http://{addr}/v1")
}

#[tokio::test]
async fn cancelling_mid_stream_closes_both_channels() {
    let client = client(stalled_stream_server().await);
    let cancel = CancellationToken::new();
    let request = ChatRequest::new_streaming(KnownModel::Gpt35Turbo, history());
    let mut stream = client.chat(request, cancel.clone());

    let first = stream.next_message().await.expect("first event");
    assert_eq!(first.text(), "partial");

    cancel.cancel();
    let (mut messages, outcome) = stream.into_parts();
    let closed = tokio::time::timeout(Duration::from_secs(5), messages.recv())
        .await
        .expect("message channel closes promptly");
    assert!(closed.is_none());
    let err = tokio::time::timeout(Duration::from_secs(5), outcome)
        .await
        .expect("outcome arrives promptly")
        .expect("outcome")
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn cancelling_buffered_chat_closes_both_channels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_json(json!({
                    "object": "chat.completion",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "late"}}]
                })),
        )
        .mount(&server)
        .await;

    let client = client(format!("{}/v1", server.uri()));
    let cancel = CancellationToken::new();
    let request = ChatRequest::new(KnownModel::Gpt35Turbo, history());
    let (mut messages, outcome) = client.chat(request, cancel.clone()).into_parts();

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let closed = tokio::time::timeout(Duration::from_secs(5), messages.recv())
        .await
        .expect("message channel closes promptly");
    assert!(closed.is_none());
    let err = tokio::time::timeout(Duration::from_secs(5), outcome)
        .await
        .expect("outcome arrives promptly")
        .expect("outcome")
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(matches!(err, Error::Abort { .. }));
}

#[tokio::test]
async fn cancelling_mid_stream_keeps_session_history() {
    let mut session = ChatSession::new(
        client(stalled_stream_server().await),
        ChatConfig::default(),
    );
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let mut transcript = Transcript::default();
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        session.send("Hi", &mut transcript, &cancel),
    )
    .await
    .expect("turn ends promptly")
    .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(transcript.text, "partial");
    assert_eq!(
        session.messages(),
        &[ChatMessage::system("You are a helpful assistant.")]
    );
}
