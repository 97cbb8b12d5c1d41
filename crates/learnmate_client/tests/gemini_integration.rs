//! Integration tests for the Gemini client: streaming send, structured
//! generation, and error mapping. Uses a minimal in-process HTTP server
//! speaking just enough HTTP/1.1 for one request each (no mocks).

use learnmate_client::quiz::quiz_schema;
use learnmate_client::{Error, GeminiClient, ModelClient, ResolvedApi, StreamEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Accept one connection, read the full request (headers + body), reply with
/// `response`, and close the socket.
async fn serve_once(listener: TcpListener, response: String) {
    let (mut sock, _) = listener.accept().await.unwrap();

    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 4096];
    let (body_start, content_length) = loop {
        let n = sock.read(&mut tmp).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_string();
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            break (pos + 4, content_length);
        }
    };
    while buf.len() < body_start + content_length {
        let n = sock.read(&mut tmp).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    sock.write_all(response.as_bytes()).await.unwrap();
    sock.shutdown().await.unwrap();
}

/// Spawn a one-shot server; returns the client pointed at it.
async fn client_for(response: String) -> GeminiClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve_once(listener, response));
    GeminiClient::new(ResolvedApi {
        api_key: "test-key".into(),
        model: "gemini-2.5-flash".into(),
        base_url: format!("http://127.0.0.1:{}", port),
    })
}

fn sse_response(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let event = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": fragment }] } }]
        });
        body.push_str(&format!("data: {}\n\n", event));
    }
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        body
    )
}

fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn error_response(status: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
        status
    )
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streaming_send_delivers_fragments_in_order() {
    let mut client = client_for(sse_response(&["Photosynthesis ", "is ", "how plants eat."])).await;

    let rx = client
        .send_message_streaming("What is photosynthesis?")
        .await
        .expect("send should succeed");
    let events = collect(rx).await;

    let chunks: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks.concat(), "Photosynthesis is how plants eat.");
    assert_eq!(events.last(), Some(&StreamEvent::Done));
}

#[tokio::test]
async fn exhausted_stream_commits_turn_to_session() {
    let mut client = client_for(sse_response(&["Hi!"])).await;

    let rx = client.send_message_streaming("hello").await.unwrap();
    let _ = collect(rx).await;

    // One user turn plus one model turn.
    assert_eq!(client.ensure_session().turn_count().await, 2);
}

#[tokio::test]
async fn connection_refused_is_transport_error_and_preserves_session() {
    // Bind then drop so the port is free but unoccupied.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut client = GeminiClient::new(ResolvedApi {
        api_key: "test-key".into(),
        model: "gemini-2.5-flash".into(),
        base_url: format!("http://127.0.0.1:{}", port),
    });

    let err = client
        .send_message_streaming("hello")
        .await
        .expect_err("send should fail");
    assert!(matches!(err, Error::Transport(_)), "got: {:?}", err);
    assert_eq!(client.ensure_session().turn_count().await, 0);
}

#[tokio::test]
async fn http_error_status_is_transport_error() {
    let mut client = client_for(error_response("500 Internal Server Error")).await;

    let err = client
        .send_message_streaming("hello")
        .await
        .expect_err("send should fail");
    match err {
        Error::Transport(detail) => assert!(detail.contains("500"), "got: {}", detail),
        other => panic!("expected transport error, got: {:?}", other),
    }
}

#[tokio::test]
async fn reset_session_discards_history() {
    let mut client = client_for(sse_response(&["Sure."])).await;

    let rx = client.send_message_streaming("hello").await.unwrap();
    let _ = collect(rx).await;
    assert_eq!(client.ensure_session().turn_count().await, 2);

    client.reset_session();
    assert_eq!(client.ensure_session().turn_count().await, 0);
}

// ---------------------------------------------------------------------------
// Structured generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn structured_generation_parses_question_sequence() {
    let quiz_json = r#"[{"question":"What is H2O?","answer":"Water."},{"question":"What is NaCl?","answer":"Salt."}]"#;
    let body = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": quiz_json }] } }]
    })
    .to_string();
    let client = client_for(json_response(&body)).await;

    let questions = client
        .generate_structured("generate a quiz", quiz_schema())
        .await
        .expect("generation should succeed");

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].question, "What is H2O?");
    assert_eq!(questions[0].answer, "Water.");
    assert_eq!(questions[1].question, "What is NaCl?");
}

#[tokio::test]
async fn structured_generation_rejects_non_json_text() {
    let body = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": "Here is your quiz!" }] } }]
    })
    .to_string();
    let client = client_for(json_response(&body)).await;

    let err = client
        .generate_structured("generate a quiz", quiz_schema())
        .await
        .expect_err("generation should fail");
    assert!(matches!(err, Error::SchemaParse(_)), "got: {:?}", err);
}

#[tokio::test]
async fn structured_generation_surfaces_api_failure() {
    let client = client_for(error_response("503 Service Unavailable")).await;

    let err = client
        .generate_structured("generate a quiz", quiz_schema())
        .await
        .expect_err("generation should fail");
    assert!(matches!(err, Error::Generation(_)), "got: {:?}", err);
}

#[tokio::test]
async fn structured_generation_surfaces_error_payload() {
    let body = serde_json::json!({ "error": { "message": "quota exceeded" } }).to_string();
    let client = client_for(json_response(&body)).await;

    let err = client
        .generate_structured("generate a quiz", quiz_schema())
        .await
        .expect_err("generation should fail");
    match err {
        Error::Generation(detail) => assert!(detail.contains("quota exceeded")),
        other => panic!("expected generation error, got: {:?}", other),
    }
}
