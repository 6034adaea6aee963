use futures_util::StreamExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::service::{CompletionRequest, CompletionService};

async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

fn create_test_request() -> CompletionRequest {
    CompletionRequest::text("hello")
}

#[tokio::test]
async fn test_complete_success() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri());
    let client = client.unwrap();
    let request = create_test_request();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {
                    "content": "test response",
                    "role": "assistant"
                }
            }]
        })))
        .mount(&server)
        .await;

    let result = client.complete(&request).await.unwrap();
    assert_eq!(result, "test response");
}

#[tokio::test]
async fn test_complete_http_status_error() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();
    let request = create_test_request();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.complete(&request).await.unwrap_err();
    match err {
        LlmError::HttpStatus { code, ref body } => {
            assert_eq!(code, 429);
            assert_eq!(body, "Rate limit exceeded");
        },
        ref other => panic!("expected HttpStatus, got {other}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_complete_permanent_status_not_transient() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = client.complete(&create_test_request()).await.unwrap_err();
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_complete_empty_choices() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let err = client.complete(&create_test_request()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

fn sse_body(frames: &[&str]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn test_stream_assembles_chunks_in_order() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    let body = sse_body(&[
        r#"{"choices":[{"delta":{"content":"<html>"}}]}"#,
        r#"{"choices":[{"delta":{"content":"<body>hi</body>"}}]}"#,
        r#"{"choices":[{"delta":{}}]}"#,
        r#"{"choices":[{"delta":{"content":"</html>"}}]}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = client.stream(&create_test_request()).await.unwrap();
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }
    assert_eq!(chunks, vec!["<html>", "<body>hi</body>", "</html>"]);
}

#[tokio::test]
async fn test_stream_stops_at_done_marker() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    let body = format!(
        "data: {}\n\ndata: [DONE]\n\ndata: {}\n\n",
        r#"{"choices":[{"delta":{"content":"before"}}]}"#,
        r#"{"choices":[{"delta":{"content":"after"}}]}"#,
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = client.stream(&create_test_request()).await.unwrap();
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }
    assert_eq!(chunks, vec!["before"]);
}

#[tokio::test]
async fn test_stream_malformed_frame_is_error() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    let body = "data: not json\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = client.stream(&create_test_request()).await.unwrap();
    let first = stream.next().await.unwrap();
    let err = first.unwrap_err();
    assert!(matches!(err, LlmError::Stream(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_stream_http_error_before_first_chunk() {
    let server = setup_mock_server().await;
    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = match client.stream(&create_test_request()).await {
        Ok(_) => panic!("expected error"),
        Err(e) => e,
    };
    assert!(matches!(err, LlmError::HttpStatus { code: 503, .. }));
}
