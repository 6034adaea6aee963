//! Full-pipeline test: real HTTP client against a mocked completion
//! service, SQLite persistence, and the engine in between.

use std::sync::Arc;

use chrono::Utc;
use pageforge_core::{Draft, JobStatus};
use pageforge_engine::{DraftService, Engine, GenerationOptions, RetryPolicy};
use pageforge_llm::LlmClient;
use pageforge_storage::{SqliteStore, StateStore};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body_for(doc: &str) -> String {
    // Split the document into a few chunks to exercise accumulation.
    let thirds = doc.len() / 3;
    let chunks = [&doc[..thirds], &doc[thirds..2 * thirds], &doc[2 * thirds..]];
    let mut body = String::new();
    for chunk in chunks {
        let frame = serde_json::json!({"choices": [{"delta": {"content": chunk}}]});
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

async fn mock_completion_service(server: &MockServer, styles: &str, doc: &str) {
    // Phase 1: the non-streaming style decision asks for JSON.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(
            serde_json::json!({"response_format": {"type": "json_object"}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": styles, "role": "assistant"}}]
        })))
        .mount(server)
        .await;

    // Phase 2: streaming generation calls.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body_for(doc), "text/event-stream"),
        )
        .mount(server)
        .await;
}

fn test_doc() -> String {
    format!("<!DOCTYPE html><html><body><h1>Coffee</h1>{}</body></html>", "beans ".repeat(30))
}

#[tokio::test]
async fn coffee_shop_landing_page_end_to_end() {
    let server = MockServer::start().await;
    let doc = test_doc();
    mock_completion_service(
        &server,
        r#"["Warm Rustic","Modern Minimal","Playful Bright"]"#,
        &doc,
    )
    .await;

    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();
    let store = SqliteStore::in_memory().unwrap();
    let persist: Arc<dyn StateStore> = Arc::new(store.clone());

    // A pending draft exists before generation starts.
    let drafts = DraftService::new(Arc::clone(&persist));
    drafts
        .save(&Draft {
            prompt: "Coffee shop landing page".to_owned(),
            reference_image: None,
            style_kit_id: None,
            site_mode: false,
            page_names: vec![],
            saved_at: Utc::now(),
        })
        .await;

    let engine = Engine::new(Arc::new(client), persist)
        .with_batch_width(2)
        .with_retry_policy(RetryPolicy::single_attempt());

    let options = GenerationOptions { variant_count: 3, ..GenerationOptions::default() };
    let session_id = engine.generate("Coffee shop landing page", &options).await.unwrap();

    // Three artifacts, styled by phase 1, all complete with the streamed
    // document assembled in order.
    let snapshot = engine.snapshot();
    let session = snapshot.session(&session_id).unwrap();
    assert_eq!(session.artifacts.len(), 3);
    let labels: Vec<&str> = session.artifacts.iter().map(|a| a.style_label.as_str()).collect();
    assert_eq!(labels, ["Warm Rustic", "Modern Minimal", "Playful Bright"]);
    for artifact in &session.artifacts {
        assert_eq!(artifact.status, JobStatus::Complete);
        assert_eq!(artifact.content, doc);
        // One version entry per artifact.
        assert_eq!(engine.versions(&artifact.id).len(), 1);
    }

    // The session and its version entries were persisted, and the draft
    // was cleared once generation began.
    let persisted = store.load_sessions().await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].id, session_id);
    for artifact in &session.artifacts {
        assert_eq!(store.version_entries(&artifact.id).await.unwrap().len(), 1);
    }
    assert!(store.load_draft().await.unwrap().is_none());
}

#[tokio::test]
async fn service_error_marks_artifacts_failed_but_session_survives() {
    let server = MockServer::start().await;

    // Phase 1 succeeds, streaming calls are rejected outright.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(
            serde_json::json!({"response_format": {"type": "json_object"}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "[\"Solo\"]", "role": "assistant"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let client = LlmClient::new("test-key".to_owned(), server.uri()).unwrap();
    let store = SqliteStore::in_memory().unwrap();
    let engine = Engine::new(Arc::new(client), Arc::new(store))
        .with_retry_policy(RetryPolicy::single_attempt());

    let options = GenerationOptions { variant_count: 1, ..GenerationOptions::default() };
    let session_id = engine.generate("Doomed page", &options).await.unwrap();

    let snapshot = engine.snapshot();
    let artifact = &snapshot.session(&session_id).unwrap().artifacts[0];
    assert_eq!(artifact.status, JobStatus::Error);
    assert!(artifact.content.contains("Generation failed"));
    // Failures leave no version entry.
    assert!(engine.versions(&artifact.id).is_empty());
}
