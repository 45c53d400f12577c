//! HTTP-level tests for the extraction client against a mock Gemini server.

use medtrack_llm::{ClientConfig, ExtractionError, GeminiClient, NameExtraction, EXTRACTION_INSTRUCTION};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(ClientConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        ..ClientConfig::default()
    })
}

fn model_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_extracts_name_from_structured_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "cG5nLWJ5dGVz" } },
                    { "text": EXTRACTION_INSTRUCTION }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(r#"{"name": "Jane Doe"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).extract_name("image/png", b"png-bytes").await;
    assert_eq!(outcome, NameExtraction::Found("Jane Doe".into()));
}

#[tokio::test]
async fn test_unknown_reply_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(r#"{"name": "Unknown"}"#)))
        .mount(&server)
        .await;

    let outcome = client_for(&server).extract_name("application/pdf", b"%PDF").await;
    assert_eq!(outcome, NameExtraction::NotFound);
}

#[tokio::test]
async fn test_server_error_reported_then_absorbed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);

    match client.request_name("image/jpeg", b"jpeg").await {
        Err(ExtractionError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "backend exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }

    // The never-failing entry point turns the same status into Failed
    let outcome = client.extract_name("image/jpeg", b"jpeg").await;
    assert!(outcome.is_failure());
    assert!(matches!(outcome, NameExtraction::Failed(reason) if reason.contains("500")));
}

#[tokio::test]
async fn test_malformed_reply_becomes_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("I could not read it")))
        .mount(&server)
        .await;

    let outcome = client_for(&server).extract_name("image/png", b"png").await;
    assert!(outcome.is_failure());
}

#[tokio::test]
async fn test_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).extract_name("image/png", b"png").await;
    assert!(outcome.is_failure());
}
