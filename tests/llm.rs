//! Gemini client contract tests against a mock server

use glance_gateway::{Error, GeminiClient, LanguageModel};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";
const ENDPOINT: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn candidate(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key", MODEL).with_base_url(server.uri())
}

#[tokio::test]
async fn test_request_shape_and_fenced_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "who wrote dune" }] }],
            "tools": [{ "google_search": {} }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(candidate("```json\n{\"Answer\": \"Frank Herbert.\"}\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let answer = client_for(&server).await.generate("who wrote dune").await.unwrap();
    assert_eq!(answer, "Frank Herbert.");
}

#[tokio::test]
async fn test_plain_json_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(r#"{"Answer":"x"}"#)))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).await.generate("q").await.unwrap(), "x");
}

#[tokio::test]
async fn test_missing_answer_field_is_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(r#"{"NotAnswer":"x"}"#)))
        .mount(&server)
        .await;

    let err = client_for(&server).await.generate("q").await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
}

#[tokio::test]
async fn test_no_candidates_is_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server).await.generate("q").await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
}

#[tokio::test]
async fn test_provider_error_message_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).await.generate("q").await.unwrap_err();
    let Error::Upstream(message) = err else {
        panic!("expected upstream error, got {err}");
    };
    assert_eq!(message, "API key not valid.");
}

#[tokio::test]
async fn test_bare_server_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.generate("q").await.unwrap_err();
    assert!(matches!(err, Error::Upstream(ref m) if m.contains("500")), "{err}");
}
