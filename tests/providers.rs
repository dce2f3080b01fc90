//! Provider behaviour against mock HTTP backends.
//!
//! Each test starts a `wiremock` server and points the provider at it through
//! the endpoint override variables, so no real API key or network is needed.

use markpdfdown::llm::{try_with_retry, CompletionRequest, LlmClient, RetryPolicy};
use markpdfdown::{BackendError, LlmSettings};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

fn fake_png() -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    f.write_all(b"\x89PNG\r\n\x1a\nfake").unwrap();
    f
}

fn chat_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

fn json_body(req: &Request) -> Option<Value> {
    serde_json::from_slice(&req.body).ok()
}

/// Accepts a chat body whose user content is a text part followed by at
/// least one data-URI image part.
struct TextThenImage;

impl Match for TextThenImage {
    fn matches(&self, req: &Request) -> bool {
        let Some(body) = json_body(req) else {
            return false;
        };
        let Some(messages) = body["messages"].as_array() else {
            return false;
        };
        let Some(user) = messages.iter().find(|m| m["role"] == "user") else {
            return false;
        };
        let Some(parts) = user["content"].as_array() else {
            return false;
        };
        parts.len() >= 2
            && parts[0]["type"] == "text"
            && parts[1..].iter().all(|p| {
                p["type"] == "image_url"
                    && p["image_url"]["url"]
                        .as_str()
                        .is_some_and(|u| u.starts_with("data:image/"))
            })
    }
}

/// Accepts a generateContent body with inline image data before the text.
struct ImagesThenText;

impl Match for ImagesThenText {
    fn matches(&self, req: &Request) -> bool {
        let Some(body) = json_body(req) else {
            return false;
        };
        let Some(parts) = body["contents"][0]["parts"].as_array() else {
            return false;
        };
        let Some((last, images)) = parts.split_last() else {
            return false;
        };
        !images.is_empty()
            && last["text"].is_string()
            && images.iter().all(|p| p["inline_data"]["data"].is_string())
    }
}

fn openai_settings(server: &MockServer) -> LlmSettings {
    LlmSettings::from_pairs([
        ("LLM_PROVIDER", "openai"),
        ("OPENAI_API_KEY", "test-key"),
        ("OPENAI_API_BASE", server.uri().as_str()),
    ])
}

#[tokio::test]
async fn openai_vision_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("X-Title", "MarkPDFdown"))
        .and(TextThenImage)
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("mock text")))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::from_settings(&openai_settings(&server)).unwrap();
    let image = fake_png();
    let request = CompletionRequest::new("Describe this")
        .with_system_prompt("You are a helpful assistant")
        .with_image(image.path())
        .with_temperature(0.3)
        .with_max_tokens(500);

    assert_eq!(client.completion(&request).await.unwrap(), "mock text");

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "You are a helpful assistant");
}

#[tokio::test]
async fn deepseek_uses_openai_key_fallback_and_own_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer shared-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("ok")))
        .mount(&server)
        .await;

    let settings = LlmSettings::from_pairs([
        ("OPENAI_API_KEY", "shared-key"),
        ("OPENAI_API_BASE", server.uri().as_str()),
    ]);
    let client = LlmClient::from_identity(&settings, "deepseek").unwrap();
    assert_eq!(client.provider().identity(), "deepseek");
    assert_eq!(
        client.completion(&CompletionRequest::new("hi")).await.unwrap(),
        "ok"
    );

    let body: Value =
        serde_json::from_slice(&server.received_requests().await.unwrap()[0].body).unwrap();
    assert_eq!(body["model"], "deepseek-chat");
}

#[tokio::test]
async fn http_error_becomes_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let client = LlmClient::from_settings(&openai_settings(&server)).unwrap();
    let err = client
        .completion(&CompletionRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(err.is_auth_error());
    match err {
        BackendError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn null_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let client = LlmClient::from_settings(&openai_settings(&server)).unwrap();
    assert!(matches!(
        client.completion(&CompletionRequest::new("hi")).await,
        Err(BackendError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn retry_recovers_from_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("second time")))
        .mount(&server)
        .await;

    let client = LlmClient::from_settings(&openai_settings(&server)).unwrap();
    let policy = RetryPolicy::new(3, Duration::from_millis(10));
    let text = try_with_retry(&client, &CompletionRequest::new("hi"), &policy)
        .await
        .unwrap();
    assert_eq!(text, "second time");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_provider_is_rejected_before_any_request() {
    let settings = LlmSettings::from_pairs([("LLM_PROVIDER", "claude"), ("OPENAI_API_KEY", "k")]);
    let err = LlmClient::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("openai, deepseek, gemini"));
}

#[cfg(feature = "gemini")]
#[tokio::test]
async fn gemini_multimodal_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .and(ImagesThenText)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "gemini "}, {"text": "says hi"}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = LlmSettings::from_pairs([
        ("LLM_PROVIDER", "Gemini"),
        ("GOOGLE_API_KEY", "g-key"),
        ("GEMINI_API_BASE", server.uri().as_str()),
    ]);
    let client = LlmClient::from_settings(&settings).unwrap();
    let image = fake_png();
    let request = CompletionRequest::new("Describe this")
        .with_system_prompt("Be brief")
        .with_image(image.path())
        .with_max_tokens(256);

    assert_eq!(client.completion(&request).await.unwrap(), "gemini says hi");

    let body: Value =
        serde_json::from_slice(&server.received_requests().await.unwrap()[0].body).unwrap();
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    assert_eq!(
        body["contents"][0]["parts"][0]["inline_data"]["mime_type"],
        "image/png"
    );
}

#[cfg(feature = "gemini")]
#[tokio::test]
async fn gemini_without_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let settings = LlmSettings::from_pairs([
        ("GEMINI_API_KEY", "g"),
        ("GEMINI_API_BASE", server.uri().as_str()),
    ]);
    let client = LlmClient::from_identity(&settings, "gemini").unwrap();
    assert!(matches!(
        client.completion(&CompletionRequest::new("hi")).await,
        Err(BackendError::MalformedResponse { .. })
    ));
}
