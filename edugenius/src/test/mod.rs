//! End-to-end tests through the full router: real HTTP clients against mocked upstreams.


use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::config::{DEFAULT_CHAT_SYSTEM_MESSAGE, DEFAULT_DOCUMENT_SYSTEM_MESSAGE};
use crate::speech::SpeechService;
use utils::{RecordingCompletion, TestEnv};

const COMPLETIONS_PATH: &str = "/v1beta/openai/chat/completions";

fn completion_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gemini-2.0-flash",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    }))
}

struct Upstreams {
    completion: MockServer,
    speech: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            completion: MockServer::start().await,
            speech: MockServer::start().await,
        }
    }

    fn env(&self) -> TestEnv {
        TestEnv::new().with_upstreams(&format!("{}/v1beta/openai", self.completion.uri()), &self.speech.uri())
    }

    async fn reply_with(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(completion_reply(text))
            .mount(&self.completion)
            .await;
    }

    async fn speak_with(&self, mp3: &'static [u8]) {
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(mp3))
            .mount(&self.speech)
            .await;
    }

    async fn completion_requests(&self) -> Vec<Value> {
        self.completion
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == COMPLETIONS_PATH)
            .map(|r: &Request| r.body_json::<Value>().unwrap())
            .collect()
    }
}

#[test_log::test(tokio::test)]
async fn test_chat_round_trip_with_speech() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("Photosynthesis turns light into chemical energy.").await;
    upstreams.speak_with(b"ID3-mp3-bytes").await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server
        .post("/chat")
        .json(&json!({"messages": [{"role": "user", "content": "What is photosynthesis?"}]}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["response"], "Photosynthesis turns light into chemical energy.");
    assert_eq!(body["model"], "gemini-2.0-flash");
    assert_eq!(body["audio"]["format"], "mp3");
    assert_eq!(body["audio"]["audio_content"], STANDARD.encode(b"ID3-mp3-bytes"));

    let requests = upstreams.completion_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "gemini-2.0-flash");
    assert_eq!(
        requests[0]["messages"],
        json!([
            {"role": "system", "content": DEFAULT_CHAT_SYSTEM_MESSAGE},
            {"role": "user", "content": "What is photosynthesis?"}
        ])
    );

    let tts_requests = upstreams.speech.received_requests().await.unwrap();
    assert_eq!(tts_requests.len(), 1);
    assert!(tts_requests[0].url.query_pairs().any(|(k, v)| k == "tl" && v == "en"));

    // Synthesized audio is not left behind
    assert_eq!(std::fs::read_dir(&env.config.storage.audio_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_chat_custom_system_message_replaces_default() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("Arr.").await;
    upstreams.speak_with(b"mp3").await;
    let env = upstreams.env();
    let server = env.server().await;

    server
        .post("/chat")
        .json(&json!({
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello"},
                {"role": "user", "content": "Tell me about ships"}
            ],
            "system_message": "You are a pirate tutor."
        }))
        .await
        .assert_status_ok();

    let messages = upstreams.completion_requests().await[0]["messages"].clone();
    assert_eq!(messages.as_array().unwrap().len(), 4);
    assert_eq!(messages[0], json!({"role": "system", "content": "You are a pirate tutor."}));
    assert_eq!(messages[3]["content"], "Tell me about ships");
}

#[tokio::test]
async fn test_chat_speech_failure_still_succeeds() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("Still here.").await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstreams.speech)
        .await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server
        .post("/chat")
        .json(&json!({"messages": [{"role": "user", "content": "Hello"}]}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["response"], "Still here.");
    assert_eq!(body["audio"], json!({"audio_content": null, "format": "mp3"}));
}

#[tokio::test]
async fn test_chat_completion_failure_is_500_with_detail() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
        .mount(&upstreams.completion)
        .await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server
        .post("/chat")
        .json(&json!({"messages": [{"role": "user", "content": "Hello"}]}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("429"), "{detail}");
    assert!(detail.contains("quota exhausted"), "{detail}");

    // No speech is attempted when there is no answer
    assert!(upstreams.speech.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_rejects_malformed_json() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server.post("/chat").json(&json!({"system_message": "no messages"})).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("messages"), "{detail}");
    assert!(upstreams.completion_requests().await.is_empty());
}

#[tokio::test]
async fn test_chat_rejects_invalid_json_syntax_with_detail() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server
        .post("/chat")
        .text("{\"messages\": [")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(!body["detail"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_input_rejects_non_multipart_body() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let response = server.post("/voice-input").json(&json!({"file": "recording.wav"})).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert!(!body["detail"].as_str().unwrap().is_empty());
    assert!(env.staged_uploads().is_empty());
}

#[tokio::test]
async fn test_voice_input_duplicate_file_is_422_and_keeps_nothing() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new()
        .add_part("file", Part::bytes(b"first".to_vec()).file_name("a.wav"))
        .add_part("file", Part::bytes(b"second".to_vec()).file_name("b.wav"));
    let response = server.post("/voice-input").multipart(form).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Duplicate field: 'file'");
    assert!(env.staged_uploads().is_empty());
    assert!(upstreams.completion_requests().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_voice_input_transcribes_as_wav_and_deletes_upload() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("the mitochondria is the powerhouse of the cell").await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"webm-audio-bytes".to_vec())
            .file_name("recording.webm")
            .mime_type("audio/webm"),
    );
    let response = server.post("/voice-input").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["transcription"], "the mitochondria is the powerhouse of the cell");
    assert_eq!(body["model"], "gemini-2.0-flash");

    let requests = upstreams.completion_requests().await;
    let messages = requests[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(
        messages[0]["content"][0],
        json!({"type": "text", "text": "Transcribe this audio accurately"})
    );
    assert_eq!(
        messages[0]["content"][1]["input_audio"],
        json!({"data": STANDARD.encode(b"webm-audio-bytes"), "format": "wav"})
    );

    assert!(env.staged_uploads().is_empty());
    // Transcriptions are never voiced
    assert!(upstreams.speech.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_input_without_file_is_422() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new().add_text("note", "forgot the file");
    let response = server.post("/voice-input").multipart(form).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Missing required field: 'file'");
}

#[test_log::test(tokio::test)]
async fn test_document_chat_png_keeps_document() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("This diagram shows a plant cell.").await;
    upstreams.speak_with(b"mp3").await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new()
        .add_text("query", "What does this show?")
        .add_part(
            "file",
            Part::bytes(b"\x89PNG-bytes".to_vec())
                .file_name("diagram.png")
                .mime_type("image/png"),
        );
    let response = server.post("/document-chat").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["response"], "This diagram shows a plant cell.");
    assert_eq!(body["audio"]["audio_content"], STANDARD.encode(b"mp3"));

    let document_id = body["document_id"].as_str().unwrap();
    assert!(document_id.ends_with(".png"), "{document_id}");
    let uploads = env.staged_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name().unwrap().to_str().unwrap(), document_id);

    let messages = upstreams.completion_requests().await[0]["messages"].clone();
    assert_eq!(messages[0], json!({"role": "system", "content": DEFAULT_DOCUMENT_SYSTEM_MESSAGE}));
    assert_eq!(messages[1]["content"][0], json!({"type": "text", "text": "What does this show?"}));
    assert_eq!(messages[1]["content"][1]["type"], "image_url");
    assert_eq!(
        messages[1]["content"][1]["image_url"]["url"],
        format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG-bytes"))
    );
}

#[tokio::test]
async fn test_document_chat_unknown_extension_sent_as_jpeg() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("ok").await;
    upstreams.speak_with(b"mp3").await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new()
        .add_part("file", Part::bytes(b"data".to_vec()).file_name("notes.xyz"))
        .add_text("query", "Summarize")
        .add_text("system_message", "Answer in French.");
    server.post("/document-chat").multipart(form).await.assert_status_ok();

    let messages = upstreams.completion_requests().await[0]["messages"].clone();
    assert_eq!(messages[0]["content"], "Answer in French.");
    let url = messages[1]["content"][1]["image_url"]["url"].as_str().unwrap();
    assert!(url.starts_with("data:image/jpeg;base64,"), "{url}");
}

#[tokio::test]
async fn test_document_chat_missing_query_is_422() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new().add_part("file", Part::bytes(b"%PDF".to_vec()).file_name("a.pdf"));
    let response = server.post("/document-chat").multipart(form).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Missing required field: 'query'");
    assert!(upstreams.completion_requests().await.is_empty());
    // The document is not kept for a rejected request
    assert!(env.staged_uploads().is_empty());
}

#[tokio::test]
async fn test_document_chat_duplicate_file_is_422_and_keeps_nothing() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new()
        .add_text("query", "Compare these")
        .add_part("file", Part::bytes(b"one".to_vec()).file_name("one.png"))
        .add_part("file", Part::bytes(b"two".to_vec()).file_name("two.png"));
    let response = server.post("/document-chat").multipart(form).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Duplicate field: 'file'");
    assert!(env.staged_uploads().is_empty());
    assert!(upstreams.completion_requests().await.is_empty());
}

#[tokio::test]
async fn test_document_chat_speech_failure_still_succeeds() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("A map of Europe.").await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstreams.speech)
        .await;
    let env = upstreams.env();
    let server = env.server().await;

    let form = MultipartForm::new()
        .add_text("query", "What is this?")
        .add_part("file", Part::bytes(b"jpeg-bytes".to_vec()).file_name("map.jpg"));
    let response = server.post("/document-chat").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["response"], "A map of Europe.");
    assert_eq!(body["audio"], json!({"audio_content": null, "format": "mp3"}));
    assert!(body["document_id"].as_str().unwrap().ends_with(".jpg"));
    assert_eq!(env.staged_uploads().len(), 1);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let upstreams = Upstreams::start().await;
    let mut env = upstreams.env();
    env.config.limits.max_upload_bytes = 1024;
    let server = env.server().await;

    let form = MultipartForm::new().add_part("file", Part::bytes(vec![0u8; 64 * 1024]).file_name("big.wav"));
    let response = server.post("/voice-input").multipart(form).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert!(upstreams.completion_requests().await.is_empty());
    assert!(env.staged_uploads().is_empty());
}

#[tokio::test]
async fn test_speech_disabled_returns_null_audio() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("No voice today.").await;
    let mut env = upstreams.env();
    env.config.speech.enabled = false;
    let server = env.server().await;

    let response = server
        .post("/chat")
        .json(&json!({"messages": [{"role": "user", "content": "Hi"}]}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["audio"]["audio_content"], Value::Null);
    assert!(upstreams.speech.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_speech_request_uses_configured_language() {
    let upstreams = Upstreams::start().await;
    upstreams.reply_with("Bonjour.").await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("tl", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fr-mp3".to_vec()))
        .expect(1)
        .mount(&upstreams.speech)
        .await;
    let mut env = upstreams.env();
    env.config.speech.language = "fr".to_string();
    let server = env.server().await;

    let response = server
        .post("/chat")
        .json(&json!({"messages": [{"role": "user", "content": "Salut"}]}))
        .await;

    assert_eq!(response.json::<Value>()["audio"]["audio_content"], STANDARD.encode(b"fr-mp3"));
}

#[tokio::test]
async fn test_landing_page_and_health() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let page = server.get("/").await;
    page.assert_status_ok();
    let html = page.text();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("gemini-2.0-flash"));
    assert!(html.contains("/static/js/script.js"));

    let health = server.get("/healthz").await;
    health.assert_status_ok();
    assert_eq!(health.text(), "OK");
}

#[tokio::test]
async fn test_docs_are_served() {
    let upstreams = Upstreams::start().await;
    let env = upstreams.env();
    let server = env.server().await;

    let docs = server.get("/docs").await;

    docs.assert_status_ok();
    assert!(docs.text().contains("EduGenius API"));
}

#[tokio::test]
async fn test_cors_wildcard_mirrors_origin_with_credentials() {
    let env = TestEnv::new();
    let server = env.server_with(
        Arc::new(RecordingCompletion::replying("hi")),
        SpeechService::disabled(env.config.storage.audio_dir.clone()),
    );

    let response = server
        .method(axum::http::Method::OPTIONS, "/chat")
        .add_header("origin", "https://classroom.example.org")
        .add_header("access-control-request-method", "POST")
        .await;

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://classroom.example.org"
    );
    assert_eq!(response.headers().get("access-control-allow-credentials").unwrap(), "true");
}

#[tokio::test]
async fn test_cors_explicit_origins() {
    let mut env = TestEnv::new();
    env.config.cors.allowed_origins = vec![crate::config::CorsOrigin::Url(
        url::Url::parse("https://edu.example.com").unwrap(),
    )];
    let server = env.server_with(
        Arc::new(RecordingCompletion::replying("hi")),
        SpeechService::disabled(env.config.storage.audio_dir.clone()),
    );

    let allowed = server
        .post("/chat")
        .add_header("origin", "https://edu.example.com")
        .json(&json!({"messages": []}))
        .await;
    assert_eq!(
        allowed.headers().get("access-control-allow-origin").unwrap(),
        "https://edu.example.com"
    );

    let denied = server
        .post("/chat")
        .add_header("origin", "https://elsewhere.example.com")
        .json(&json!({"messages": []}))
        .await;
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_stubbed_completion_sees_history_in_order() {
    let env = TestEnv::new();
    let completion = Arc::new(RecordingCompletion::replying("3"));
    let server = env.server_with(completion.clone(), SpeechService::disabled(env.config.storage.audio_dir.clone()));

    server
        .post("/chat")
        .json(&json!({"messages": [
            {"role": "user", "content": "1+1?"},
            {"role": "assistant", "content": "2"},
            {"role": "user", "content": "and 1+2?"}
        ]}))
        .await
        .assert_status_ok();

    let calls = completion.calls();
    let roles: Vec<_> = calls[0]
        .iter()
        .map(|m| serde_json::to_value(m).unwrap()["role"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
}
