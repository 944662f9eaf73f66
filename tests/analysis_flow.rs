use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use voxnote_backend::config::Config;
use voxnote_backend::credentials::{require_api_key, CredentialProvider};
use voxnote_backend::dispatcher::{AnalysisResult, ScriptedClient};
use voxnote_backend::routes::create_routes;
use voxnote_backend::state::{AppState, SessionContext};

fn test_app(client: Arc<ScriptedClient>) -> (Router, AppState) {
    let state = AppState::new(Config::default(), client);
    let app = Router::new()
        .merge(create_routes(state.clone()))
        .with_state(state.clone());
    (app, state)
}

fn multipart_body(boundary: &str, field: &str, filename: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn analyze_request(filename: &str, mime: &str, data: &[u8]) -> Request<Body> {
    let boundary = "------------------------voxnote";
    let body = multipart_body(boundary, "file", filename, mime, data);
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health_reports_configured_model() {
    let (app, _) = test_app(Arc::new(ScriptedClient::new(["ok"])));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model"], "gemini-2.5-pro");
}

#[tokio::test]
async fn test_analyze_silent_clip_returns_backend_text() {
    let script = "transcription: (silence)\n\nsummary: none";
    let client = Arc::new(ScriptedClient::new([script]));
    let (app, _) = test_app(client.clone());

    // 16 bytes of silence, declared as WAV.
    let response = app
        .oneshot(analyze_request("silence.wav", "audio/wav", &[0u8; 16]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["text"], script);
    assert_eq!(json["model"], "gemini-2.5-pro");
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_analyze_accepts_mp3_by_extension_fallback() {
    let client = Arc::new(ScriptedClient::new(["report"]));
    let (app, _) = test_app(client.clone());

    // Browsers sometimes upload audio as application/octet-stream; the
    // filename extension decides then.
    let response = app
        .oneshot(analyze_request(
            "note.mp3",
            "application/octet-stream",
            &[0xFF, 0xFB, 0x90, 0x00],
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_analyze_rejects_unsupported_type_without_upstream_call() {
    let client = Arc::new(ScriptedClient::new(["never sent"]));
    let (app, _) = test_app(client.clone());

    let response = app
        .oneshot(analyze_request("clip.webm", "video/webm", &[1, 2, 3]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .expect("error message")
        .contains("unsupported audio type"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_empty_clip() {
    let client = Arc::new(ScriptedClient::new(["never sent"]));
    let (app, _) = test_app(client.clone());

    let response = app
        .oneshot(analyze_request("empty.wav", "audio/wav", &[]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_without_file_field_is_bad_request() {
    let client = Arc::new(ScriptedClient::new(["never sent"]));
    let (app, _) = test_app(client.clone());

    let boundary = "------------------------voxnote";
    let body = multipart_body(boundary, "comment", "notes.txt", "text/plain", b"hello");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no audio file provided");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_surfaces_upstream_failure() {
    let client = Arc::new(ScriptedClient::failing_after(["x"], 0));
    let (app, _) = test_app(client);

    let response = app
        .oneshot(analyze_request("note.wav", "audio/wav", &[0u8; 16]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(!json["error"].as_str().expect("error message").is_empty());
}

#[tokio::test]
async fn test_report_download_round_trip_is_byte_exact() {
    let (app, state) = test_app(Arc::new(ScriptedClient::new(["unused"])));

    // Including multi-byte characters so any re-encoding would show up.
    let text = "# Résumé\n\n> \u{1F4DD} bonjour\n\n- premier point\n";
    let uid = state.generate_session_uid();
    let mut session = SessionContext::new(uid.clone());
    session.result = Some(AnalysisResult::complete(text));
    state.sessions.insert(uid.clone(), session);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/report/{uid}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("disposition"),
        "attachment; filename=\"voice-note-report.md\""
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "text/markdown; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(bytes.as_ref(), text.as_bytes());
}

#[tokio::test]
async fn test_report_for_unknown_session_is_not_found() {
    let (app, _) = test_app(Arc::new(ScriptedClient::new(["unused"])));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/report/no-such-session")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_credential_refuses_before_any_call() {
    let client = Arc::new(ScriptedClient::new(["never sent"]));

    // Same guard the binary runs before constructing its upstream client.
    let providers = [
        CredentialProvider::env("VOXNOTE_TEST_ABSENT_KEY"),
        CredentialProvider::literal("analysis_config.api_key", None),
    ];
    let err = require_api_key(&providers).expect_err("credential should be absent");

    assert!(err.to_string().contains("VOXNOTE_TEST_ABSENT_KEY"));
    assert_eq!(client.call_count(), 0);
}
