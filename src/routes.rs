use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::audio::{AudioInput, AudioMime};
use crate::dispatcher::AnalysisRequest;
use crate::prompt::ANALYSIS_INSTRUCTION;
use crate::report::markdown_attachment;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let static_dir = state.config.system_config.static_dir.clone();

    Router::new()
        // WebSocket
        .route("/client-ws", get(websocket_handler))
        // Health check
        .route("/api/health", get(health_check))
        // REST API routes
        .route("/api/analyze", post(analyze_audio))
        .route("/api/report/:session_uid", get(download_report))
        // The page itself
        .fallback_service(ServeDir::new(static_dir))
}

async fn websocket_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<AppState>,
) -> axum::response::Response {
    crate::websocket::websocket_handler(ws, State(state)).await
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.config.analysis_config.model
    }))
}

/// Blocking analysis over plain HTTP: one multipart clip in, the whole
/// report out. The streaming path lives on the WebSocket.
async fn analyze_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart payload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let declared = field.content_type().map(ToString::to_string);
        let filename = field.file_name().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read audio field: {e}")))?;

        // Declared type wins; the filename extension covers uploads that
        // arrive as application/octet-stream.
        let mime = declared
            .as_deref()
            .and_then(AudioMime::from_label)
            .or_else(|| filename.as_deref().and_then(AudioMime::from_extension))
            .ok_or_else(|| {
                bad_request("unsupported audio type; expected wav, mp3, m4a or ogg")
            })?;

        if data.is_empty() {
            return Err(bad_request("audio file is empty"));
        }

        let model = state.config.analysis_config.model.clone();
        let request = AnalysisRequest::new(
            AudioInput::new(data.to_vec(), mime),
            ANALYSIS_INSTRUCTION,
            model.clone(),
        );

        let result = state.dispatcher.dispatch(&request).await.map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.message() })),
            )
        })?;

        return Ok(Json(json!({
            "text": result.text(),
            "model": model
        })));
    }

    Err(bad_request("no audio file provided"))
}

/// Serves the finished report for a session as a Markdown download.
async fn download_report(
    State(state): State<AppState>,
    Path(session_uid): Path<String>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    match state.report_text(&session_uid) {
        Some(text) => Ok(markdown_attachment(&text)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no finished report for this session" })),
        )),
    }
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}
