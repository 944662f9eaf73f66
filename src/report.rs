use axum::http::header;
use axum::response::{IntoResponse, Response};

/// Every download uses this name regardless of session or clip.
pub const REPORT_FILENAME: &str = "voice-note-report.md";

/// Wraps finished report text as a Markdown file download. The body is the
/// result text byte for byte; nothing is appended or re-encoded.
pub fn markdown_attachment(text: &str) -> Response {
    let headers = [
        (
            header::CONTENT_TYPE,
            "text/markdown; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILENAME}\""),
        ),
    ];
    (headers, text.to_string()).into_response()
}
