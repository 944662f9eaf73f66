use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::client::{FragmentStream, GenerationClient};
use super::request::AnalysisRequest;
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, RequestError};

/// Gemini generateContent client. Audio goes inline in the request body as
/// base64, so clip size is bounded by the API's inline payload limit rather
/// than anything on our side.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig, api_key: String) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        info!(
            "Initialized GeminiClient: base_url={}, timeout={}s",
            config.base_url, config.request_timeout_secs
        );
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Single-turn request body: the clip first, then the instruction text.
    fn request_body(request: &AnalysisRequest) -> Value {
        let b64_audio = general_purpose::STANDARD.encode(request.audio().data());
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.audio().mime().as_str(),
                            "data": b64_audio
                        }
                    },
                    { "text": request.instruction() }
                ]
            }]
        })
    }

    /// Joins the text of every part in the first candidate. None when the
    /// response carries no text at all (blocked prompt, metadata-only chunk).
    fn extract_text(value: &Value) -> Option<String> {
        let parts = value
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let mut text = String::new();
        for part in parts {
            if let Some(piece) = part.get("text").and_then(Value::as_str) {
                text.push_str(piece);
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn upstream_failure(status: StatusCode, body: &str) -> RequestError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return RequestError::new(format!("upstream rejected the API credential ({status})"));
    }
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(ToString::to_string)
        });
    match detail {
        Some(message) => RequestError::new(format!("upstream request failed ({status}): {message}")),
        None => RequestError::new(format!("upstream request failed with status {status}")),
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, RequestError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model());
        debug!(
            "Sending generation request: model={}, audio_bytes={}",
            request.model(),
            request.audio().len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Generation request failed: status={}", status);
            return Err(upstream_failure(status, &body));
        }

        let value: Value = response.json().await?;
        Self::extract_text(&value)
            .ok_or_else(|| RequestError::new("upstream response contained no text"))
    }

    async fn generate_stream(
        &self,
        request: &AnalysisRequest,
    ) -> Result<FragmentStream, RequestError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            request.model()
        );
        debug!(
            "Opening generation stream: model={}, audio_bytes={}",
            request.model(),
            request.audio().len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Generation stream rejected: status={}", status);
            return Err(upstream_failure(status, &body));
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                buffer.extend_from_slice(&chunk);

                // SSE events are newline-delimited; a chunk may carry a
                // partial line, so hold the tail until its newline arrives.
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if let Some(data) = line.strip_prefix("data: ") {
                        if data.trim() == "[DONE]" {
                            continue;
                        }
                        let value: Value = serde_json::from_str(data)?;
                        if let Some(text) = Self::extract_text(&value) {
                            yield text;
                        }
                    }
                }
            }
        };
        Ok(Box::new(Box::pin(stream)))
    }
}
