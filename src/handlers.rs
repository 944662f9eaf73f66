use axum::extract::ws::Message;
use base64::{engine::general_purpose, Engine as _};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::audio::{encode_wav, AudioInput, AudioMime};
use crate::dispatcher::{AnalysisRequest, AnalysisResult};
use crate::prompt::ANALYSIS_INSTRUCTION;
use crate::state::AppState;

pub async fn handle_message(
    state: &AppState,
    session_uid: &str,
    text: &str,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let msg: Value = serde_json::from_str(text)?;
    let msg_type = msg.get("type").and_then(|v| v.as_str());

    match msg_type {
        Some("mic-audio-data") => {
            handle_mic_audio_data(state, session_uid, &msg).await?;
        }
        Some("mic-audio-end") => {
            handle_mic_audio_end(state, session_uid, &msg, sender).await?;
        }
        Some("upload-audio") => {
            handle_upload_audio(state, session_uid, &msg, sender).await?;
        }
        Some("clear-audio") => {
            handle_clear_audio(state, session_uid).await?;
        }
        Some("start-analysis") => {
            handle_start_analysis(state, session_uid, &msg, sender).await?;
        }
        _ => {
            warn!("Unknown message type: {:?}", msg_type);
        }
    }

    Ok(())
}

async fn handle_mic_audio_data(
    state: &AppState,
    session_uid: &str,
    msg: &Value,
) -> anyhow::Result<()> {
    let samples = msg
        .get("audio")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Vec<f32>>()
        })
        .unwrap_or_default();

    if let Some(mut session) = state.sessions.get_mut(session_uid) {
        session.mic_buffer.extend(samples);
    }

    Ok(())
}

/// Wraps the buffered mic samples into a WAV clip and stages it. Recorded
/// audio is always staged as audio/wav regardless of what the page captured.
async fn handle_mic_audio_end(
    state: &AppState,
    session_uid: &str,
    msg: &Value,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let sample_rate = msg
        .get("sample_rate")
        .and_then(|v| v.as_u64())
        .filter(|&r| r > 0)
        .unwrap_or(48000) as u32;
    let channels = msg
        .get("channels")
        .and_then(|v| v.as_u64())
        .filter(|&c| c > 0)
        .unwrap_or(1) as u16;

    let samples = if let Some(mut session) = state.sessions.get_mut(session_uid) {
        std::mem::take(&mut session.mic_buffer)
    } else {
        Vec::new()
    };

    if samples.is_empty() {
        warn!("No recorded samples for {}", session_uid);
        send_error(sender, "recording is empty").await;
        return Ok(());
    }

    let sample_count = samples.len();
    let wav = encode_wav(&samples, sample_rate, channels)?;
    let input = AudioInput::new(wav, AudioMime::Wav);
    let bytes = input.len();
    if let Some(mut session) = state.sessions.get_mut(session_uid) {
        session.audio = Some(input);
    }

    info!(
        "Staged recording for {}: {} samples at {} Hz",
        session_uid, sample_count, sample_rate
    );
    let _ = sender
        .send(Message::Text(
            serde_json::json!({
                "type": "audio-ready",
                "mime_type": AudioMime::Wav.as_str(),
                "bytes": bytes
            })
            .to_string(),
        ))
        .await;

    Ok(())
}

/// Stages an uploaded file exactly as sent; the declared type decides whether
/// it is accepted, never the content.
async fn handle_upload_audio(
    state: &AppState,
    session_uid: &str,
    msg: &Value,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let label = msg.get("mime_type").and_then(|v| v.as_str()).unwrap_or("");
    let encoded = msg.get("data").and_then(|v| v.as_str()).unwrap_or("");

    let mime = match AudioMime::from_label(label) {
        Some(mime) => mime,
        None => {
            send_error(
                sender,
                &format!("unsupported audio type: {label}; expected wav, mp3, m4a or ogg"),
            )
            .await;
            return Ok(());
        }
    };

    let data = match general_purpose::STANDARD.decode(encoded) {
        Ok(data) if !data.is_empty() => data,
        Ok(_) => {
            send_error(sender, "audio file is empty").await;
            return Ok(());
        }
        Err(e) => {
            send_error(sender, &format!("could not decode audio payload: {e}")).await;
            return Ok(());
        }
    };

    let input = AudioInput::new(data, mime);
    let bytes = input.len();
    if let Some(mut session) = state.sessions.get_mut(session_uid) {
        session.mic_buffer.clear();
        session.audio = Some(input);
    }

    info!("Staged upload for {}: {} bytes, {}", session_uid, bytes, mime);
    let _ = sender
        .send(Message::Text(
            serde_json::json!({
                "type": "audio-ready",
                "mime_type": mime.as_str(),
                "bytes": bytes
            })
            .to_string(),
        ))
        .await;

    Ok(())
}

async fn handle_clear_audio(state: &AppState, session_uid: &str) -> anyhow::Result<()> {
    if let Some(mut session) = state.sessions.get_mut(session_uid) {
        session.clear_audio();
    }
    info!("Cleared staged audio for {}", session_uid);
    Ok(())
}

async fn handle_start_analysis(
    state: &AppState,
    session_uid: &str,
    msg: &Value,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let stream_mode = msg.get("stream").and_then(|v| v.as_bool()).unwrap_or(true);

    let audio = state
        .sessions
        .get(session_uid)
        .and_then(|s| s.audio.clone());
    let audio = match audio {
        Some(audio) => audio,
        None => {
            send_error(sender, "no audio staged; record or upload a clip first").await;
            return Ok(());
        }
    };

    let model = state.config.analysis_config.model.clone();
    let request = AnalysisRequest::new(audio, ANALYSIS_INSTRUCTION, model);

    if stream_mode {
        run_streaming_analysis(state, session_uid, &request, sender).await
    } else {
        run_blocking_analysis(state, session_uid, &request, sender).await
    }
}

async fn run_streaming_analysis(
    state: &AppState,
    session_uid: &str,
    request: &AnalysisRequest,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let _ = sender
        .send(Message::Text(
            serde_json::json!({ "type": "analysis-start" }).to_string(),
        ))
        .await;

    let mut stream = match state.dispatcher.open_stream(request).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(
                "Could not open analysis stream for {}: {}",
                session_uid,
                err.message()
            );
            let _ = sender
                .send(Message::Text(
                    serde_json::json!({
                        "type": "analysis-failed",
                        "error": err.message()
                    })
                    .to_string(),
                ))
                .await;
            return Ok(());
        }
    };

    let mut result = AnalysisResult::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => {
                result.push_fragment(&fragment);
                let _ = sender
                    .send(Message::Text(
                        serde_json::json!({
                            "type": "analysis-fragment",
                            "text": fragment
                        })
                        .to_string(),
                    ))
                    .await;
            }
            Err(err) => {
                // Fragments delivered so far stay in the session buffer.
                warn!(
                    "Analysis stream failed for {} after {} fragments: {}",
                    session_uid,
                    result.fragment_count(),
                    err.message()
                );
                store_result(state, session_uid, result);
                let _ = sender
                    .send(Message::Text(
                        serde_json::json!({
                            "type": "analysis-failed",
                            "error": err.message()
                        })
                        .to_string(),
                    ))
                    .await;
                return Ok(());
            }
        }
    }

    let text = result.text().to_string();
    info!(
        "Analysis complete for {}: {} fragments",
        session_uid,
        result.fragment_count()
    );
    store_result(state, session_uid, result);
    let _ = sender
        .send(Message::Text(
            serde_json::json!({
                "type": "analysis-complete",
                "text": text
            })
            .to_string(),
        ))
        .await;

    Ok(())
}

async fn run_blocking_analysis(
    state: &AppState,
    session_uid: &str,
    request: &AnalysisRequest,
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
) -> anyhow::Result<()> {
    let _ = sender
        .send(Message::Text(
            serde_json::json!({ "type": "analysis-start" }).to_string(),
        ))
        .await;

    match state.dispatcher.dispatch(request).await {
        Ok(result) => {
            let text = result.text().to_string();
            info!("Analysis complete for {}", session_uid);
            store_result(state, session_uid, result);
            let _ = sender
                .send(Message::Text(
                    serde_json::json!({
                        "type": "analysis-complete",
                        "text": text
                    })
                    .to_string(),
                ))
                .await;
        }
        Err(err) => {
            warn!("Analysis failed for {}: {}", session_uid, err.message());
            let _ = sender
                .send(Message::Text(
                    serde_json::json!({
                        "type": "analysis-failed",
                        "error": err.message()
                    })
                    .to_string(),
                ))
                .await;
        }
    }

    Ok(())
}

/// A stored result is served verbatim by the report route and never changes
/// again, so it is finalized on the way in. That covers partial buffers kept
/// after a mid-stream failure.
fn store_result(state: &AppState, session_uid: &str, mut result: AnalysisResult) {
    result.finalize();
    if let Some(mut session) = state.sessions.get_mut(session_uid) {
        session.result = Some(result);
    }
}

async fn send_error(
    sender: &mut futures_util::stream::SplitSink<axum::extract::ws::WebSocket, Message>,
    message: &str,
) {
    let _ = sender
        .send(Message::Text(
            serde_json::json!({
                "type": "error",
                "message": message
            })
            .to_string(),
        ))
        .await;
}
