use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::audio::AudioInput;
use crate::config::Config;
use crate::dispatcher::{AnalysisResult, Dispatcher, GenerationClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub sessions: Arc<DashMap<String, SessionContext>>,
}

/// Per-connection working set: samples still being recorded, the staged clip,
/// and the most recent finished report.
#[derive(Clone)]
pub struct SessionContext {
    pub session_uid: String,
    pub mic_buffer: Vec<f32>,
    pub audio: Option<AudioInput>,
    pub result: Option<AnalysisResult>,
}

impl AppState {
    pub fn new(config: Config, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(client),
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn generate_session_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Finished report text for a session, if one completed.
    pub fn report_text(&self, session_uid: &str) -> Option<String> {
        self.sessions
            .get(session_uid)
            .and_then(|s| s.result.as_ref().map(|r| r.text().to_string()))
    }
}

impl SessionContext {
    pub fn new(session_uid: String) -> Self {
        Self {
            session_uid,
            mic_buffer: Vec::new(),
            audio: None,
            result: None,
        }
    }

    /// Drops the staged clip and any buffered mic samples. A finished report
    /// stays downloadable until the session closes.
    pub fn clear_audio(&mut self) {
        self.mic_buffer.clear();
        self.audio = None;
    }
}
