use crate::audio::AudioInput;

/// One user-triggered analysis: a clip, the fixed instruction, and the model
/// that should receive it. Constructed once, never mutated; the dispatcher
/// borrows it for exactly one upstream call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    audio: AudioInput,
    instruction: String,
    model: String,
}

impl AnalysisRequest {
    pub fn new(audio: AudioInput, instruction: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            audio,
            instruction: instruction.into(),
            model: model.into(),
        }
    }

    pub fn audio(&self) -> &AudioInput {
        &self.audio
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// The accumulating response buffer. Streaming mode appends fragments in
/// arrival order; non-streaming mode sets the text once. Finalization marks
/// the upstream call complete, after which the buffer no longer changes.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    text: String,
    fragments: usize,
    finalized: bool,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-streaming outcome: the whole text at once, already final.
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fragments: 0,
            finalized: true,
        }
    }

    /// Append one fragment exactly as it arrived. No-op once finalized.
    pub fn push_fragment(&mut self, fragment: &str) {
        if self.finalized {
            return;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
