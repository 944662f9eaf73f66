use std::io::Cursor;

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};

/// The closed set of audio types the app accepts. Anything the browser
/// declares is normalized into one of these or rejected; the bytes behind
/// the label are never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMime {
    Wav,
    Mpeg,
    M4a,
    Ogg,
}

impl AudioMime {
    /// Canonical label sent to the upstream API.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMime::Wav => "audio/wav",
            AudioMime::Mpeg => "audio/mpeg",
            AudioMime::M4a => "audio/m4a",
            AudioMime::Ogg => "audio/ogg",
        }
    }

    /// Normalize a declared content type. Browsers are inconsistent about
    /// labels for the same container, so the common aliases map in.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match label.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(AudioMime::Wav),
            "audio/mpeg" | "audio/mp3" => Some(AudioMime::Mpeg),
            "audio/m4a" | "audio/x-m4a" | "audio/mp4" | "audio/aac" => Some(AudioMime::M4a),
            "audio/ogg" | "application/ogg" | "audio/opus" => Some(AudioMime::Ogg),
            _ => None,
        }
    }

    /// Fallback for uploads that arrive without a usable content type.
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" => Some(AudioMime::Wav),
            "mp3" => Some(AudioMime::Mpeg),
            "m4a" | "mp4" | "aac" => Some(AudioMime::M4a),
            "ogg" | "oga" | "opus" => Some(AudioMime::Ogg),
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque audio clip: raw bytes plus the declared type. The app never
/// parses or re-encodes the bytes; they travel to the upstream call as-is.
#[derive(Debug, Clone)]
pub struct AudioInput {
    data: Vec<u8>,
    mime: AudioMime,
}

impl AudioInput {
    pub fn new(data: Vec<u8>, mime: AudioMime) -> Self {
        Self { data, mime }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime(&self) -> AudioMime {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Wrap captured mic samples in a 16-bit PCM WAV container.
///
/// The page streams normalized f32 samples over the WebSocket; the upstream
/// API wants a real file, so this is the one place the backend touches audio
/// content at all. Clipping keeps out-of-range samples from wrapping.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec)?;
        for &sample in samples {
            let clipped = sample.clamp(-1.0, 1.0);
            let amplitude = (clipped * i16::MAX as f32) as i16;
            writer.write_sample(amplitude)?;
        }
        writer.finalize()?;
    }
    Ok(buffer.into_inner())
}
