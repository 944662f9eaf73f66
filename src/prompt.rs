/// The fixed instruction sent with every clip. It asks the model for a
/// three-section Markdown report and is never user-editable. Nothing
/// downstream parses the report; the structure exists for the reader.
pub const ANALYSIS_INSTRUCTION: &str = "\
You are an expert analyst with impeccable summarization and formatting skills.
Analyze the attached audio recording and produce a structured, readable report.

Language rules:
1. Detect the dominant language spoken in the audio.
2. Write the ENTIRE response in that language.

Structure and formatting (strict Markdown):

**1. \u{1F4DD} [\"Transcription\" heading, in the detected language]**
> Present the transcription as a block quote so the raw text stands apart
> from the rest of the report.

---

**2. \u{26A1} [\"Executive Summary\" heading, in the detected language]**
* Organize the summary as bullet points.
* Bold the key idea at the start of each bullet.
* Keep the summary articulate and logically ordered.

---

**3. \u{1F9E0} [\"Analysis & Critical Perspective\" heading, in the detected language]**
* Challenge the ideas presented in the recording.
* Cite consensus scientific sources or established theoretical models to
  support or qualify the claims.
* Be critical but constructive.

Style criteria:
* Adaptive tone: match the register of the audio (formal, technical, casual).
* Directness: never write \"the speaker\" or \"the person\"; state the content
  directly.";
