//! Transcription Adapters (§4.5): one `Recognizer` interface behind two
//! implementations — a cloud HTTP API and a local speech-recognition
//! binary. Both normalize their provider's output into `project::Segment`s
//! plus the detected source language, and both parse timestamps
//! defensively: malformed fields become a typed `Transcription` error, never
//! a panic.

pub mod binary;
pub mod cloud;

use crate::audio::AudioChunk;
use crate::error::Result;
use crate::project::Segment;
use async_trait::async_trait;

/// Result of recognizing one audio chunk: its segments (with timestamps
/// already offset to the chunk's position in the original audio) and the
/// language the recognizer detected, if it reports one.
#[derive(Debug, Clone)]
pub struct RecognizedChunk {
    pub segments: Vec<Segment>,
    pub detected_language: Option<String>,
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<RecognizedChunk>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_chunk_is_constructible() {
        let rc = RecognizedChunk {
            segments: Vec::new(),
            detected_language: Some("en".to_string()),
        };
        assert_eq!(rc.detected_language.as_deref(), Some("en"));
    }
}
