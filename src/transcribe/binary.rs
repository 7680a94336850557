//! Local speech-recognition binary recognizer (§4.5): spawns an external
//! process per chunk and normalizes its JSON output into `project::Segment`s.
//! Grounded in the teacher's `std::process::Command` usage in
//! `audio/extract.rs`, generalized to an async child process whose stdout and
//! stderr are drained on separate tasks so a chatty recognizer can't deadlock
//! on a full pipe buffer while we wait on the other stream.

use super::{RecognizedChunk, Recognizer};
use crate::audio::AudioChunk;
use crate::error::{Result, SubgenError};
use crate::project::{Segment, Word};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Recognizer that drives a local CLI speech-recognition engine (e.g. a
/// whisper.cpp-style binary). The binary is invoked as:
///
///   `<executable> --model <model_path> --input <chunk.wav> --output <dir>/output.json [--language <lang>]`
///
/// and is expected to write a JSON document shaped like `BinaryResponse` to
/// `<dir>/output.json`.
pub struct BinaryRecognizer {
    executable: PathBuf,
    model_path: PathBuf,
    forced_language: Option<String>,
}

impl BinaryRecognizer {
    pub fn new(executable: PathBuf, model_path: PathBuf) -> Self {
        Self {
            executable,
            model_path,
            forced_language: None,
        }
    }

    pub fn with_forced_language(mut self, language: Option<String>) -> Self {
        self.forced_language = language;
        self
    }

    async fn run(&self, chunk: &AudioChunk) -> Result<BinaryResponse> {
        // Secure temp dir: created with 0700 and a random suffix, never a
        // name we construct and hope doesn't already exist.
        let temp_dir = tempfile::Builder::new()
            .prefix("subgen-recognizer-")
            .tempdir()
            .map_err(|e| SubgenError::Transcription(format!("temp dir creation failed: {e}")))?;
        let output_path = temp_dir.path().join("output.json");

        let mut command = Command::new(&self.executable);
        command
            .arg("--model")
            .arg(&self.model_path)
            .arg("--input")
            .arg(&chunk.path)
            .arg("--output")
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(lang) = &self.forced_language {
            command.arg("--language").arg(lang);
        }

        let mut child = command
            .spawn()
            .map_err(|e| SubgenError::Transcription(format!("failed to spawn recognizer binary: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SubgenError::Transcription("recognizer binary stdout not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SubgenError::Transcription("recognizer binary stderr not piped".to_string()))?;

        // Drain stdout and stderr on separate tasks concurrently with
        // `wait()`. If we instead read them sequentially, a binary that
        // fills the stderr pipe while we're blocked reading stdout (or vice
        // versa) would deadlock both sides.
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut collected = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        let status = child
            .wait()
            .await
            .map_err(|e| SubgenError::Transcription(format!("recognizer binary I/O error: {e}")))?;
        let stdout_text = stdout_task.await.unwrap_or_default();
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !stdout_text.trim().is_empty() {
            debug!("recognizer binary stdout: {}", stdout_text.trim());
        }

        if !status.success() {
            return Err(SubgenError::Transcription(format!(
                "recognizer binary exited with {status}: {}",
                stderr_text.trim()
            )));
        }
        if !stderr_text.trim().is_empty() {
            warn!("recognizer binary stderr: {}", stderr_text.trim());
        }

        let json = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(|e| SubgenError::Transcription(format!("reading recognizer output failed: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| SubgenError::Transcription(format!("malformed recognizer binary output: {e}")))
    }

    fn parse_response(&self, response: BinaryResponse, chunk: &AudioChunk) -> Result<RecognizedChunk> {
        let chunk_offset = chunk.region.start.as_secs_f64();
        let mut segments = Vec::new();

        for seg in response.segments {
            let words = seg
                .words
                .into_iter()
                .map(|w| Word::new(w.word, chunk_offset + w.start, chunk_offset + w.end))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SubgenError::Transcription(e.to_string()))?;
            segments.push(
                Segment::new(
                    chunk_offset + seg.start,
                    chunk_offset + seg.end,
                    seg.text.trim(),
                    words,
                )
                .map_err(|e| SubgenError::Transcription(e.to_string()))?,
            );
        }

        Ok(RecognizedChunk {
            segments,
            detected_language: response.language,
        })
    }
}

#[async_trait]
impl Recognizer for BinaryRecognizer {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<RecognizedChunk> {
        debug!("transcribing chunk {} via binary recognizer", chunk.index);
        let response = self.run(chunk).await?;
        self.parse_response(response, chunk)
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

#[derive(Debug, Deserialize)]
struct BinaryResponse {
    #[serde(default)]
    segments: Vec<BinarySegment>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BinarySegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<BinaryWord>,
}

#[derive(Debug, Deserialize)]
struct BinaryWord {
    word: String,
    start: f64,
    end: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SpeechRegion;
    use std::time::Duration;

    fn test_chunk() -> AudioChunk {
        AudioChunk {
            region: SpeechRegion {
                start: Duration::from_secs(5),
                end: Duration::from_secs(10),
            },
            path: PathBuf::from("/tmp/chunk.wav"),
            index: 0,
        }
    }

    #[test]
    fn test_parse_response_offsets_segments_and_words() {
        let recognizer = BinaryRecognizer::new(PathBuf::from("whisper-cli"), PathBuf::from("model.bin"));
        let response = BinaryResponse {
            segments: vec![BinarySegment {
                start: 0.0,
                end: 1.0,
                text: "Hello world".to_string(),
                words: vec![
                    BinaryWord {
                        word: "Hello".to_string(),
                        start: 0.0,
                        end: 0.4,
                    },
                    BinaryWord {
                        word: "world".to_string(),
                        start: 0.4,
                        end: 1.0,
                    },
                ],
            }],
            language: Some("en".to_string()),
        };

        let result = recognizer.parse_response(response, &test_chunk()).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].start_sec, 5.0);
        assert_eq!(result.segments[0].words.len(), 2);
        assert_eq!(result.segments[0].words[0].start_sec, 5.0);
        assert_eq!(result.detected_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_response_with_no_segments_is_empty() {
        let recognizer = BinaryRecognizer::new(PathBuf::from("whisper-cli"), PathBuf::from("model.bin"));
        let response = BinaryResponse {
            segments: vec![],
            language: None,
        };
        let result = recognizer.parse_response(response, &test_chunk()).unwrap();
        assert!(result.segments.is_empty());
        assert!(result.detected_language.is_none());
    }
}
