//! Cloud API recognizer (§4.5): POSTs an audio chunk to an OpenAI-compatible
//! transcription endpoint and normalizes the verbose-JSON response into
//! `project::Segment`s. Grounded in the teacher's `transcribe/whisper.rs`
//! multipart-upload and exponential-backoff retry shape, generalized to a
//! configurable `base_url`/model so other OpenAI-compatible endpoints work
//! unchanged.

use super::{RecognizedChunk, Recognizer};
use crate::audio::AudioChunk;
use crate::error::{Result, SubgenError};
use crate::project::{Segment, Word};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;
const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

pub struct CloudRecognizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    forced_language: Option<String>,
}

impl CloudRecognizer {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
            forced_language: None,
        }
    }

    pub fn with_forced_language(mut self, language: Option<String>) -> Self {
        self.forced_language = language;
        self
    }

    async fn build_form(&self, audio_path: &std::path::Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| SubgenError::Transcription(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word");

        if let Some(lang) = &self.forced_language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> Result<CloudResponse> {
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|e| {
                SubgenError::Transcription(format!("malformed cloud recognizer response: {e}"))
            });
        }

        let error_body = response.text().await.unwrap_or_default();
        let truncated = &error_body[..error_body.len().min(1024)];
        if let Ok(api_error) = serde_json::from_str::<ApiErrorBody>(&error_body) {
            return Err(SubgenError::Api(format!(
                "{} ({})",
                api_error.error.message, status
            )));
        }
        Err(SubgenError::Api(format!("{status}: {truncated}")))
    }

    async fn transcribe_with_retry(&self, chunk: &AudioChunk) -> Result<CloudResponse> {
        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let form = self.build_form(&chunk.path).await?;
            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(e @ SubgenError::Api(_)) => {
                    warn!("cloud recognizer attempt {} failed: {e}", attempt + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| SubgenError::Api("unknown cloud recognizer error".into())))
    }

    fn parse_response(&self, response: CloudResponse, chunk: &AudioChunk) -> Result<RecognizedChunk> {
        let chunk_offset = chunk.region.start.as_secs_f64();
        let mut segments = Vec::new();

        if let Some(api_segments) = response.segments {
            for seg in api_segments {
                let start_sec = chunk_offset + seg.start;
                let end_sec = chunk_offset + seg.end;
                segments.push(
                    Segment::new(start_sec, end_sec, seg.text.trim(), Vec::new())
                        .map_err(|e| SubgenError::Transcription(e.to_string()))?,
                );
            }
        } else if !response.text.trim().is_empty() {
            segments.push(
                Segment::new(
                    chunk_offset,
                    chunk_offset + chunk.duration().as_secs_f64(),
                    response.text.trim(),
                    Vec::new(),
                )
                .map_err(|e| SubgenError::Transcription(e.to_string()))?,
            );
        }

        if let Some(api_words) = response.words {
            assign_words_to_segments(&mut segments, api_words, chunk_offset)?;
        }

        Ok(RecognizedChunk {
            segments,
            detected_language: Some(response.language),
        })
    }
}

/// Slot each word timestamp into the segment whose span contains it,
/// rebuilding segments since `Segment::new` validates the word-span
/// tolerance invariant at construction time.
fn assign_words_to_segments(
    segments: &mut Vec<Segment>,
    api_words: Vec<CloudWord>,
    chunk_offset: f64,
) -> Result<()> {
    let mut buckets: Vec<Vec<Word>> = vec![Vec::new(); segments.len()];
    for w in api_words {
        let start_sec = chunk_offset + w.start;
        let end_sec = chunk_offset + w.end;
        let word = Word::new(w.word, start_sec, end_sec)
            .map_err(|e| SubgenError::Transcription(e.to_string()))?;
        if let Some(idx) = segments
            .iter()
            .position(|s| word.start_sec >= s.start_sec - 0.05 && word.start_sec <= s.end_sec + 0.05)
        {
            buckets[idx].push(word);
        }
    }

    for (seg, words) in segments.iter_mut().zip(buckets.into_iter()) {
        if words.is_empty() {
            continue;
        }
        *seg = Segment::new(seg.start_sec, seg.end_sec, seg.text.clone(), words)
            .map_err(|e| SubgenError::Transcription(e.to_string()))?;
    }
    Ok(())
}

#[async_trait]
impl Recognizer for CloudRecognizer {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<RecognizedChunk> {
        let metadata = fs::metadata(&chunk.path).await?;
        if metadata.len() as usize > MAX_FILE_SIZE {
            return Err(SubgenError::Transcription(format!(
                "audio chunk too large for cloud recognizer: {} bytes (max {MAX_FILE_SIZE})",
                metadata.len()
            )));
        }

        debug!("transcribing chunk {} via cloud recognizer", chunk.index);
        let response = self.transcribe_with_retry(chunk).await?;
        self.parse_response(response, chunk)
    }

    fn name(&self) -> &'static str {
        "cloud"
    }
}

#[derive(Debug, Deserialize)]
struct CloudResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<CloudSegment>>,
    #[serde(default)]
    words: Option<Vec<CloudWord>>,
    #[serde(default = "unknown_language")]
    language: String,
}

fn unknown_language() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct CloudSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CloudWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SpeechRegion;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_chunk() -> AudioChunk {
        AudioChunk {
            region: SpeechRegion {
                start: Duration::from_secs(10),
                end: Duration::from_secs(20),
            },
            path: PathBuf::from("/tmp/test.wav"),
            index: 0,
        }
    }

    #[test]
    fn test_parse_response_offsets_segments_by_chunk_start() {
        let recognizer = CloudRecognizer::new("key".into(), "whisper-1".into(), "https://api.openai.com/v1".into());
        let response = CloudResponse {
            text: "Hello world. How are you?".to_string(),
            segments: Some(vec![
                CloudSegment {
                    start: 0.0,
                    end: 2.0,
                    text: "Hello world.".to_string(),
                },
                CloudSegment {
                    start: 2.5,
                    end: 4.0,
                    text: "How are you?".to_string(),
                },
            ]),
            words: None,
            language: "en".to_string(),
        };
        let result = recognizer.parse_response(response, &test_chunk()).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].start_sec, 10.0);
        assert_eq!(result.detected_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_response_without_segments_falls_back_to_whole_chunk() {
        let recognizer = CloudRecognizer::new("key".into(), "whisper-1".into(), "https://api.openai.com/v1".into());
        let response = CloudResponse {
            text: "Hello world".to_string(),
            segments: None,
            words: None,
            language: "en".to_string(),
        };
        let result = recognizer.parse_response(response, &test_chunk()).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].start_sec, 10.0);
        assert_eq!(result.segments[0].end_sec, 20.0);
    }

    #[test]
    fn test_parse_response_assigns_words_to_containing_segment() {
        let recognizer = CloudRecognizer::new("key".into(), "whisper-1".into(), "https://api.openai.com/v1".into());
        let response = CloudResponse {
            text: "Hello world.".to_string(),
            segments: Some(vec![CloudSegment {
                start: 0.0,
                end: 2.0,
                text: "Hello world.".to_string(),
            }]),
            words: Some(vec![
                CloudWord {
                    word: "Hello".to_string(),
                    start: 0.0,
                    end: 0.5,
                },
                CloudWord {
                    word: "world".to_string(),
                    start: 0.5,
                    end: 1.0,
                },
            ]),
            language: "en".to_string(),
        };
        let result = recognizer.parse_response(response, &test_chunk()).unwrap();
        assert_eq!(result.segments[0].words.len(), 2);
    }
}
