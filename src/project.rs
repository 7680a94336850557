//! The subtitle data model: `Word`, `Segment`, `Project`, `Metadata`.
//!
//! Segments and words arrive from untrusted sources (recognizer output, LLM
//! redistribution, cache files loaded from disk), so their constructors
//! validate invariants and return `SubgenError::InvalidProject` rather than
//! panicking. Invariant violations caused by in-crate logic errors (e.g. a
//! `Segment` built with `end < start` from code we control) still panic via
//! `assert!`, per the never-caught policy in `error.rs`.

use crate::error::{Result, SubgenError};
use crate::style::StyleProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Word-span tolerance used when validating that a segment contains its words.
const WORD_SPAN_TOLERANCE_SEC: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start_sec: f64, end_sec: f64) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SubgenError::InvalidProject(
                "word text must be non-empty".to_string(),
            ));
        }
        if !start_sec.is_finite() || !end_sec.is_finite() || start_sec < 0.0 {
            return Err(SubgenError::InvalidProject(format!(
                "word '{text}' has a non-finite or negative timestamp"
            )));
        }
        if start_sec > end_sec {
            return Err(SubgenError::InvalidProject(format!(
                "word '{text}' has start {start_sec} after end {end_sec}"
            )));
        }
        Ok(Self {
            text,
            start_sec,
            end_sec,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
    pub translated: Option<String>,
    pub words: Vec<Word>,
    pub no_speech_prob: Option<f64>,
}

impl Segment {
    pub fn new(
        start_sec: f64,
        end_sec: f64,
        text: impl Into<String>,
        words: Vec<Word>,
    ) -> Result<Self> {
        let text = text.into();
        if !start_sec.is_finite() || !end_sec.is_finite() || start_sec < 0.0 {
            return Err(SubgenError::InvalidProject(format!(
                "segment '{text}' has a non-finite or negative timestamp"
            )));
        }
        if end_sec < start_sec {
            return Err(SubgenError::InvalidProject(format!(
                "segment '{text}' ends ({end_sec}) before it starts ({start_sec})"
            )));
        }

        let mut last_word_start = f64::NEG_INFINITY;
        for w in &words {
            if w.start_sec < last_word_start {
                return Err(SubgenError::InvalidProject(
                    "words within a segment must be non-decreasing by start time".to_string(),
                ));
            }
            last_word_start = w.start_sec;
            if w.start_sec < start_sec - WORD_SPAN_TOLERANCE_SEC
                || w.end_sec > end_sec + WORD_SPAN_TOLERANCE_SEC
            {
                return Err(SubgenError::InvalidProject(format!(
                    "word '{}' [{:.3},{:.3}] falls outside segment span [{:.3},{:.3}] beyond tolerance",
                    w.text, w.start_sec, w.end_sec, start_sec, end_sec
                )));
            }
        }

        Ok(Self {
            start_sec,
            end_sec,
            text,
            translated: None,
            words,
            no_speech_prob: None,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Provenance of the transcription segments finally used by a run: whether
/// they were produced fresh by a recognizer or served from the cache store.
/// Carried on `Metadata` so callers outside the pipeline can observe which
/// path was taken (the cache-hit/fresh-run equivalence property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Fresh,
    Cached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub video_path: PathBuf,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub whisper_provider: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub source_from: CacheSource,
}

impl Metadata {
    pub fn new(video_path: impl Into<PathBuf>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            video_path: video_path.into(),
            source_lang: None,
            target_lang: None,
            whisper_provider: None,
            llm_provider: None,
            llm_model: None,
            created_at: now,
            modified_at: now,
            source_from: CacheSource::Fresh,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProjectState {
    pub is_transcribed: bool,
    pub is_translated: bool,
    pub is_proofread: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub segments: Vec<Segment>,
    pub style: StyleProfile,
    pub metadata: Metadata,
    pub state: ProjectState,
}

impl Project {
    pub fn new(video_path: impl Into<PathBuf>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            segments: Vec::new(),
            style: StyleProfile::default(),
            metadata: Metadata::new(video_path, now),
            state: ProjectState::default(),
        }
    }

    /// Validate segment ordering and state/segment consistency invariants.
    /// Called after any bulk mutation (transcription, translation,
    /// deserialization) before the Project is handed back to a caller.
    pub fn validate(&self) -> Result<()> {
        let mut last_start = f64::NEG_INFINITY;
        for seg in &self.segments {
            if seg.start_sec < last_start {
                return Err(SubgenError::InvalidProject(
                    "segments must be ordered by start_sec".to_string(),
                ));
            }
            last_start = seg.start_sec;
        }

        if self.state.is_translated
            && self
                .segments
                .iter()
                .any(|s| s.translated.as_deref().unwrap_or("").is_empty())
        {
            return Err(SubgenError::InvalidProject(
                "is_translated is set but some segments lack a translation".to_string(),
            ));
        }

        if self.state.is_proofread && !self.state.is_translated {
            return Err(SubgenError::InvalidProject(
                "is_proofread requires is_translated".to_string(),
            ));
        }

        Ok(())
    }

    pub fn mark_transcribed(&mut self, segments: Vec<Segment>, source_lang: Option<String>) {
        self.segments = segments;
        self.metadata.source_lang = source_lang;
        self.state.is_transcribed = true;
        self.state.is_translated = false;
        self.state.is_proofread = false;
    }

    pub fn total_words(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }

    /// Persist as pretty-printed `.project` JSON, matching the teacher's
    /// pretty-print convention for its JSON subtitle output.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::fsutil::atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let project: Project = serde_json::from_str(&contents)?;
        project.validate()?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn test_word_rejects_empty_text() {
        assert!(Word::new("", 0.0, 1.0).is_err());
    }

    #[test]
    fn test_word_rejects_inverted_span() {
        assert!(Word::new("hi", 1.0, 0.0).is_err());
    }

    #[test]
    fn test_segment_rejects_word_outside_tolerance() {
        let words = vec![Word::new("hi", 2.0, 2.5).unwrap()];
        assert!(Segment::new(0.0, 1.0, "hi", words).is_err());
    }

    #[test]
    fn test_segment_allows_word_within_tolerance() {
        let words = vec![Word::new("hi", -0.02, 1.03).unwrap()];
        assert!(Segment::new(0.0, 1.0, "hi", words).is_ok());
    }

    #[test]
    fn test_project_ordering_invariant() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(1.0, 2.0, "b", vec![]).unwrap());
        project.segments.push(Segment::new(0.0, 0.5, "a", vec![]).unwrap());
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_translated_state_requires_translations() {
        let mut project = Project::new("clip.mp4", now());
        project.segments.push(Segment::new(0.0, 1.0, "a", vec![]).unwrap());
        project.state.is_translated = true;
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_proofread_requires_translated() {
        let mut project = Project::new("clip.mp4", now());
        project.state.is_proofread = true;
        assert!(project.validate().is_err());
    }
}
