//! Pipeline Engine (§4.1): orchestrates audio extraction, transcription
//! (behind the cache), sentence-aware translation, proofreading and subtitle
//! export. Keeps the teacher's `generate_subtitles_with_cancel`
//! stage-sequencing shape and Drop-based temp cleanup, generalized to the
//! five stages of `ProgressStage` and exposed as methods on a `Pipeline`
//! struct rather than one long free function, since it now owns a
//! `ComponentManager` and an LLM client factory the teacher never needed.

use crate::audio::{
    check_ffmpeg, create_chunks, detect_speech_regions, extract_audio_with_progress, plan_chunks,
    ChunkConfig, VadConfig,
};
use crate::cache::{self, CacheStore};
use crate::cancel::CancellationToken;
use crate::component::ComponentManager;
use crate::config::{Config, OutputFormat, RecognizerKind};
use crate::error::{Result, SubgenError};
use crate::llm;
use crate::progress::{ProgressCallback, ProgressStage};
use crate::project::{CacheSource, Project};
use crate::proofread::{self, ProofreadConfig};
use crate::style::StylePreset;
use crate::subtitle;
use crate::transcribe::{binary::BinaryRecognizer, cloud::CloudRecognizer, Recognizer};
use crate::translate::{
    batch::BatchConfig, grouping::GroupingConfig, SentenceTranslator, TranslatorConfig,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

/// Whether exported subtitles are muxed as a toggleable track or drawn
/// permanently into the video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Soft,
    Hard,
}

/// Per-run options. Always cloned, never mutated in place by the pipeline —
/// `run`'s cache-hit language correction builds a new value rather than
/// reaching into the caller's copy (§9 "config mutation" rule).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub sentence_aware: bool,
    pub translate: bool,
    pub proofread: bool,
    pub bilingual: bool,
    pub format: OutputFormat,
    pub force_transcribe: bool,
    pub style_preset: StylePreset,
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_lang: None,
            target_lang: None,
            sentence_aware: true,
            translate: true,
            proofread: false,
            bilingual: false,
            format: OutputFormat::default(),
            force_transcribe: false,
            style_preset: StylePreset::Default,
            concurrency: 4,
        }
    }
}

pub struct Pipeline {
    config: Config,
    components: ComponentManager,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: Config, components: ComponentManager) -> Self {
        Self {
            config,
            components,
            cancel: CancellationToken::new(),
        }
    }

    /// A cloneable handle to this pipeline's cancellation token. Callers
    /// (e.g. a Ctrl+C handler in `main`) call `.cancel()` on the handle to
    /// request that any in-progress `run`/`transcribe` stop at its next poll
    /// point and return `SubgenError::Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn build_recognizer(&self, opts: &PipelineConfig) -> Result<Box<dyn Recognizer>> {
        match self.config.whisper.kind {
            RecognizerKind::Cloud => {
                let api_key = llm::credentials::resolve(
                    None,
                    llm::credentials::env_var_for(self.config.translation.provider),
                    self.config.translation.api_key.as_deref(),
                )?;
                let model = self
                    .config
                    .whisper
                    .model
                    .clone()
                    .unwrap_or_else(|| "whisper-1".to_string());
                let base_url = self
                    .config
                    .translation
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
                Ok(Box::new(
                    CloudRecognizer::new(api_key, model, base_url)
                        .with_forced_language(opts.source_lang.clone()),
                ))
            }
            RecognizerKind::Binary => {
                let executable = match &self.config.whisper.binary_path {
                    Some(path) => path.clone(),
                    None => self.components.find_whisper_engine()?,
                };
                let model_name = self
                    .config
                    .whisper
                    .model
                    .clone()
                    .unwrap_or_else(|| "base".to_string());
                let model_path = self.components.find_whisper_model(&model_name)?;
                Ok(Box::new(
                    BinaryRecognizer::new(executable, model_path)
                        .with_forced_language(opts.source_lang.clone()),
                ))
            }
        }
    }

    fn recognizer_identity(&self) -> (&'static str, String) {
        match self.config.whisper.kind {
            RecognizerKind::Cloud => (
                "cloud",
                self.config
                    .whisper
                    .model
                    .clone()
                    .unwrap_or_else(|| "whisper-1".to_string()),
            ),
            RecognizerKind::Binary => (
                "binary",
                self.config
                    .whisper
                    .model
                    .clone()
                    .unwrap_or_else(|| "base".to_string()),
            ),
        }
    }

    /// `Transcribe(input, options) → Project`. Extracts audio if `input`
    /// isn't already a WAV, consults the cache, and falls back to the
    /// configured recognizer on a miss. Always returns a `Project` with
    /// `is_transcribed = true`.
    pub async fn transcribe(
        &self,
        input: &Path,
        opts: &PipelineConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<Project> {
        if !input.exists() {
            return Err(SubgenError::FileNotFound(input.display().to_string()));
        }
        check_ffmpeg()?;

        // `temp_dir`'s own Drop removes extracted audio and chunk files on
        // every exit path (success, error via `?`, or an early return).
        let temp_dir = TempDir::new()?;
        let audio_path = temp_dir.path().join("audio.wav");

        let progress_for_extract = progress.clone();
        let metadata = extract_audio_with_progress(input, &audio_path, move |fraction| {
            if let Some(cb) = &progress_for_extract {
                let total = 1000u64;
                cb(ProgressStage::Extracting, (fraction * total as f64) as u64, total);
            }
        })
        .await?;

        let audio_hash = cache::hash_file(&audio_path)?;
        let (provider_id, model_id) = self.recognizer_identity();
        let fingerprint = cache::fingerprint(
            &audio_hash,
            provider_id,
            &model_id,
            opts.source_lang.as_deref(),
        );

        let mut project = Project::new(input.to_path_buf(), chrono::Utc::now());
        project.style = crate::style::StyleProfile::preset(opts.style_preset);
        project.metadata.whisper_provider = Some(provider_id.to_string());

        if !opts.force_transcribe {
            if let Some(entry) = CacheStore::get(input, &fingerprint)? {
                info!("cache hit for {}, skipping transcription", input.display());
                project.mark_transcribed(entry.segments, entry.source_lang);
                project.metadata.source_from = CacheSource::Cached;
                if let Some(cb) = &progress {
                    cb(ProgressStage::Transcribing, 1, 1);
                }
                return Ok(project);
            }
        }

        let recognizer = self.build_recognizer(opts)?;
        let regions = detect_speech_regions(&audio_path, &VadConfig::default())?;
        let chunk_config = ChunkConfig::default();
        let planned = plan_chunks(&regions, metadata.duration, &chunk_config);
        let chunks = create_chunks(&audio_path, &planned, temp_dir.path()).await?;

        let total = chunks.len() as u64;
        // Semaphore-bounded concurrency (§5): at most `concurrency` chunks
        // are in flight with the recognizer at once.
        let semaphore = Arc::new(tokio::sync::Semaphore::new(opts.concurrency.max(1)));
        let tasks = chunks.into_iter().map(|chunk| {
            let semaphore = semaphore.clone();
            let recognizer = &recognizer;
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                recognizer.transcribe(&chunk).await
            }
        });

        let mut results = futures::future::join_all(tasks).await;
        // Chunk completion order isn't guaranteed under concurrency; sort
        // recovered segments back into timeline order below.
        let mut all_segments = Vec::new();
        let mut detected_language = None;
        let mut completed = 0u64;
        for result in results.drain(..) {
            if self.cancel.is_cancelled() {
                return Err(SubgenError::Cancelled);
            }
            let recognized = result?;
            if detected_language.is_none() {
                detected_language = recognized.detected_language;
            }
            all_segments.extend(recognized.segments);
            completed += 1;
            if let Some(cb) = &progress {
                cb(ProgressStage::Transcribing, completed, total);
            }
        }
        all_segments.sort_by(|a, b| a.start_sec.partial_cmp(&b.start_sec).unwrap());

        let source_lang = opts.source_lang.clone().or(detected_language);
        project.mark_transcribed(all_segments, source_lang.clone());
        project.validate()?;

        CacheStore::put(input, fingerprint, source_lang, project.segments.clone())?;

        Ok(project)
    }

    /// `Translate(project, options) → Project`.
    pub async fn translate(
        &self,
        project: &mut Project,
        opts: &PipelineConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let target_lang = opts
            .target_lang
            .as_deref()
            .ok_or_else(|| SubgenError::BadInput("translate requires a target language".to_string()))?;

        let client = llm::create_client(&self.config, None)?;
        project.metadata.llm_provider = Some(client.name().to_string());
        project.metadata.llm_model = Some(client.model().to_string());

        let rules_dir = Config::data_root().join("rules");
        let translator_config = TranslatorConfig {
            grouping: GroupingConfig::default(),
            batch: BatchConfig::default(),
            rules_dir,
        };
        let translator = SentenceTranslator::new(client.as_ref(), translator_config);
        translator
            .translate_project(project, target_lang, progress)
            .await
    }

    /// `Proofread(project) → Project`.
    pub async fn proofread(
        &self,
        project: &mut Project,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let client = llm::create_client(&self.config, None)?;
        let target_lang = project
            .metadata
            .target_lang
            .clone()
            .ok_or_else(|| SubgenError::InvalidProject("project has no target language".to_string()))?;
        let rules_dir = Config::data_root().join("rules");
        let rules_text = crate::translate::rules::load_rules(&rules_dir, &target_lang)?;
        proofread::proofread_project(project, client.as_ref(), &rules_text, &ProofreadConfig::default(), progress)
            .await
    }

    /// `Export(project, outPath, format, styleOverride?) → path`.
    pub fn export(
        &self,
        project: &Project,
        output: &Path,
        format: OutputFormat,
        bilingual: bool,
    ) -> Result<PathBuf> {
        let rendered = subtitle::render(project, format, bilingual)?;
        crate::fsutil::atomic_write(output, rendered.as_bytes())?;
        Ok(output.to_path_buf())
    }

    /// `ExportVideo(project, videoPath, outPath, mode)`: mux the rendered
    /// subtitle track into `video_path`. `Soft` attaches it as a selectable
    /// stream (`-c:s mov_text`/copy, no re-encode of video/audio); `Hard`
    /// burns it into the video frames via the `subtitles` filter, which
    /// requires a full re-encode.
    pub async fn export_video(
        &self,
        project: &Project,
        video_path: &Path,
        output: &Path,
        mode: EmbedMode,
        bilingual: bool,
    ) -> Result<PathBuf> {
        if !video_path.exists() {
            return Err(SubgenError::FileNotFound(video_path.display().to_string()));
        }
        check_ffmpeg()?;

        let temp_dir = TempDir::new()?;
        let subtitle_path = temp_dir.path().join("subs.srt");
        self.export(project, &subtitle_path, OutputFormat::Srt, bilingual)?;

        let status = match mode {
            EmbedMode::Soft => tokio::process::Command::new("ffmpeg")
                .args(["-y", "-i"])
                .arg(video_path)
                .arg("-i")
                .arg(&subtitle_path)
                .args(["-map", "0", "-map", "1", "-c", "copy", "-c:s", "mov_text"])
                .arg(output)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await?,
            EmbedMode::Hard => {
                let filter = format!("subtitles={}", escape_ffmpeg_filter_path(&subtitle_path));
                tokio::process::Command::new("ffmpeg")
                    .args(["-y", "-i"])
                    .arg(video_path)
                    .args(["-vf", &filter])
                    .arg(output)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await?
            }
        };

        if !status.success() {
            return Err(SubgenError::AudioExtraction(format!(
                "ffmpeg mux failed with {status}"
            )));
        }

        Ok(output.to_path_buf())
    }

    /// `Run(input, options) → Project`: the full transcribe → translate →
    /// proofread sequence. Does not write a subtitle file; callers follow up
    /// with `export`/`export_video`.
    ///
    /// Per the caching contract, a cache hit's `source_lang` is re-read into
    /// a fresh options value before translation starts, so a stale
    /// `opts.source_lang` never leaks into the translation stage.
    pub async fn run(
        &self,
        input: &Path,
        opts: &PipelineConfig,
        progress: Option<ProgressCallback>,
    ) -> Result<Project> {
        if opts.translate {
            if let Some(target) = &opts.target_lang {
                crate::translate::rules::validate_language_code(target)?;
            }
        }

        let mut project = self.transcribe(input, opts, progress.clone()).await?;
        if self.cancel.is_cancelled() {
            return Err(SubgenError::Cancelled);
        }

        let mut effective = opts.clone();
        if project.metadata.source_from == CacheSource::Cached {
            effective.source_lang = project.metadata.source_lang.clone();
        }

        if effective.translate && effective.target_lang.is_some() {
            if effective.sentence_aware {
                self.translate(&mut project, &effective, progress.clone()).await?;
            } else {
                warn!("non-sentence-aware translation is not a supported mode; using sentence-aware translator");
                self.translate(&mut project, &effective, progress.clone()).await?;
            }

            if self.cancel.is_cancelled() {
                return Err(SubgenError::Cancelled);
            }

            if effective.proofread {
                self.proofread(&mut project, progress.clone()).await?;
            }
        }

        Ok(project)
    }
}

/// Escapes a path for use inside an ffmpeg filtergraph option value (e.g.
/// `subtitles=<path>`). The filtergraph grammar treats `\`, `:`, `,`, `;`,
/// `=`, `@` and `'` as metacharacters; each is backslash-escaped so a path
/// containing any of them doesn't truncate or break out of the `subtitles=`
/// option.
fn escape_ffmpeg_filter_path(path: &Path) -> String {
    let raw = path.display().to_string();
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ':' | ',' | ';' | '=' | '@' | '\'') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
