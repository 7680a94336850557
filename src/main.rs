//! CLI entrypoint (§6): a `run` subcommand over `Pipeline` plus component-
//! manager passthroughs (`install`/`uninstall`/`update`/`doctor`) and two
//! stubbed subcommands (`init`/`auth`) that are explicitly out of scope.
//! Mirrors the teacher's single-`clap::Parser`-struct shape, generalized to
//! a `Subcommand` enum since this binary does more than one thing.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use subgen::component::registry::Registry;
use subgen::component::{ComponentManager, DownloadProgress};
use subgen::config::{Config, OutputFormat, RecognizerKind};
use subgen::error::{Result, SubgenError};
use subgen::pipeline::{EmbedMode, Pipeline, PipelineConfig};
use subgen::progress::{ProgressCallback, ProgressStage};
use subgen::project::Project;
use subgen::style::StylePreset;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "subgen")]
#[command(version, about = "Generate translated, proofread subtitles from video")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to an alternate config file (overrides ~/.subgen/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe (and optionally translate/proofread/export) a video or audio file
    Run(RunArgs),
    /// Interactive first-run setup wizard
    Init,
    /// Manage provider credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Download and install a component (engine, model, or tool)
    Install { component: String },
    /// Remove an installed component
    Uninstall { component: String },
    /// Re-download and reinstall a component at its latest version
    Update { component: String },
    /// Check that ffmpeg, the configured recognizer, and credentials are usable
    Doctor,
}

#[derive(Subcommand)]
enum AuthAction {
    Login { provider: String },
    Logout { provider: String },
    Status { provider: String },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Video/audio file to process, or (with --proofread-only) an existing subtitle file
    input: PathBuf,

    /// Output path (defaults to the input name with the target format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output subtitle format: srt, vtt, ass
    #[arg(short, long)]
    format: Option<String>,

    /// Translate the transcript to this language code (e.g. en, zh, pt-BR)
    #[arg(long = "to")]
    to: Option<String>,

    /// Force the source language instead of auto-detecting it
    #[arg(long = "from")]
    from: Option<String>,

    /// Group segments into sentence-sized units before translating
    #[arg(short = 's', long)]
    sentence_aware: bool,

    /// Run an LLM proofreading pass over the translation
    #[arg(short = 'p', long)]
    proofread: bool,

    /// Skip transcription entirely: proofread an existing subtitle file in place
    #[arg(long)]
    proofread_only: bool,

    /// Skip translation; keep the transcript in its source language
    #[arg(long)]
    no_translate: bool,

    /// Write both the source and translated line for each cue
    #[arg(long)]
    bilingual: bool,

    /// Mux the rendered subtitles into the input video: "soft" or "hard"
    #[arg(long)]
    embed: Option<String>,

    /// Ignore the transcription cache and re-run the recognizer
    #[arg(long)]
    force_transcribe: bool,

    /// Save the resulting Project as a `.project` JSON file
    #[arg(long)]
    save_project: Option<PathBuf>,

    /// Load a previously saved `.project` file instead of transcribing
    #[arg(long)]
    load_project: Option<PathBuf>,

    /// Named style preset: default, netflix, fansub, minimal
    #[arg(long)]
    style_preset: Option<String>,

    #[arg(long)]
    primary_font: Option<String>,
    #[arg(long)]
    primary_color: Option<String>,
    #[arg(long)]
    secondary_font: Option<String>,
    #[arg(long)]
    secondary_color: Option<String>,

    /// Number of chunks/batches processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.{}", stem.to_string_lossy(), format.extension()));
    output
}

fn derive_proofread_output_path(input: &Path) -> PathBuf {
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("srt");
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.proofread.{}", stem.to_string_lossy(), ext));
    output
}

fn derive_embed_output_path(input: &Path) -> PathBuf {
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}.embed.{}", stem.to_string_lossy(), ext));
    output
}

/// Infer a target language from an `<name>_<lang>.<ext>` filename convention
/// (e.g. `clip_zh.srt` -> `zh`), used by `--proofread-only` when `--to` isn't
/// given. Returns `None` if the suffix doesn't look like a language code.
fn infer_target_lang(input: &Path) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('_')?;
    subgen::translate::rules::validate_language_code(suffix)
        .ok()
        .map(|_| suffix.to_string())
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(p) => {
            let contents = std::fs::read_to_string(p)?;
            serde_yaml::from_str(&contents)
                .map_err(|e| SubgenError::Config(format!("{}: {e}", p.display())))?
        }
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn build_component_manager() -> Result<ComponentManager> {
    let registry_path = Config::data_root().join("components.json");
    let registry = Registry::load(&registry_path)?;
    Ok(ComponentManager::new(registry))
}

fn stage_label(stage: ProgressStage) -> &'static str {
    match stage {
        ProgressStage::Extracting => "extract",
        ProgressStage::Transcribing => "transcribe",
        ProgressStage::Translating => "translate",
        ProgressStage::Proofreading => "proofread",
        ProgressStage::Exporting => "export",
    }
}

/// One `indicatif` bar per stage, created lazily the first time that stage
/// reports progress. Cumulative counts only, per `ProgressCallback`'s
/// contract — `set_position` is never fed a delta.
fn build_progress() -> ProgressCallback {
    use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

    let multi = MultiProgress::new();
    let bars: Mutex<HashMap<ProgressStage, ProgressBar>> = Mutex::new(HashMap::new());
    let style = ProgressStyle::with_template("{prefix:>10} [{bar:40}] {pos}/{len}")
        .unwrap()
        .progress_chars("=> ");

    Arc::new(move |stage: ProgressStage, current: u64, total: u64| {
        let mut bars = bars.lock().unwrap();
        let bar = bars.entry(stage).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(total.max(1)));
            bar.set_style(style.clone());
            bar.set_prefix(stage_label(stage));
            bar
        });
        bar.set_length(total.max(1));
        bar.set_position(current.min(total.max(1)));
        if total > 0 && current >= total {
            bar.finish();
        }
    })
}

/// Installs a process-wide Ctrl+C handler that cancels `token`. Installation
/// failure (a handler already registered) is non-fatal: `run` only ever loses
/// its cooperative-cancellation path, not correctness.
fn install_ctrlc_handler(token: subgen::cancel::CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("received interrupt, cancelling at the next stage boundary...");
        token.cancel();
    }) {
        tracing::debug!("could not install Ctrl+C handler: {e}");
    }
}

fn apply_style_overrides(style: &mut subgen::style::StyleProfile, args: &RunArgs) -> Result<()> {
    if let Some(font) = &args.primary_font {
        style.primary.font_name = font.clone();
    }
    if let Some(color) = &args.primary_color {
        subgen::style::hex_to_ass(color)?;
        style.primary.primary_color = color.clone();
    }
    if let Some(font) = &args.secondary_font {
        style.secondary.font_name = font.clone();
    }
    if let Some(color) = &args.secondary_color {
        subgen::style::hex_to_ass(color)?;
        style.secondary.primary_color = color.clone();
    }
    style.validate()
}

async fn run_command(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let config = load_config(&config_path)?;

    if args.proofread_only {
        return run_proofread_only(&config, args).await;
    }

    if !args.input.exists() {
        return Err(SubgenError::FileNotFound(args.input.display().to_string()));
    }

    let format: OutputFormat = match &args.format {
        Some(f) => f.parse().map_err(SubgenError::BadInput)?,
        None => config.output.default_format,
    };

    let style_preset: StylePreset = match &args.style_preset {
        Some(s) => s.parse().map_err(SubgenError::BadInput)?,
        None => match &config.styles.default_preset {
            Some(s) => s.parse().map_err(SubgenError::BadInput)?,
            None => StylePreset::Default,
        },
    };

    let target_lang = if args.no_translate { None } else { args.to.clone() };

    let opts = PipelineConfig {
        source_lang: args.from.clone(),
        target_lang: target_lang.clone(),
        sentence_aware: args.sentence_aware || config.translation.sentence_aware,
        translate: !args.no_translate && target_lang.is_some(),
        proofread: args.proofread,
        bilingual: args.bilingual || config.output.bilingual,
        format,
        force_transcribe: args.force_transcribe,
        style_preset,
        concurrency: args.concurrency.unwrap_or(config.advanced.concurrency),
    };

    let components = build_component_manager()?;
    let pipeline = Pipeline::new(config, components);
    let progress = build_progress();
    install_ctrlc_handler(pipeline.cancellation_token());

    let mut project = if let Some(load_path) = &args.load_project {
        let mut loaded = Project::load(load_path)?;
        if opts.translate && !loaded.state.is_translated {
            pipeline.translate(&mut loaded, &opts, Some(progress.clone())).await?;
        }
        if opts.proofread && !loaded.state.is_proofread {
            pipeline.proofread(&mut loaded, Some(progress.clone())).await?;
        }
        loaded
    } else {
        pipeline.run(&args.input, &opts, Some(progress.clone())).await?
    };

    apply_style_overrides(&mut project.style, &args)?;

    if let Some(save_path) = &args.save_project {
        project.save(save_path)?;
        info!("Saved project to {}", save_path.display());
    }

    if let Some(embed_str) = &args.embed {
        let mode = match embed_str.as_str() {
            "soft" => EmbedMode::Soft,
            "hard" => EmbedMode::Hard,
            other => {
                return Err(SubgenError::BadInput(format!(
                    "unknown --embed mode '{other}', expected 'soft' or 'hard'"
                )))
            }
        };
        let video_output = args
            .output
            .clone()
            .unwrap_or_else(|| derive_embed_output_path(&args.input));
        pipeline
            .export_video(&project, &args.input, &video_output, mode, opts.bilingual)
            .await?;
        info!("Wrote {}", video_output.display());
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| derive_output_path(&args.input, format));
        pipeline.export(&project, &output, format, opts.bilingual)?;
        info!("Wrote {}", output.display());
    }

    Ok(())
}

async fn run_proofread_only(config: &Config, args: RunArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(SubgenError::FileNotFound(args.input.display().to_string()));
    }

    let contents = std::fs::read_to_string(&args.input)?;
    let ext = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("srt")
        .to_lowercase();
    let parsed = match ext.as_str() {
        "vtt" => subgen::subtitle::vtt::parse(&contents, args.bilingual),
        _ => subgen::subtitle::srt::parse(&contents, args.bilingual),
    };
    if parsed.is_empty() {
        return Err(SubgenError::BadInput(format!(
            "no cues parsed from {}",
            args.input.display()
        )));
    }

    let mut project = Project::new(args.input.clone(), chrono::Utc::now());
    for mut seg in parsed {
        if seg.translated.is_none() {
            seg.translated = Some(seg.text.clone());
        }
        project.segments.push(seg);
    }
    project.state.is_transcribed = true;
    project.state.is_translated = true;

    let target_lang = args
        .to
        .clone()
        .or_else(|| infer_target_lang(&args.input))
        .ok_or_else(|| {
            SubgenError::BadInput(
                "--proofread-only needs --to, or a filename ending in _<lang>".to_string(),
            )
        })?;
    subgen::translate::rules::validate_language_code(&target_lang)?;
    project.metadata.target_lang = Some(target_lang);

    let components = build_component_manager()?;
    let pipeline = Pipeline::new(config.clone(), components);
    let progress = build_progress();

    pipeline.proofread(&mut project, Some(progress)).await?;

    if let Some(save_path) = &args.save_project {
        project.save(save_path)?;
    }

    let format: OutputFormat = match &args.format {
        Some(f) => f.parse().map_err(SubgenError::BadInput)?,
        None => ext.parse().unwrap_or(OutputFormat::Srt),
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| derive_proofread_output_path(&args.input));
    pipeline.export(&project, &output, format, args.bilingual)?;
    info!("Wrote {}", output.display());
    Ok(())
}

async fn install_command(component: &str) -> Result<()> {
    let manager = build_component_manager()?;
    let progress: Option<DownloadProgress> = None;
    let path = manager.install(component, progress).await?;
    println!("Installed {component} -> {}", path.display());
    Ok(())
}

fn uninstall_command(component: &str) -> Result<()> {
    let manager = build_component_manager()?;
    manager.uninstall(component)?;
    println!("Uninstalled {component}");
    Ok(())
}

async fn update_command(component: &str) -> Result<()> {
    let manager = build_component_manager()?;
    let path = manager.update(component).await?;
    println!("Updated {component} -> {}", path.display());
    Ok(())
}

fn doctor_command() -> Result<()> {
    let mut healthy = true;

    match subgen::audio::check_ffmpeg() {
        Ok(()) => println!("[ok]   ffmpeg found"),
        Err(e) => {
            println!("[fail] ffmpeg: {e}");
            healthy = false;
        }
    }
    match subgen::audio::check_ffprobe() {
        Ok(()) => println!("[ok]   ffprobe found"),
        Err(e) => {
            println!("[fail] ffprobe: {e}");
            healthy = false;
        }
    }

    let config = Config::load()?;
    match config.validate() {
        Ok(()) => println!("[ok]   config valid"),
        Err(e) => {
            println!("[fail] config: {e}");
            healthy = false;
        }
    }

    let cred_check = subgen::llm::credentials::resolve(
        None,
        subgen::llm::credentials::env_var_for(config.translation.provider),
        config.translation.api_key.as_deref(),
    );
    match cred_check {
        Ok(_) => println!("[ok]   translation credentials resolved"),
        Err(e) => {
            println!("[fail] credentials: {e}");
            healthy = false;
        }
    }

    match config.whisper.kind {
        RecognizerKind::Binary => {
            let manager = build_component_manager()?;
            match manager.find_whisper_engine() {
                Ok(p) => println!("[ok]   whisper engine at {}", p.display()),
                Err(e) => {
                    println!("[fail] whisper engine: {e}");
                    healthy = false;
                }
            }
        }
        RecognizerKind::Cloud => println!("[ok]   cloud recognizer configured"),
    }

    if healthy {
        Ok(())
    } else {
        Err(SubgenError::Config("one or more doctor checks failed".to_string()))
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => run_command(cli.config, args).await,
        Command::Init => {
            println!("`subgen init` is not implemented in this build; see the setup wizard docs.");
            Ok(())
        }
        Command::Auth { action } => {
            let provider = match &action {
                AuthAction::Login { provider } | AuthAction::Logout { provider } | AuthAction::Status { provider } => provider,
            };
            println!(
                "`subgen auth` for '{provider}' is not implemented in this build; see the setup wizard docs."
            );
            Ok(())
        }
        Command::Install { component } => install_command(&component).await,
        Command::Uninstall { component } => uninstall_command(&component),
        Command::Update { component } => update_command(&component).await,
        Command::Doctor => doctor_command(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = dispatch(cli).await {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}
