use thiserror::Error;

/// One variant per error kind in the design's error table (see SPEC_FULL.md
/// §7). Each carries enough context for the CLI to print a remediation hint
/// without re-deriving it from a string at the call site.
#[derive(Error, Debug)]
pub enum SubgenError {
    #[error("Invalid input: {0}")]
    BadInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Required component '{id}' is not installed. Run: subgen install {id}")]
    MissingComponent { id: String },

    #[error("Download integrity check missing or failed for '{id}': {reason}")]
    MissingIntegrity { id: String, reason: String },

    #[error("Archive entry escapes install directory: {entry}")]
    UnsafeArchive { entry: String },

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Proofreading failed: {0}")]
    Proofread(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Unsupported platform: {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Incompatible cache schema version {found} (expected <= {expected})")]
    IncompatibleCache { found: u32, expected: u32 },

    #[error("Invalid color string: {0}")]
    BadColor(String),

    #[error("Invalid project state: {0}")]
    InvalidProject(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SubgenError>;

impl SubgenError {
    /// Process exit code per the CLI's documented exit-code table.
    pub fn exit_code(&self) -> i32 {
        match self {
            SubgenError::BadInput(_) => 2,
            SubgenError::Config(_) => 3,
            SubgenError::MissingComponent { .. } => 4,
            SubgenError::Credential(_) => 5,
            SubgenError::Cancelled => 6,
            _ => 1,
        }
    }
}
