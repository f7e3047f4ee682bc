use thiserror::Error;

/// Main error type for the microreel library
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Media pool error: {0}")]
    Media(#[from] MediaError),

    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Media pool errors
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("Failed to parse media manifest {path}: {reason}")]
    ManifestParse { path: String, reason: String },

    #[error("Invalid media item {id}: {reason}")]
    InvalidItem { id: u32, reason: String },
}

/// Content ordering errors
#[derive(Error, Debug)]
pub enum OrderingError {
    #[error("Not enough content to fill the timeline: {reason}")]
    InsufficientContent { reason: String },

    #[error("Timeline references unknown media item {id}")]
    UnknownItem { id: u32 },
}

/// Encoding pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The encoder broke the output protocol (format announced twice, data
    /// before the muxer started, or an empty data buffer).
    #[error("Encoder protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    #[error("Encoder IO failure: {reason}")]
    EncoderIo { reason: String },

    #[error("Encoding cancelled by user")]
    Cancelled,

    #[error("Audio merge failed: {reason}")]
    MergeFailed { reason: String },

    #[error("Encoding failed: {reason}")]
    Failure { reason: String },
}

impl PipelineError {
    /// Distinguishes "you stopped it" from "something broke".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ReelError
pub type Result<T> = std::result::Result<T, ReelError>;

impl ReelError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}
