//! Error types for bookalign.
//!
//! Only conditions that stop a whole run (or the tool) are errors. Per-unit
//! text/audio mismatch is never an error: it is a labeled
//! [`RejectionReason`](crate::types::RejectionReason) on the segment.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Run-level alignment errors
    #[error("Chapter {chapter} is unalignable: found {found} anchor(s), need at least {required}")]
    InsufficientAnchors {
        chapter: String,
        found: usize,
        required: usize,
    },

    #[error("Alignment of chapter {chapter} was cancelled")]
    Cancelled { chapter: String },

    // Collaborator input errors
    #[error("Invalid transcript: {message}")]
    InvalidTranscript { message: String },

    #[error("Invalid reference text: {message}")]
    InvalidReference { message: String },

    // Corpus output errors
    #[error("WAV error: {message}")]
    Wav { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl AlignError {
    /// True for errors that end a single chapter but leave a batch running.
    pub fn is_chapter_scoped(&self) -> bool {
        matches!(
            self,
            AlignError::InsufficientAnchors { .. }
                | AlignError::InvalidTranscript { .. }
                | AlignError::InvalidReference { .. }
        )
    }
}

impl From<hound::Error> for AlignError {
    fn from(err: hound::Error) -> Self {
        AlignError::Wav {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;
