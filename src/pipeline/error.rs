//! Error types and reporting for batch stations.

use crate::error::AlignError;
use thiserror::Error;

/// Errors that can occur during station processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    /// The item failed; the station keeps processing.
    #[error("Recoverable error: {0}")]
    Recoverable(String),
    /// The station must shut down.
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl StationError {
    /// Classifies a failed chapter. Bad or missing inputs skip the chapter;
    /// anything else stops the worker.
    pub fn for_chapter(chapter_id: &str, error: &AlignError) -> Self {
        let message = format!("chapter {chapter_id}: {error}");
        if error.is_chapter_scoped() || matches!(error, AlignError::Io(_) | AlignError::Json(_)) {
            StationError::Recoverable(message)
        } else {
            StationError::Fatal(message)
        }
    }
}

/// Trait for reporting station errors.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, station: &str, error: &StationError);
}

/// Reports station errors through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        match error {
            StationError::Recoverable(msg) => tracing::warn!(station, "{msg}"),
            StationError::Fatal(msg) => tracing::error!(station, "{msg}"),
        }
    }
}
