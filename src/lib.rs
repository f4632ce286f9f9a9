//! bookalign - audiobook audio/text alignment for TTS corpora
//!
//! Pairs narrated chapters with their source text and cuts them into
//! time-aligned utterance/text segments, rejecting spans it cannot trust.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod align;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod emitter;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod segmenter;
pub mod text;
pub mod transcript;
pub mod types;

// Collaborators (text in, tokens in, corpus out)
pub use emitter::{CollectorEmitter, CorpusEmitter, EmitSummary, ManifestEmitter};
pub use segmenter::{ReferenceSegmenter, SentenceSegmenter};
pub use transcript::{JsonTranscriptLoader, MockTranscriber, Transcriber};

// Alignment engine
pub use align::{AlignmentRun, CancellationToken, NoProgress, ProgressObserver, RunOutput};
pub use types::{AlignmentSegment, Anchor, Decision, ReferenceUnit, RejectionReason, Token, TokenSource};

// Batch pipeline
pub use pipeline::{BatchAligner, BatchSummary, ChapterJob, ChapterOutcome, discover_chapters};

// Reporting
pub use report::{ChapterStatus, RejectionReport};

// Error handling
pub use error::{AlignError, Result};

// Config
pub use config::{AlignConfig, Config};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
