//! Batch pipeline for aligning many chapters.
//!
//! Alignment stations run in their own threads, fed from one bounded
//! crossbeam channel so that workers pull chapters as they free up.

pub mod batch;
pub mod discovery;
pub mod error;
pub mod station;
pub mod types;

pub use batch::{AlignmentStation, BatchAligner, BatchSummary};
pub use discovery::{Book, Discovery, discover_chapters};
pub use error::{ErrorReporter, LogReporter, StationError};
pub use station::{Station, StationRunner};
pub use types::{ChapterJob, ChapterOutcome};
