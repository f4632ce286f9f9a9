//! Data types handed between batch stations.

use crate::report::{ChapterStatus, RejectionReport};
use crate::types::{AlignmentSegment, Decision};
use std::path::PathBuf;
use std::time::Duration;

/// One chapter to align: reference text plus where its transcript lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterJob {
    /// Position in the batch; outcomes are emitted in this order.
    pub sequence: u64,
    pub book_id: String,
    pub chapter_id: String,
    pub reference_path: PathBuf,
    /// Path handed to the transcriber. Need not exist for precomputed dumps.
    pub audio_path: PathBuf,
    /// Chapter audio to cut clips from, when present on disk.
    pub wav_path: Option<PathBuf>,
}

impl ChapterJob {
    pub fn new(
        book_id: impl Into<String>,
        chapter_id: impl Into<String>,
        reference_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sequence: 0,
            book_id: book_id.into(),
            chapter_id: chapter_id.into(),
            reference_path: reference_path.into(),
            audio_path: audio_path.into(),
            wav_path: None,
        }
    }

    pub fn with_wav(mut self, wav: impl Into<PathBuf>) -> Self {
        self.wav_path = Some(wav.into());
        self
    }
}

/// What one chapter produced, ready for emission.
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub sequence: u64,
    pub book_id: String,
    pub chapter_id: String,
    pub wav_path: Option<PathBuf>,
    /// One per unit for aligned chapters, empty otherwise.
    pub segments: Vec<AlignmentSegment>,
    pub report: RejectionReport,
    pub elapsed: Duration,
}

impl ChapterOutcome {
    pub fn status(&self) -> ChapterStatus {
        self.report.status
    }

    /// Accepted segments in reference order.
    pub fn accepted(&self) -> impl Iterator<Item = &AlignmentSegment> {
        self.segments.iter().filter(|s| s.is_accepted())
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.segments.iter().filter(|s| s.decision == decision).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_builder() {
        let job = ChapterJob::new("book", "book_01", "/d/book_01.txt", "/d/book_01.wav")
            .with_wav("/d/book_01.wav");
        assert_eq!(job.sequence, 0);
        assert_eq!(job.wav_path, Some(PathBuf::from("/d/book_01.wav")));
    }

    #[test]
    fn test_outcome_counts() {
        let outcome = ChapterOutcome {
            sequence: 0,
            book_id: "b".into(),
            chapter_id: "c".into(),
            wav_path: None,
            segments: Vec::new(),
            report: RejectionReport::cancelled("c", &[]),
            elapsed: Duration::ZERO,
        };
        assert_eq!(outcome.status(), ChapterStatus::Cancelled);
        assert_eq!(outcome.accepted().count(), 0);
        assert_eq!(outcome.count(Decision::Rejected), 0);
    }
}
