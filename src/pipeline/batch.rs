//! Parallel alignment of many chapters.
//!
//! ```text
//! feeder ──▶ [jobs] ──▶ AlignmentStation × N ──▶ [outcomes] ──▶ reorder ──▶ emitter
//! ```
//!
//! Chapters are independent, so every worker owns a full alignment stack and
//! the only shared state is the read-only collaborators and the cancellation
//! flag. Outcomes arrive in completion order and are emitted in job order.

use crate::align::{AlignmentRun, CancellationToken, NoProgress};
use crate::config::{AlignConfig, BatchConfig};
use crate::defaults;
use crate::emitter::{CorpusEmitter, EmitSummary};
use crate::error::{AlignError, Result};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::station::{Station, StationRunner};
use crate::pipeline::types::{ChapterJob, ChapterOutcome};
use crate::report::{ChapterStatus, RejectionReport};
use crate::segmenter::ReferenceSegmenter;
use crate::transcript::Transcriber;
use crate::types::Decision;
use crossbeam_channel::bounded;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Station that turns a chapter job into a chapter outcome.
///
/// Chapters that cannot be anchored or were cancelled still produce an
/// outcome (with a report of never-reached units). Unreadable inputs are
/// reported as recoverable errors and yield nothing.
pub struct AlignmentStation {
    transcriber: Arc<dyn Transcriber>,
    segmenter: Arc<dyn ReferenceSegmenter>,
    config: AlignConfig,
    cancel: CancellationToken,
}

impl AlignmentStation {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        segmenter: Arc<dyn ReferenceSegmenter>,
        config: AlignConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transcriber,
            segmenter,
            config,
            cancel,
        }
    }

    /// Aligns one chapter without any channel plumbing.
    pub fn align(&self, job: &ChapterJob) -> Result<ChapterOutcome> {
        let started = Instant::now();
        let text = fs::read_to_string(&job.reference_path)?;
        let units = self.segmenter.segment(&job.chapter_id, &text)?;

        let outcome = |segments, report| ChapterOutcome {
            sequence: job.sequence,
            book_id: job.book_id.clone(),
            chapter_id: job.chapter_id.clone(),
            wav_path: job.wav_path.clone(),
            segments,
            report,
            elapsed: started.elapsed(),
        };

        if self.cancel.is_cancelled() {
            let report = RejectionReport::cancelled(&job.chapter_id, &units);
            return Ok(outcome(Vec::new(), report));
        }

        let tokens = self.transcriber.transcribe(&job.audio_path)?;
        let run = AlignmentRun::new(job.chapter_id.clone(), units, tokens, &self.config);

        let (segments, report) = run.execute_to_report(&self.cancel, &NoProgress)?;
        Ok(outcome(segments, report))
    }
}

impl Station for AlignmentStation {
    type Input = ChapterJob;
    type Output = ChapterOutcome;

    fn process(&mut self, job: ChapterJob) -> std::result::Result<Option<ChapterOutcome>, StationError> {
        self.align(&job)
            .map(Some)
            .map_err(|e| StationError::for_chapter(&job.chapter_id, &e))
    }

    fn name(&self) -> &'static str {
        "align"
    }
}

/// Totals over a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub books: usize,
    pub chapters: usize,
    pub aligned: usize,
    pub unalignable: usize,
    pub cancelled: usize,
    /// Chapters whose inputs could not be read or parsed.
    pub failed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub ambiguous: usize,
    pub emitted: EmitSummary,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchSummary {
    fn record(&mut self, outcome: &ChapterOutcome) {
        match outcome.status() {
            ChapterStatus::Aligned => self.aligned += 1,
            ChapterStatus::Unalignable => self.unalignable += 1,
            ChapterStatus::Cancelled => self.cancelled += 1,
        }
        self.accepted += outcome.count(Decision::Accepted);
        self.rejected += outcome.count(Decision::Rejected);
        self.ambiguous += outcome.count(Decision::Ambiguous);
    }
}

/// Runs chapter jobs on a pool of alignment stations.
pub struct BatchAligner {
    transcriber: Arc<dyn Transcriber>,
    segmenter: Arc<dyn ReferenceSegmenter>,
    align: AlignConfig,
    batch: BatchConfig,
    cancel: CancellationToken,
    reporter: Arc<dyn ErrorReporter>,
}

impl BatchAligner {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        segmenter: Arc<dyn ReferenceSegmenter>,
        align: AlignConfig,
        batch: BatchConfig,
    ) -> Self {
        Self {
            transcriber,
            segmenter,
            align,
            batch,
            cancel: CancellationToken::new(),
            reporter: Arc::new(LogReporter),
        }
    }

    /// Shares an externally owned cancellation flag (e.g. a Ctrl-C handler).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Aligns every job and hands outcomes to `emitter` in job order.
    ///
    /// Job sequence numbers are reassigned from their position in `jobs`.
    /// Returns an error only when the emitter fails or a worker panics;
    /// per-chapter problems are counted in the summary.
    pub fn run(&self, mut jobs: Vec<ChapterJob>, emitter: &mut dyn CorpusEmitter) -> Result<BatchSummary> {
        let started = Instant::now();
        for (i, job) in jobs.iter_mut().enumerate() {
            job.sequence = i as u64;
        }

        let mut summary = BatchSummary {
            books: jobs.iter().map(|j| j.book_id.as_str()).collect::<BTreeSet<_>>().len(),
            chapters: jobs.len(),
            ..BatchSummary::default()
        };
        if jobs.is_empty() {
            summary.emitted = emitter.finish()?;
            return Ok(summary);
        }

        let workers = defaults::worker_count(self.batch.workers).min(jobs.len());
        let capacity = self.batch.queue_capacity.max(1);
        let (job_tx, job_rx) = bounded::<ChapterJob>(capacity);
        let (outcome_tx, outcome_rx) = bounded::<ChapterOutcome>(capacity);

        tracing::info!(
            chapters = jobs.len(),
            workers,
            emitter = emitter.name(),
            "starting batch"
        );

        let mut runners = Vec::with_capacity(workers);
        for worker in 0..workers {
            let station = AlignmentStation::new(
                self.transcriber.clone(),
                self.segmenter.clone(),
                self.align.clone(),
                self.cancel.clone(),
            );
            runners.push(StationRunner::spawn(
                station,
                worker,
                job_rx.clone(),
                outcome_tx.clone(),
                self.reporter.clone(),
            )?);
        }
        drop(job_rx);
        drop(outcome_tx);

        let feeder = thread::Builder::new()
            .name("batch-feeder".to_string())
            .spawn(move || {
                for job in jobs {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            })?;

        let mut pending: BTreeMap<u64, ChapterOutcome> = BTreeMap::new();
        let mut next = 0u64;
        let mut received = 0usize;
        let mut failure: Option<AlignError> = None;

        'receive: for outcome in outcome_rx.iter() {
            received += 1;
            pending.insert(outcome.sequence, outcome);
            while let Some(ready) = pending.remove(&next) {
                next += 1;
                summary.record(&ready);
                if let Err(e) = emitter.emit(&ready) {
                    failure = Some(e);
                    break 'receive;
                }
            }
        }
        drop(outcome_rx);

        if failure.is_none() {
            // Whatever is left sits behind a failed chapter.
            for ready in std::mem::take(&mut pending).into_values() {
                summary.record(&ready);
                if let Err(e) = emitter.emit(&ready) {
                    failure = Some(e);
                    break;
                }
            }
        } else {
            self.cancel.cancel();
        }

        for runner in runners {
            runner.join()?;
        }
        feeder
            .join()
            .map_err(|_| AlignError::Other("batch feeder thread panicked".to_string()))?;

        if let Some(e) = failure {
            return Err(e);
        }

        summary.failed = summary.chapters - received;
        summary.emitted = emitter.finish()?;
        summary.elapsed = started.elapsed();
        tracing::info!(
            chapters = summary.chapters,
            aligned = summary.aligned,
            unalignable = summary.unalignable,
            failed = summary.failed,
            accepted = summary.accepted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch complete"
        );
        Ok(summary)
    }
}
