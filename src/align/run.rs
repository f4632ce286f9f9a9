//! One chapter's alignment, from inputs to scored segments.

use crate::align::solver::{self, Problem, Step};
use crate::align::{FlatReference, anchor, scorer};
use crate::config::AlignConfig;
use crate::error::{AlignError, Result};
use crate::report::RejectionReport;
use crate::transcript::validate_audio_tokens;
use crate::types::{AlignmentSegment, Anchor, ReferenceUnit, Token};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative cancellation flag, cheap to clone across workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Coarse progress signal, one call per anchor-delimited window.
pub trait ProgressObserver: Send + Sync {
    fn on_window(&self, windows_done: usize, windows_total: usize);
}

/// Observer that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_window(&self, _windows_done: usize, _windows_total: usize) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_window(&self, windows_done: usize, windows_total: usize) {
        self(windows_done, windows_total)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub chapter_id: String,
    /// One segment per reference unit, in reference order.
    pub segments: Vec<AlignmentSegment>,
    pub anchors: Vec<Anchor>,
    /// The DP path across all windows.
    pub trace: Vec<Step>,
    pub report: RejectionReport,
}

impl RunOutput {
    /// Accepted segments in reference order.
    pub fn accepted(&self) -> impl Iterator<Item = &AlignmentSegment> {
        self.segments.iter().filter(|s| s.is_accepted())
    }
}

/// Alignment of one chapter's audio against its reference units.
///
/// The run owns its inputs and all working buffers; runs for different
/// chapters share nothing and can execute on any thread.
#[derive(Debug, Clone)]
pub struct AlignmentRun {
    chapter_id: String,
    units: Vec<ReferenceUnit>,
    audio: Vec<Token>,
    config: AlignConfig,
}

impl AlignmentRun {
    pub fn new(
        chapter_id: impl Into<String>,
        units: Vec<ReferenceUnit>,
        audio: Vec<Token>,
        config: &AlignConfig,
    ) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            units,
            audio,
            config: config.clone(),
        }
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn units(&self) -> &[ReferenceUnit] {
        &self.units
    }

    /// Runs anchor matching, the solver and the scorer.
    ///
    /// # Errors
    /// - `InsufficientAnchors` when the chapter cannot be anchored
    /// - `Cancelled` when `cancel` fires between solver windows
    /// - `InvalidReference` / `InvalidTranscript` for malformed inputs
    pub fn execute(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressObserver,
    ) -> Result<RunOutput> {
        let started = Instant::now();
        self.validate_inputs()?;

        let reference = FlatReference::new(&self.units);
        let matched = anchor::match_anchors(
            &self.chapter_id,
            &self.units,
            &reference,
            &self.audio,
            &self.config,
        )?;

        let problem = Problem {
            chapter_id: &self.chapter_id,
            units: &self.units,
            reference: &reference,
            audio: &self.audio,
            anchors: &matched.anchors,
        };
        let solution = solver::solve(&problem, &self.config, cancel, progress)?;
        tracing::debug!(
            chapter = %self.chapter_id,
            windows = solution.windows,
            unsolved = solution.unsolved_windows,
            steps = solution.steps.len(),
            "solver finished"
        );

        let segments =
            scorer::score_segments(&solution.candidates, &self.units, &self.audio, &self.config);
        let report = RejectionReport::from_segments(&self.chapter_id, matched.anchors.len(), &segments);

        tracing::info!(
            chapter = %self.chapter_id,
            units = self.units.len(),
            anchors = matched.anchors.len(),
            accepted = report.totals.accepted,
            rejected = report.totals.rejected,
            ambiguous = report.totals.ambiguous,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chapter aligned"
        );

        Ok(RunOutput {
            chapter_id: self.chapter_id.clone(),
            segments,
            anchors: matched.anchors,
            trace: solution.steps,
            report,
        })
    }

    /// Runs the chapter and returns its segments and report. A chapter that
    /// cannot be anchored or was cancelled yields an empty segment list and
    /// a report with every unit never reached.
    ///
    /// # Errors
    /// Anything [`execute`](Self::execute) fails with except
    /// `InsufficientAnchors` and `Cancelled`.
    pub fn execute_to_report(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressObserver,
    ) -> Result<(Vec<AlignmentSegment>, RejectionReport)> {
        match self.execute(cancel, progress) {
            Ok(output) => Ok((output.segments, output.report)),
            Err(AlignError::InsufficientAnchors { found, required, .. }) => {
                let cause = format!("found {found} anchor(s), need at least {required}");
                tracing::warn!(chapter = %self.chapter_id, "unalignable: {cause}");
                let report = RejectionReport::unalignable(&self.chapter_id, found, &self.units, &cause);
                Ok((Vec::new(), report))
            }
            Err(AlignError::Cancelled { .. }) => {
                tracing::info!(chapter = %self.chapter_id, "run cancelled");
                Ok((Vec::new(), RejectionReport::cancelled(&self.chapter_id, &self.units)))
            }
            Err(e) => Err(e),
        }
    }

    fn validate_inputs(&self) -> Result<()> {
        if self.units.is_empty() {
            return Err(AlignError::InvalidReference {
                message: format!("chapter {} has no reference units", self.chapter_id),
            });
        }
        if let Some(pair) = self.units.windows(2).find(|w| w[0].ordinal >= w[1].ordinal) {
            return Err(AlignError::InvalidReference {
                message: format!(
                    "unit {} (ordinal {}) does not follow unit {} (ordinal {})",
                    pair[1].id, pair[1].ordinal, pair[0].id, pair[0].ordinal
                ),
            });
        }
        validate_audio_tokens(&self.audio)
    }
}
