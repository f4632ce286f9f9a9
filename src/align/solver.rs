//! Anchor-constrained dynamic-programming alignment.
//!
//! The reference and audio streams are cut at every anchor. Matching anchor
//! tokens are paired one-to-one; each gap between them (plus the leading and
//! trailing gaps) is solved independently with an edit-distance matrix, so
//! no path can ever cross an anchor. Anchor pairs that do not match, such as
//! a window edge reaching into text the narrator skipped, fall into the
//! neighbouring gaps.

use crate::align::FlatReference;
use crate::align::run::{CancellationToken, ProgressObserver};
use crate::config::AlignConfig;
use crate::error::{AlignError, Result};
use crate::text::{token_similarity, window_similarity};
use crate::types::{Anchor, ReferenceUnit, Token};
use serde::Serialize;
use std::ops::Range;

const DIAG: u8 = 0;
const SKIP_AUDIO: u8 = 1;
const SKIP_REF: u8 = 2;

const COST_EPSILON: f64 = 1e-9;

/// Shortest run of skipped audio checked for a re-read.
const MIN_REPEAT_RUN: usize = 2;

/// One step of the alignment path. Indices are global stream positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Match {
        reference: usize,
        audio: usize,
        cost: f32,
        /// Token similarity reached the match threshold.
        matched: bool,
    },
    SkipReference {
        reference: usize,
        cost: f32,
    },
    SkipAudio {
        audio: usize,
        cost: f32,
    },
}

impl Step {
    pub fn cost(&self) -> f32 {
        match *self {
            Step::Match { cost, .. } | Step::SkipReference { cost, .. } | Step::SkipAudio { cost, .. } => {
                cost
            }
        }
    }

    fn reference(&self) -> Option<usize> {
        match *self {
            Step::Match { reference, .. } | Step::SkipReference { reference, .. } => {
                Some(reference)
            }
            Step::SkipAudio { .. } => None,
        }
    }
}

/// The solver's proposal for one reference unit, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpan {
    pub unit_index: usize,
    /// First and last matched audio token, inclusive.
    pub span: Option<(usize, usize)>,
    /// Mean path cost attributed to the unit, in [0, 1].
    pub residual_cost: f32,
    pub matched_tokens: usize,
    /// Skipped audio next to this unit re-reads its text.
    pub repeat_flagged: bool,
    /// The unit's first or last reference token has no matching audio.
    pub edge_unmatched: bool,
    /// Audio position the unit was reached at; places empty spans.
    pub cursor: usize,
}

/// Inputs of one solve, borrowed from the owning run.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    pub chapter_id: &'a str,
    pub units: &'a [ReferenceUnit],
    pub reference: &'a FlatReference,
    pub audio: &'a [Token],
    pub anchors: &'a [Anchor],
}

/// Full solver result: the path and one candidate per unit.
#[derive(Debug, Clone)]
pub struct Solution {
    pub steps: Vec<Step>,
    pub candidates: Vec<CandidateSpan>,
    pub windows: usize,
    /// Windows too large to solve; their reference tokens were skipped.
    pub unsolved_windows: usize,
}

/// Solves every anchor-delimited window in order.
///
/// Cancellation is checked before each window. Progress is reported after
/// each window as `(windows_done, windows_total)`.
pub fn solve(
    problem: &Problem<'_>,
    config: &AlignConfig,
    cancel: &CancellationToken,
    progress: &dyn ProgressObserver,
) -> Result<Solution> {
    let windows = windows(problem, config)?;
    let total = windows.len();
    let mut steps = Vec::with_capacity(problem.reference.len() + problem.audio.len());
    let mut unsolved = 0;

    for (done, window) in windows.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(AlignError::Cancelled {
                chapter: problem.chapter_id.to_string(),
            });
        }

        let solved = solve_window(
            window.reference.clone(),
            window.audio.clone(),
            problem,
            config,
            &mut steps,
        );
        if !solved {
            unsolved += 1;
        }
        if let Some(run) = window.closing {
            push_forced(run, problem, config, &mut steps);
        }
        progress.on_window(done + 1, total);
    }

    let mut candidates = build_candidates(problem, &steps);
    flag_repeats(problem, &steps, config, &mut candidates);

    Ok(Solution {
        steps,
        candidates,
        windows: total,
        unsolved_windows: unsolved,
    })
}

/// A stretch of anchor pairs that all match, paired without DP.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ForcedRun {
    reference: usize,
    audio: usize,
    length: usize,
}

struct Window {
    reference: Range<usize>,
    audio: Range<usize>,
    /// Forced run that ends this window, absent for the trailing window.
    closing: Option<ForcedRun>,
}

/// Splits an anchor into its maximal runs of matching pairs.
fn forced_runs(anchor: &Anchor, problem: &Problem<'_>, config: &AlignConfig) -> Vec<ForcedRun> {
    let mut runs: Vec<ForcedRun> = Vec::new();
    let mut open: Option<ForcedRun> = None;

    for k in 0..anchor.length {
        let reference = anchor.reference_token_index + k;
        let audio = anchor.audio_token_index + k;
        let (_, matched) = pair_cost(
            &problem.reference.tokens[reference],
            &problem.audio[audio],
            config,
        );
        if !matched {
            runs.extend(open.take());
        } else if let Some(run) = open.as_mut() {
            run.length += 1;
        } else {
            open = Some(ForcedRun {
                reference,
                audio,
                length: 1,
            });
        }
    }
    runs.extend(open);
    runs
}

fn windows(problem: &Problem<'_>, config: &AlignConfig) -> Result<Vec<Window>> {
    let mut out = Vec::with_capacity(problem.anchors.len() + 1);
    let (mut ref_pos, mut audio_pos) = (0, 0);

    for (i, anchor) in problem.anchors.iter().enumerate() {
        if anchor.reference_token_index < ref_pos
            || anchor.audio_token_index < audio_pos
            || anchor.reference_end() > problem.reference.len()
            || anchor.audio_end() > problem.audio.len()
        {
            return Err(AlignError::Other(format!(
                "anchor {i} of chapter {} is out of order or out of bounds",
                problem.chapter_id
            )));
        }
        for run in forced_runs(anchor, problem, config) {
            out.push(Window {
                reference: ref_pos..run.reference,
                audio: audio_pos..run.audio,
                closing: Some(run),
            });
            ref_pos = run.reference + run.length;
            audio_pos = run.audio + run.length;
        }
    }

    out.push(Window {
        reference: ref_pos..problem.reference.len(),
        audio: audio_pos..problem.audio.len(),
        closing: None,
    });
    Ok(out)
}

fn pair_cost(reference: &Token, audio: &Token, config: &AlignConfig) -> (f32, bool) {
    let similarity = token_similarity(reference, audio);
    let mut cost = 1.0 - similarity;
    if audio.confidence < config.low_confidence_token_floor {
        cost += config.low_confidence_penalty;
    }
    (cost.min(1.0), similarity >= config.token_match_threshold)
}

fn push_forced(run: ForcedRun, problem: &Problem<'_>, config: &AlignConfig, steps: &mut Vec<Step>) {
    for k in 0..run.length {
        let reference = run.reference + k;
        let audio = run.audio + k;
        let (cost, matched) = pair_cost(
            &problem.reference.tokens[reference],
            &problem.audio[audio],
            config,
        );
        steps.push(Step::Match {
            reference,
            audio,
            cost,
            matched,
        });
    }
}

/// Appends the lowest-cost path through one window. Returns false when the
/// window exceeded the cell budget and was skipped wholesale.
fn solve_window(
    reference: Range<usize>,
    audio: Range<usize>,
    problem: &Problem<'_>,
    config: &AlignConfig,
    steps: &mut Vec<Step>,
) -> bool {
    let rows = reference.len();
    let cols = audio.len();
    let width = cols + 1;
    let cells = (rows + 1).saturating_mul(width);

    let skip_ref = config.skip_reference_cost;
    let skip_audio = config.skip_audio_cost;

    if cells > config.max_window_cells {
        tracing::warn!(
            chapter = problem.chapter_id,
            reference_tokens = rows,
            audio_tokens = cols,
            "alignment window too large, leaving its units unmatched"
        );
        steps.extend(reference.map(|r| Step::SkipReference {
            reference: r,
            cost: skip_ref,
        }));
        steps.extend(audio.map(|a| Step::SkipAudio {
            audio: a,
            cost: skip_audio,
        }));
        return false;
    }

    let ref_tokens = &problem.reference.tokens[reference.clone()];
    let audio_tokens = &problem.audio[audio.clone()];

    let mut back = vec![DIAG; cells];
    let mut prev_cost: Vec<f64> = (0..width).map(|j| j as f64 * f64::from(skip_audio)).collect();
    let mut prev_skips = vec![0u32; width];
    let mut cur_cost = vec![0.0f64; width];
    let mut cur_skips = vec![0u32; width];
    for cell in back.iter_mut().take(width).skip(1) {
        *cell = SKIP_AUDIO;
    }

    for i in 1..=rows {
        cur_cost[0] = prev_cost[0] + f64::from(skip_ref);
        cur_skips[0] = prev_skips[0] + 1;
        back[i * width] = SKIP_REF;

        for j in 1..=cols {
            let (pair, _) = pair_cost(&ref_tokens[i - 1], &audio_tokens[j - 1], config);
            // Visit order is the tie-break order.
            let options = [
                (prev_cost[j - 1] + f64::from(pair), prev_skips[j - 1], DIAG),
                (cur_cost[j - 1] + f64::from(skip_audio), cur_skips[j - 1], SKIP_AUDIO),
                (prev_cost[j] + f64::from(skip_ref), prev_skips[j] + 1, SKIP_REF),
            ];
            let mut best = options[0];
            for option in &options[1..] {
                let cheaper = option.0 < best.0 - COST_EPSILON;
                let tied = (option.0 - best.0).abs() <= COST_EPSILON;
                if cheaper || (tied && option.1 < best.1) {
                    best = *option;
                }
            }
            cur_cost[j] = best.0;
            cur_skips[j] = best.1;
            back[i * width + j] = best.2;
        }

        std::mem::swap(&mut prev_cost, &mut cur_cost);
        std::mem::swap(&mut prev_skips, &mut cur_skips);
    }

    let mut path = Vec::with_capacity(rows + cols);
    let (mut i, mut j) = (rows, cols);
    while i > 0 || j > 0 {
        let op = if i == 0 {
            SKIP_AUDIO
        } else if j == 0 {
            SKIP_REF
        } else {
            back[i * width + j]
        };
        match op {
            DIAG => {
                let (cost, matched) = pair_cost(&ref_tokens[i - 1], &audio_tokens[j - 1], config);
                path.push(Step::Match {
                    reference: reference.start + i - 1,
                    audio: audio.start + j - 1,
                    cost,
                    matched,
                });
                i -= 1;
                j -= 1;
            }
            SKIP_AUDIO => {
                path.push(Step::SkipAudio {
                    audio: audio.start + j - 1,
                    cost: skip_audio,
                });
                j -= 1;
            }
            _ => {
                path.push(Step::SkipReference {
                    reference: reference.start + i - 1,
                    cost: skip_ref,
                });
                i -= 1;
            }
        }
    }
    steps.extend(path.into_iter().rev());
    true
}

#[derive(Default)]
struct UnitTally {
    cost_sum: f64,
    steps: usize,
    first: Option<usize>,
    last: Option<usize>,
    matched: usize,
    cursor: Option<usize>,
    opens_matched: Option<bool>,
    closes_matched: bool,
}

fn build_candidates(problem: &Problem<'_>, steps: &[Step]) -> Vec<CandidateSpan> {
    let mut tallies: Vec<UnitTally> = problem.units.iter().map(|_| UnitTally::default()).collect();
    let mut skipped_audio: Vec<(usize, f32)> = Vec::new();
    let mut next_audio = 0;

    for step in steps {
        match *step {
            Step::Match {
                reference,
                audio,
                cost,
                matched,
            } => {
                let tally = &mut tallies[problem.reference.unit_of[reference]];
                tally.cursor.get_or_insert(audio);
                tally.cost_sum += f64::from(cost);
                tally.steps += 1;
                tally.opens_matched.get_or_insert(matched);
                tally.closes_matched = matched;
                if matched {
                    tally.first.get_or_insert(audio);
                    tally.last = Some(audio);
                    tally.matched += 1;
                }
                next_audio = audio + 1;
            }
            Step::SkipReference { reference, cost } => {
                let tally = &mut tallies[problem.reference.unit_of[reference]];
                tally.cursor.get_or_insert(next_audio);
                tally.cost_sum += f64::from(cost);
                tally.steps += 1;
                tally.opens_matched.get_or_insert(false);
                tally.closes_matched = false;
            }
            Step::SkipAudio { audio, cost } => {
                skipped_audio.push((audio, cost));
                next_audio = audio + 1;
            }
        }
    }

    let mut carried_cursor = 0;
    tallies
        .into_iter()
        .enumerate()
        .map(|(unit_index, tally)| {
            let span = tally.first.zip(tally.last);
            let cursor = tally.cursor.unwrap_or(carried_cursor);
            carried_cursor = span.map_or(cursor, |(_, last)| last + 1);

            let (mut cost_sum, mut count) = (tally.cost_sum, tally.steps);
            if let Some((first, last)) = span {
                let lo = skipped_audio.partition_point(|&(a, _)| a <= first);
                let hi = skipped_audio.partition_point(|&(a, _)| a < last);
                for &(_, cost) in &skipped_audio[lo..hi.max(lo)] {
                    cost_sum += f64::from(cost);
                    count += 1;
                }
            }
            let residual_cost = if count == 0 {
                1.0
            } else {
                (cost_sum / count as f64).clamp(0.0, 1.0) as f32
            };

            CandidateSpan {
                unit_index,
                span,
                residual_cost,
                matched_tokens: tally.matched,
                repeat_flagged: false,
                edge_unmatched: !(tally.opens_matched.unwrap_or(false) && tally.closes_matched),
                cursor,
            }
        })
        .collect()
}

/// Marks units whose text is re-read by an adjacent run of skipped audio.
fn flag_repeats(
    problem: &Problem<'_>,
    steps: &[Step],
    config: &AlignConfig,
    candidates: &mut [CandidateSpan],
) {
    let unit_at = |step: &Step| step.reference().map(|r| problem.reference.unit_of[r]);
    let mut previous_unit: Option<usize> = None;
    let mut i = 0;

    while i < steps.len() {
        let Step::SkipAudio { audio: run_start, .. } = steps[i] else {
            if let Some(unit) = unit_at(&steps[i]) {
                previous_unit = Some(unit);
            }
            i += 1;
            continue;
        };

        let mut run_end = i;
        while run_end < steps.len() && matches!(steps[run_end], Step::SkipAudio { .. }) {
            run_end += 1;
        }
        let run_len = run_end - i;

        if run_len >= MIN_REPEAT_RUN {
            let run = &problem.audio[run_start..run_start + run_len];
            let next_unit = steps[run_end..].iter().find_map(unit_at);

            if let Some(unit) = previous_unit {
                let tokens = &problem.units[unit].tokens;
                let tail = &tokens[tokens.len().saturating_sub(run_len)..];
                if !tail.is_empty() && window_similarity(run, tail) >= config.anchor_similarity_threshold {
                    candidates[unit].repeat_flagged = true;
                }
            }
            if let Some(unit) = next_unit {
                let tokens = &problem.units[unit].tokens;
                let head = &tokens[..run_len.min(tokens.len())];
                if !head.is_empty() && window_similarity(run, head) >= config.anchor_similarity_threshold {
                    candidates[unit].repeat_flagged = true;
                }
            }
        }
        i = run_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::NoProgress;

    fn audio_from(text: &str) -> Vec<Token> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| Token::audio(w, i as f64 * 0.3, i as f64 * 0.3 + 0.3, 0.95))
            .collect()
    }

    fn units(sentences: &[&str]) -> Vec<ReferenceUnit> {
        sentences
            .iter()
            .enumerate()
            .map(|(i, s)| ReferenceUnit::from_text(format!("u{i}"), i, s))
            .collect()
    }

    fn run_solve(units: &[ReferenceUnit], audio: &[Token], anchors: &[Anchor]) -> Solution {
        run_solve_with(units, audio, anchors, &AlignConfig::default())
    }

    fn run_solve_with(
        units: &[ReferenceUnit],
        audio: &[Token],
        anchors: &[Anchor],
        config: &AlignConfig,
    ) -> Solution {
        let reference = FlatReference::new(units);
        let problem = Problem {
            chapter_id: "ch",
            units,
            reference: &reference,
            audio,
            anchors,
        };
        solve(&problem, config, &CancellationToken::new(), &NoProgress).unwrap()
    }

    fn anchor(reference: usize, audio: usize, length: usize) -> Anchor {
        Anchor {
            reference_unit_id: String::new(),
            reference_ordinal: 0,
            reference_token_index: reference,
            audio_token_index: audio,
            length,
            similarity_score: 1.0,
        }
    }

    #[test]
    fn test_exact_match_has_zero_residual() {
        let units = units(&["Chapter One.", "It was a dark night.", "The end."]);
        let audio = audio_from("chapter one it was a dark night the end");
        let solution = run_solve(&units, &audio, &[]);

        let spans: Vec<_> = solution.candidates.iter().map(|c| c.span).collect();
        assert_eq!(spans, vec![Some((0, 1)), Some((2, 6)), Some((7, 8))]);
        assert!(solution.candidates.iter().all(|c| c.residual_cost == 0.0));
        assert_eq!(solution.windows, 1);
    }

    #[test]
    fn test_anchor_tokens_are_forced_pairs() {
        let units = units(&["alpha beta gamma delta epsilon"]);
        let audio = audio_from("alpha beta gamma delta epsilon");
        let solution = run_solve(&units, &audio, &[anchor(1, 1, 3)]);

        assert_eq!(solution.windows, 2);
        assert!(solution.steps.contains(&Step::Match {
            reference: 2,
            audio: 2,
            cost: 0.0,
            matched: true
        }));
        assert_eq!(solution.candidates[0].span, Some((0, 4)));
    }

    #[test]
    fn test_mismatched_anchor_edge_is_left_to_dp() {
        let units = units(&["The stairs every evening.", "This edition.", "He lit the lamp."]);
        let audio = audio_from("the stairs every evening he lit the lamp");
        // The window edge "this" landed on the narrated "he".
        let solution = run_solve(&units, &audio, &[anchor(0, 0, 5)]);

        assert!(!solution.steps.iter().any(|s| matches!(s, Step::Match { reference: 4, .. })));
        assert_eq!(solution.candidates[0].span, Some((0, 3)));
        assert_eq!(solution.candidates[1].span, None);
        assert_eq!(solution.candidates[2].span, Some((4, 7)));
        assert!(!solution.candidates[2].edge_unmatched);
        assert_eq!(solution.candidates[2].residual_cost, 0.0);
    }

    #[test]
    fn test_forced_runs_split_at_mismatches() {
        let units = units(&["alpha beta gamma delta epsilon"]);
        let audio = audio_from("alpha beta quartz delta epsilon");
        let reference = FlatReference::new(&units);
        let problem = Problem {
            chapter_id: "ch",
            units: &units,
            reference: &reference,
            audio: &audio,
            anchors: &[],
        };

        let runs = forced_runs(&anchor(0, 0, 5), &problem, &AlignConfig::default());
        assert_eq!(
            runs,
            vec![
                ForcedRun {
                    reference: 0,
                    audio: 0,
                    length: 2
                },
                ForcedRun {
                    reference: 3,
                    audio: 3,
                    length: 2
                },
            ]
        );
    }

    #[test]
    fn test_skipped_first_token_marks_unit_edge() {
        let units = units(&["Quartz ship left port.", "Night fell quickly."]);
        let audio = audio_from("ship left port night fell quickly");
        let solution = run_solve(&units, &audio, &[]);

        assert_eq!(solution.candidates[0].span, Some((0, 2)));
        assert!(solution.candidates[0].edge_unmatched);
        assert!(!solution.candidates[1].edge_unmatched);
    }

    #[test]
    fn test_omitted_unit_gets_empty_span() {
        let units = units(&["The ship left port.", "Gulls circled overhead.", "Night fell quickly."]);
        let audio = audio_from("the ship left port night fell quickly");
        let solution = run_solve(&units, &audio, &[]);

        let omitted = &solution.candidates[1];
        assert_eq!(omitted.span, None);
        assert_eq!(omitted.cursor, 4);
        assert_eq!(omitted.residual_cost, 1.0);
        assert_eq!(solution.candidates[2].span, Some((4, 6)));
    }

    #[test]
    fn test_inserted_audio_is_skipped() {
        let units = units(&["The ship left port.", "Night fell quickly."]);
        let audio = audio_from("the ship left port visit our sponsor today night fell quickly");
        let solution = run_solve(&units, &audio, &[]);

        assert_eq!(solution.candidates[0].span, Some((0, 3)));
        assert_eq!(solution.candidates[1].span, Some((8, 10)));
        assert!(solution.candidates.iter().all(|c| !c.repeat_flagged));
    }

    #[test]
    fn test_re_read_unit_is_flagged() {
        let units = units(&["The ship left port.", "Night fell quickly.", "Stars came out."]);
        let audio = audio_from("the ship left port night fell quickly night fell quickly stars came out");
        let solution = run_solve(&units, &audio, &[]);

        assert!(solution.candidates[1].repeat_flagged);
        assert!(!solution.candidates[0].repeat_flagged);
        assert!(!solution.candidates[2].repeat_flagged);
        let (first, last) = solution.candidates[1].span.unwrap();
        assert_eq!(last - first, 2, "one reading only");
    }

    #[test]
    fn test_low_confidence_audio_is_penalized() {
        let config = AlignConfig::default();
        let reference = Token::reference("night");
        let clear = Token::audio("nights", 0.0, 0.3, 0.9);
        let murky = Token::audio("nights", 0.0, 0.3, 0.1);

        let (clear_cost, _) = pair_cost(&reference, &clear, &config);
        let (murky_cost, matched) = pair_cost(&reference, &murky, &config);
        assert!((murky_cost - clear_cost - config.low_confidence_penalty).abs() < 1e-6);
        assert!(matched);
    }

    #[test]
    fn test_oversized_window_is_skipped() {
        let config = AlignConfig {
            max_window_cells: 4,
            ..AlignConfig::default()
        };
        let units = units(&["one two three"]);
        let audio = audio_from("one two three");
        let solution = run_solve_with(&units, &audio, &[], &config);

        assert_eq!(solution.unsolved_windows, 1);
        assert_eq!(solution.candidates[0].span, None);
    }

    #[test]
    fn test_cancelled_before_first_window() {
        let units = units(&["one two three"]);
        let reference = FlatReference::new(&units);
        let audio = audio_from("one two three");
        let problem = Problem {
            chapter_id: "ch",
            units: &units,
            reference: &reference,
            audio: &audio,
            anchors: &[],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = solve(&problem, &AlignConfig::default(), &cancel, &NoProgress).unwrap_err();
        assert!(matches!(err, AlignError::Cancelled { .. }));
    }

    #[test]
    fn test_progress_reports_every_window() {
        use std::sync::Mutex;

        let units = units(&["a b c d e f g h i"]);
        let reference = FlatReference::new(&units);
        let audio = audio_from("a b c d e f g h i");
        let anchors = [anchor(0, 0, 3), anchor(4, 4, 3)];
        let problem = Problem {
            chapter_id: "ch",
            units: &units,
            reference: &reference,
            audio: &audio,
            anchors: &anchors,
        };
        let seen = Mutex::new(Vec::new());
        let observer = |done: usize, total: usize| seen.lock().unwrap().push((done, total));

        solve(&problem, &AlignConfig::default(), &CancellationToken::new(), &observer).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_out_of_order_anchors_are_rejected() {
        let units = units(&["a b c d e f g h i"]);
        let reference = FlatReference::new(&units);
        let audio = audio_from("a b c d e f g h i");
        let anchors = [anchor(4, 4, 3), anchor(0, 0, 3)];
        let problem = Problem {
            chapter_id: "ch",
            units: &units,
            reference: &reference,
            audio: &audio,
            anchors: &anchors,
        };
        let result = solve(&problem, &AlignConfig::default(), &CancellationToken::new(), &NoProgress);
        assert!(result.is_err());
    }
}
