//! Segment scoring and filtering.

use crate::align::solver::CandidateSpan;
use crate::config::AlignConfig;
use crate::types::{AlignmentSegment, Decision, ReferenceUnit, RejectionReason, Token};

/// Turns solver candidates into decision-labeled segments, one per unit.
///
/// Duration, confidence and residual checks are independent and every
/// failure is recorded. A unit whose first or last token found no audio
/// fails the residual check whatever its mean cost. Units passing all three are then checked for
/// overlap against the accepted segments before them; of two overlapping
/// segments the one with higher text/audio similarity stays accepted.
pub fn score_segments(
    candidates: &[CandidateSpan],
    units: &[ReferenceUnit],
    audio: &[Token],
    config: &AlignConfig,
) -> Vec<AlignmentSegment> {
    let mut segments: Vec<AlignmentSegment> = Vec::with_capacity(candidates.len());
    let mut accepted: Vec<usize> = Vec::new();

    for candidate in candidates {
        let unit = &units[candidate.unit_index];
        let mut segment = match candidate.span {
            Some(span) => score_span(candidate, span, unit, audio, config),
            None => empty_segment(candidate, unit, audio),
        };

        if segment.is_accepted() {
            resolve_overlap(&mut segments, &mut accepted, &mut segment);
        }
        if segment.is_accepted() {
            accepted.push(segments.len());
        }
        segments.push(segment);
    }
    segments
}

fn empty_segment(candidate: &CandidateSpan, unit: &ReferenceUnit, audio: &[Token]) -> AlignmentSegment {
    let at = audio
        .get(candidate.cursor)
        .map(|t| t.start_time)
        .or_else(|| audio.last().map(|t| t.end_time))
        .unwrap_or(0.0);

    AlignmentSegment {
        reference_unit_id: unit.id.clone(),
        ordinal: unit.ordinal,
        text: unit.text.clone(),
        audio_start_time: at,
        audio_end_time: at,
        audio_token_range: None,
        text_audio_similarity: 0.0,
        residual_cost: candidate.residual_cost,
        duration_ratio: 0.0,
        mean_confidence: 0.0,
        decision: Decision::Rejected,
        reasons: vec![RejectionReason::NoAudioMatch],
    }
}

fn score_span(
    candidate: &CandidateSpan,
    (first, last): (usize, usize),
    unit: &ReferenceUnit,
    audio: &[Token],
    config: &AlignConfig,
) -> AlignmentSegment {
    let covered = &audio[first..=last];
    let start = audio[first].start_time;
    let end = audio[last].end_time.max(start);

    let expected = unit.normalized_char_count() as f64 / f64::from(config.expected_chars_per_second);
    let duration_ratio = if expected > 0.0 {
        ((end - start) / expected) as f32
    } else {
        0.0
    };
    let mean_confidence =
        covered.iter().map(|t| f64::from(t.confidence)).sum::<f64>() / covered.len() as f64;
    let mean_confidence = mean_confidence as f32;

    let mut reasons = Vec::new();
    let (min_ratio, max_ratio) = config.duration_ratio_range;
    if !(min_ratio..=max_ratio).contains(&duration_ratio) {
        reasons.push(RejectionReason::DurationImplausible);
    }
    if mean_confidence <= config.confidence_floor {
        reasons.push(RejectionReason::LowConfidence);
    }
    if candidate.residual_cost >= config.similarity_ceiling || candidate.edge_unmatched {
        reasons.push(RejectionReason::SimilarityTooLow);
    }

    let decision = if !reasons.is_empty() {
        Decision::Rejected
    } else if candidate.repeat_flagged {
        reasons.push(RejectionReason::RepeatedNarration);
        Decision::Ambiguous
    } else {
        Decision::Accepted
    };

    AlignmentSegment {
        reference_unit_id: unit.id.clone(),
        ordinal: unit.ordinal,
        text: unit.text.clone(),
        audio_start_time: start,
        audio_end_time: end,
        audio_token_range: Some((first, last)),
        text_audio_similarity: 1.0 - candidate.residual_cost,
        residual_cost: candidate.residual_cost,
        duration_ratio,
        mean_confidence,
        decision,
        reasons,
    }
}

/// Settles overlaps between `segment` and the accepted segments before it.
/// Equal similarity keeps the earlier segment.
fn resolve_overlap(
    segments: &mut [AlignmentSegment],
    accepted: &mut Vec<usize>,
    segment: &mut AlignmentSegment,
) {
    while let Some(&previous) = accepted.last() {
        let prior = &mut segments[previous];
        if !prior.overlaps(segment) {
            return;
        }
        if segment.text_audio_similarity > prior.text_audio_similarity {
            prior.decision = Decision::Rejected;
            prior.reasons.push(RejectionReason::Overlap);
            accepted.pop();
        } else {
            segment.decision = Decision::Rejected;
            segment.reasons.push(RejectionReason::Overlap);
            return;
        }
    }
}
