//! Anchor matching: sparse, locally unique reference/audio correspondences.
//!
//! Reference windows are taken over the flattened reference stream and
//! matched against audio windows of the same length. Until the first anchor
//! is found the whole transcript is a candidate (through a token index);
//! afterwards the search is bounded around the position extrapolated from
//! the last anchor, widening by one radius per consecutive miss so that long
//! inserted passages (ads, forewords) are eventually crossed.

use crate::align::FlatReference;
use crate::config::AlignConfig;
use crate::defaults;
use crate::error::{AlignError, Result};
use crate::text::{joined, normalized_similarity};
use crate::types::{Anchor, ReferenceUnit, Token};
use std::collections::{BTreeSet, HashMap};

/// Scores within this distance are the same score.
const TIE_EPSILON: f32 = 1e-6;

/// Result of anchor matching for one chapter.
#[derive(Debug, Clone, Default)]
pub struct AnchorMatch {
    /// Monotonic anchors, ascending in both reference and audio position.
    pub anchors: Vec<Anchor>,
    /// Reference windows examined.
    pub windows_examined: usize,
    /// Windows whose best match was tied or nearly tied elsewhere.
    pub ambiguous_windows: usize,
    /// Anchors removed by the monotonicity post-filter.
    pub dropped_conflicts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WindowMatch {
    Unique { audio_index: usize, similarity: f32 },
    Ambiguous,
    NoMatch,
}

/// Finds anchors between a chapter's reference units and its audio tokens.
///
/// Returns [`AlignError::InsufficientAnchors`] when fewer than
/// `config.min_anchors` survive the monotonicity filter.
pub fn match_anchors(
    chapter_id: &str,
    units: &[ReferenceUnit],
    reference: &FlatReference,
    audio: &[Token],
    config: &AlignConfig,
) -> Result<AnchorMatch> {
    let mut result = find_candidates(units, reference, audio, config);
    let (anchors, dropped) = enforce_monotonic(std::mem::take(&mut result.anchors));
    result.anchors = anchors;
    result.dropped_conflicts = dropped;

    tracing::debug!(
        chapter = chapter_id,
        anchors = result.anchors.len(),
        windows = result.windows_examined,
        ambiguous = result.ambiguous_windows,
        dropped = result.dropped_conflicts,
        "anchor matching finished"
    );

    if result.anchors.len() < config.min_anchors {
        return Err(AlignError::InsufficientAnchors {
            chapter: chapter_id.to_string(),
            found: result.anchors.len(),
            required: config.min_anchors,
        });
    }
    Ok(result)
}

/// Window length for a chapter: short chapters shrink the window so that
/// they can still yield `min_anchors` windows.
fn effective_window_len(reference_len: usize, config: &AlignConfig) -> usize {
    let per_anchor = reference_len / config.min_anchors.max(1);
    config
        .anchor_window_len
        .min(per_anchor.max(defaults::ANCHOR_WINDOW_MIN))
}

fn find_candidates(
    units: &[ReferenceUnit],
    reference: &FlatReference,
    audio: &[Token],
    config: &AlignConfig,
) -> AnchorMatch {
    let mut result = AnchorMatch::default();
    let window = effective_window_len(reference.len(), config);
    if reference.len() < defaults::ANCHOR_WINDOW_MIN || audio.len() < defaults::ANCHOR_WINDOW_MIN {
        return result;
    }

    let index = AudioIndex::new(audio);
    let mut last: Option<(usize, usize, usize)> = None; // (ref start, audio start, len)
    let mut misses = 0usize;
    let mut start = 0usize;

    while start < reference.len() {
        let len = window.min(reference.len() - start);
        if len < defaults::ANCHOR_WINDOW_MIN || len > audio.len() {
            break;
        }
        let ref_window = &reference.tokens[start..start + len];
        let ref_text = joined(ref_window);
        result.windows_examined += 1;

        let outcome = match last {
            None => {
                let candidates = index.candidate_starts(ref_window, len, audio.len());
                best_unique(&ref_text, audio, candidates, len, config)
            }
            Some((last_ref, last_audio, last_len)) => {
                let (lo, hi) = search_range(
                    start,
                    len,
                    (last_ref, last_audio, last_len),
                    reference.len(),
                    audio.len(),
                    config.anchor_search_radius * (1 + misses),
                );
                if lo > hi {
                    WindowMatch::NoMatch
                } else {
                    best_unique(&ref_text, audio, lo..=hi, len, config)
                }
            }
        };

        match outcome {
            WindowMatch::Unique {
                audio_index,
                similarity,
            } => {
                let unit = &units[reference.unit_of[start]];
                result.anchors.push(Anchor {
                    reference_unit_id: unit.id.clone(),
                    reference_ordinal: unit.ordinal,
                    reference_token_index: start,
                    audio_token_index: audio_index,
                    length: len,
                    similarity_score: similarity,
                });
                last = Some((start, audio_index, len));
                misses = 0;
            }
            WindowMatch::Ambiguous => {
                result.ambiguous_windows += 1;
                misses += 1;
            }
            WindowMatch::NoMatch => misses += 1,
        }
        start += len;
    }
    result
}

/// Audio start range to search for a reference window after an anchor.
fn search_range(
    ref_start: usize,
    len: usize,
    last: (usize, usize, usize),
    reference_len: usize,
    audio_len: usize,
    radius: usize,
) -> (usize, usize) {
    let (last_ref, last_audio, last_len) = last;
    let remaining_ref = reference_len.saturating_sub(last_ref).max(1) as f64;
    let remaining_audio = audio_len.saturating_sub(last_audio) as f64;
    let rate = (remaining_audio / remaining_ref).clamp(0.5, 2.0);

    let offset = (ref_start - last_ref) as f64 * rate;
    let predicted = last_audio + offset.round() as usize;
    let lo = (last_audio + last_len).saturating_sub(radius);
    let hi = (predicted + radius).min(audio_len - len);
    (lo, hi)
}

/// Picks the single best audio window, rejecting ties and near-ties.
fn best_unique(
    ref_text: &str,
    audio: &[Token],
    starts: impl IntoIterator<Item = usize>,
    len: usize,
    config: &AlignConfig,
) -> WindowMatch {
    let threshold = config.anchor_similarity_threshold;
    let floor = threshold - config.anchor_uniqueness_margin;
    let mut contenders: Vec<(usize, f32)> = Vec::new();
    let mut best: Option<(usize, f32)> = None;

    for start in starts {
        let similarity = normalized_similarity(ref_text, &joined(&audio[start..start + len]));
        if similarity >= floor {
            contenders.push((start, similarity));
        }
        match best {
            Some((_, b)) if similarity <= b + TIE_EPSILON => {}
            _ => best = Some((start, similarity)),
        }
    }

    let Some((best_start, best_sim)) = best else {
        return WindowMatch::NoMatch;
    };
    if best_sim < threshold {
        return WindowMatch::NoMatch;
    }

    let contested = contenders.iter().any(|&(start, similarity)| {
        if start == best_start {
            return false;
        }
        let tied = (similarity - best_sim).abs() <= TIE_EPSILON;
        let disjoint = start.abs_diff(best_start) >= len;
        tied || (disjoint && similarity >= best_sim - config.anchor_uniqueness_margin)
    });

    if contested {
        WindowMatch::Ambiguous
    } else {
        WindowMatch::Unique {
            audio_index: best_start,
            similarity: best_sim,
        }
    }
}

/// Drops anchors that break monotonicity, weakest first.
///
/// Anchors are visited in ascending reference position. A later anchor whose
/// audio window does not start after the previous kept anchor's audio window
/// conflicts with it; the lower-similarity one is dropped, and on equal
/// similarity the earlier anchor is kept. Returns the kept anchors and the
/// number dropped.
pub fn enforce_monotonic(mut anchors: Vec<Anchor>) -> (Vec<Anchor>, usize) {
    anchors.sort_by_key(|a| a.reference_token_index);
    let total = anchors.len();
    let mut kept: Vec<Anchor> = Vec::with_capacity(total);

    for candidate in anchors {
        let mut keep_candidate = true;
        while let Some(previous) = kept.last() {
            let conflict = candidate.audio_token_index < previous.audio_end()
                || candidate.reference_token_index < previous.reference_end();
            if !conflict {
                break;
            }
            if candidate.similarity_score > previous.similarity_score {
                kept.pop();
            } else {
                keep_candidate = false;
                break;
            }
        }
        if keep_candidate {
            kept.push(candidate);
        }
    }

    let dropped = total - kept.len();
    (kept, dropped)
}

/// Positions of every normalized word in the transcript.
struct AudioIndex<'a> {
    positions: HashMap<&'a str, Vec<usize>>,
}

impl<'a> AudioIndex<'a> {
    fn new(audio: &'a [Token]) -> Self {
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, token) in audio.iter().enumerate() {
            positions.entry(token.normalized.as_str()).or_default().push(i);
        }
        Self { positions }
    }

    /// Window starts sharing at least one exact word with the reference window,
    /// ascending.
    fn candidate_starts(&self, window: &[Token], len: usize, audio_len: usize) -> BTreeSet<usize> {
        let mut starts = BTreeSet::new();
        for (offset, token) in window.iter().enumerate() {
            let Some(hits) = self.positions.get(token.normalized.as_str()) else {
                continue;
            };
            for &hit in hits {
                if let Some(start) = hit.checked_sub(offset)
                    && start + len <= audio_len
                {
                    starts.insert(start);
                }
            }
        }
        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{ReferenceSegmenter, SentenceSegmenter};

    fn audio_from(text: &str) -> Vec<Token> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| Token::audio(w, i as f64 * 0.3, i as f64 * 0.3 + 0.3, 0.95))
            .collect()
    }

    fn units(text: &str) -> Vec<ReferenceUnit> {
        SentenceSegmenter::default().segment("ch", text).unwrap()
    }

    fn anchor(reference: usize, audio: usize, similarity: f32) -> Anchor {
        Anchor {
            reference_unit_id: format!("u{reference}"),
            reference_ordinal: reference,
            reference_token_index: reference * 5,
            audio_token_index: audio,
            length: 5,
            similarity_score: similarity,
        }
    }

    const STORY: &str = "The old lighthouse keeper climbed the stairs every evening. \
        He lit the great lamp and watched the ships pass. \
        Nobody in the village remembered when he had arrived. \
        Some said he came from across the northern sea.";

    #[test]
    fn test_exact_narration_yields_monotonic_anchors() {
        let units = units(STORY);
        let reference = FlatReference::new(&units);
        let audio = audio_from(STORY);

        let result =
            match_anchors("ch", &units, &reference, &audio, &AlignConfig::default()).unwrap();

        assert!(result.anchors.len() >= 4);
        for pair in result.anchors.windows(2) {
            assert!(pair[0].reference_token_index < pair[1].reference_token_index);
            assert!(pair[0].audio_end() <= pair[1].audio_token_index);
        }
        for a in &result.anchors {
            assert_eq!(a.reference_token_index, a.audio_token_index);
            assert!(a.similarity_score >= 0.85);
        }
    }

    #[test]
    fn test_foreword_in_audio_is_skipped() {
        let units = units(STORY);
        let reference = FlatReference::new(&units);
        let audio = audio_from(&format!(
            "this recording is brought to you by a friendly publisher please enjoy {STORY}"
        ));

        let result =
            match_anchors("ch", &units, &reference, &audio, &AlignConfig::default()).unwrap();
        let first = &result.anchors[0];
        assert_eq!(first.audio_token_index, first.reference_token_index + 12);
    }

    #[test]
    fn test_unrelated_audio_is_insufficient() {
        let units = units(STORY);
        let reference = FlatReference::new(&units);
        let audio = audio_from(
            "completely different words about cooking pasta with fresh tomatoes and basil leaves",
        );

        let err = match_anchors("ch", &units, &reference, &audio, &AlignConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AlignError::InsufficientAnchors { found: 0, required: 2, .. }
        ));
    }

    #[test]
    fn test_exact_tie_is_not_an_anchor() {
        let ref_text = "the bell rang twice";
        let units = units(ref_text);
        let reference = FlatReference::new(&units);
        let audio = audio_from("the bell rang twice and then the bell rang twice");

        let result = find_candidates(&units, &reference, &audio, &AlignConfig::default());
        assert!(result.anchors.is_empty());
        assert!(result.ambiguous_windows >= 1);
    }

    #[test]
    fn test_short_chapter_shrinks_window() {
        let config = AlignConfig::default();
        assert_eq!(effective_window_len(9, &config), 4);
        assert_eq!(effective_window_len(100, &config), 5);
        assert_eq!(effective_window_len(4, &config), 3);
    }

    #[test]
    fn test_enforce_monotonic_drops_weaker_conflict() {
        let anchors = vec![
            anchor(0, 0, 0.95),
            anchor(1, 40, 0.90), // jumps ahead
            anchor(2, 12, 0.99), // conflicts with the one before, stronger
            anchor(3, 18, 0.97),
        ];
        let (kept, dropped) = enforce_monotonic(anchors);

        assert_eq!(dropped, 1);
        let audio: Vec<usize> = kept.iter().map(|a| a.audio_token_index).collect();
        assert_eq!(audio, vec![0, 12, 18]);
    }

    #[test]
    fn test_enforce_monotonic_keeps_earlier_on_equal_strength() {
        let anchors = vec![anchor(0, 10, 0.9), anchor(1, 8, 0.9)];
        let (kept, dropped) = enforce_monotonic(anchors);

        assert_eq!(dropped, 1);
        assert_eq!(kept[0].audio_token_index, 10);
    }

    #[test]
    fn test_search_range_widens_with_radius() {
        let narrow = search_range(20, 5, (10, 10, 5), 100, 100, 10);
        let wide = search_range(20, 5, (10, 10, 5), 100, 100, 30);
        assert_eq!(narrow, (5, 30));
        assert!(wide.0 <= narrow.0 && wide.1 >= narrow.1);
    }
}
