//! Default configuration constants for bookalign.
//!
//! Every threshold here is a starting point, not a law: they are exposed
//! through [`AlignConfig`](crate::config::AlignConfig) and should be tuned
//! against held-out aligned/misaligned chapter pairs.

/// Minimum window similarity for a reference/audio window pair to become an anchor.
pub const ANCHOR_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Audio tokens searched on either side of the predicted position after an anchor.
pub const ANCHOR_SEARCH_RADIUS: usize = 150;

/// Tokens per anchor window. Valid range is [`ANCHOR_WINDOW_MIN`]..=[`ANCHOR_WINDOW_MAX`].
pub const ANCHOR_WINDOW_LEN: usize = 5;

pub const ANCHOR_WINDOW_MIN: usize = 3;
pub const ANCHOR_WINDOW_MAX: usize = 7;

/// A non-overlapping competitor this close to the best candidate makes the window ambiguous.
pub const ANCHOR_UNIQUENESS_MARGIN: f32 = 0.02;

/// Fewer anchors than this marks a chapter unalignable.
pub const MIN_ANCHORS: usize = 2;

/// Token similarity at or above which a diagonal DP step counts as a match.
pub const TOKEN_MATCH_THRESHOLD: f32 = 0.5;

/// DP cost of leaving a reference token without audio.
pub const SKIP_REFERENCE_COST: f32 = 1.0;

/// DP cost of leaving an audio token without reference text.
pub const SKIP_AUDIO_COST: f32 = 0.7;

/// ASR tokens below this confidence make a diagonal step more expensive.
pub const LOW_CONFIDENCE_TOKEN_FLOOR: f32 = 0.3;

/// Added to the step cost when crossing a low-confidence ASR token.
pub const LOW_CONFIDENCE_PENALTY: f32 = 0.25;

/// Largest DP matrix (reference × audio cells) solved for one window.
pub const MAX_WINDOW_CELLS: usize = 25_000_000;

/// Plausible audio/expected duration ratio, inclusive.
pub const DURATION_RATIO_MIN: f32 = 0.4;
pub const DURATION_RATIO_MAX: f32 = 2.5;

/// Narration speed used to derive expected duration from text length.
pub const EXPECTED_CHARS_PER_SECOND: f32 = 15.0;

/// Mean ASR confidence inside a span must exceed this.
pub const CONFIDENCE_FLOOR: f32 = 0.5;

/// DP residual cost of a unit must be below this.
pub const SIMILARITY_CEILING: f32 = 0.35;

/// Longest reference unit, in tokens, before the segmenter splits at clauses.
pub const MAX_UNIT_TOKENS: usize = 40;

/// Bounded job queue capacity for the batch pipeline.
pub const BATCH_QUEUE_CAPACITY: usize = 16;

/// File suffix of precomputed ASR word dumps.
pub const TRANSCRIPT_SUFFIX: &str = ".words.json";

/// File suffix of reference chapter text.
pub const REFERENCE_SUFFIX: &str = ".txt";

/// Default output directory for the corpus.
pub const OUTPUT_DIR: &str = "corpus";

/// Number of alignment workers to run when the config says "auto" (0).
pub fn worker_count(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_len_default_is_in_range() {
        assert!((ANCHOR_WINDOW_MIN..=ANCHOR_WINDOW_MAX).contains(&ANCHOR_WINDOW_LEN));
    }

    #[test]
    fn worker_count_respects_explicit_value() {
        assert_eq!(worker_count(3), 3);
    }

    #[test]
    fn worker_count_auto_is_positive() {
        assert!(worker_count(0) >= 1);
    }
}
