//! Data model shared by every alignment stage.
//!
//! Each stage consumes and produces plain owned values: reference units and
//! audio tokens go in, anchors and segments come out. Nothing here is shared
//! between runs.

use serde::{Deserialize, Serialize};

/// Which stream a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Reference,
    Audio,
}

/// A word from either the reference text or the ASR transcript.
///
/// Reference tokens only carry sequence order: their times are zero and their
/// confidence is 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub normalized: String,
    /// Seconds from the start of the chapter audio.
    pub start_time: f64,
    pub end_time: f64,
    /// ASR confidence in [0, 1].
    pub confidence: f32,
    pub source: TokenSource,
}

impl Token {
    /// Creates a reference token, normalizing its text.
    pub fn reference(text: &str) -> Self {
        Self {
            text: text.to_string(),
            normalized: crate::text::normalize_token(text),
            start_time: 0.0,
            end_time: 0.0,
            confidence: 1.0,
            source: TokenSource::Reference,
        }
    }

    /// Creates a timed audio token, normalizing its text.
    pub fn audio(text: &str, start_time: f64, end_time: f64, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            normalized: crate::text::normalize_token(text),
            start_time,
            end_time,
            confidence,
            source: TokenSource::Audio,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A sentence or clause of the reference text, aligned independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceUnit {
    pub id: String,
    /// Position in the book, strictly increasing within a chapter.
    pub ordinal: usize,
    pub text: String,
    pub tokens: Vec<Token>,
}

impl ReferenceUnit {
    /// Builds a unit from raw text, tokenizing and normalizing it.
    pub fn from_text(id: impl Into<String>, ordinal: usize, text: &str) -> Self {
        Self {
            id: id.into(),
            ordinal,
            text: text.trim().to_string(),
            tokens: crate::text::tokenize_reference(text),
        }
    }

    /// Characters of normalized text, used to estimate spoken duration.
    pub fn normalized_char_count(&self) -> usize {
        self.tokens.iter().map(|t| t.normalized.chars().count()).sum()
    }
}

/// A locally unique, high-similarity correspondence used as a hard waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub reference_unit_id: String,
    pub reference_ordinal: usize,
    /// Index of the first window token in the flattened reference stream.
    pub reference_token_index: usize,
    /// Index of the first window token in the audio token stream.
    pub audio_token_index: usize,
    /// Window length in tokens, identical on both sides.
    pub length: usize,
    pub similarity_score: f32,
}

impl Anchor {
    pub fn reference_end(&self) -> usize {
        self.reference_token_index + self.length
    }

    pub fn audio_end(&self) -> usize {
        self.audio_token_index + self.length
    }
}

/// Terminal decision for one reference unit in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
    Ambiguous,
}

/// Why a segment was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// No audio token inside the unit's window matched its text.
    NoAudioMatch,
    /// Mean ASR confidence over the span is below the floor.
    LowConfidence,
    /// Span duration is implausible for the text length.
    DurationImplausible,
    /// DP residual cost is above the ceiling.
    SimilarityTooLow,
    /// Span overlaps a better segment of the same run.
    Overlap,
    /// The narrator re-read this unit; the other reading was left unaligned.
    RepeatedNarration,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NoAudioMatch => "no_audio_match",
            RejectionReason::LowConfidence => "low_confidence",
            RejectionReason::DurationImplausible => "duration_implausible",
            RejectionReason::SimilarityTooLow => "similarity_too_low",
            RejectionReason::Overlap => "overlap",
            RejectionReason::RepeatedNarration => "repeated_narration",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scored alignment of one reference unit.
///
/// Produced once per unit per run and never patched afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSegment {
    pub reference_unit_id: String,
    pub ordinal: usize,
    pub text: String,
    pub audio_start_time: f64,
    pub audio_end_time: f64,
    /// First and last matched audio token, inclusive. `None` for an empty span.
    pub audio_token_range: Option<(usize, usize)>,
    pub text_audio_similarity: f32,
    pub residual_cost: f32,
    pub duration_ratio: f32,
    pub mean_confidence: f32,
    pub decision: Decision,
    /// Every failed check, in evaluation order. Empty when accepted.
    pub reasons: Vec<RejectionReason>,
}

impl AlignmentSegment {
    pub fn duration(&self) -> f64 {
        self.audio_end_time - self.audio_start_time
    }

    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accepted
    }

    /// True when both spans are non-empty and share some time.
    pub fn overlaps(&self, other: &AlignmentSegment) -> bool {
        self.audio_token_range.is_some()
            && other.audio_token_range.is_some()
            && self.audio_start_time < other.audio_end_time
            && other.audio_start_time < self.audio_end_time
    }
}
