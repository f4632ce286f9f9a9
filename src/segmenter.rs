//! Reference text segmentation into alignable units.

use crate::defaults;
use crate::error::{AlignError, Result};
use crate::text::tokenize_reference;
use crate::types::ReferenceUnit;

/// Splits normalized chapter text into ordered reference units.
///
/// Implementations must assign stable IDs and strictly increasing ordinals.
pub trait ReferenceSegmenter: Send + Sync {
    fn segment(&self, chapter_id: &str, text: &str) -> Result<Vec<ReferenceUnit>>;
}

/// Sentence splitter with a clause fallback for overlong sentences.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    max_unit_tokens: usize,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new(defaults::MAX_UNIT_TOKENS)
    }
}

impl SentenceSegmenter {
    pub fn new(max_unit_tokens: usize) -> Self {
        Self {
            max_unit_tokens: max_unit_tokens.max(1),
        }
    }

    /// Unit ID format shared with the emitter's clip names.
    pub fn unit_id(chapter_id: &str, ordinal: usize) -> String {
        format!("{chapter_id}-{ordinal:05}")
    }

    fn sentences(text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        for paragraph in text.split("\n\n") {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            let mut current: Vec<&str> = Vec::new();
            for word in words {
                current.push(word);
                if ends_sentence(word) {
                    sentences.push(current.join(" "));
                    current.clear();
                }
            }
            if !current.is_empty() {
                sentences.push(current.join(" "));
            }
        }
        sentences
    }

    /// Splits at clause punctuation, then greedily re-merges clauses up to the limit.
    fn split_long(&self, sentence: &str) -> Vec<String> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if tokenize_reference(sentence).len() <= self.max_unit_tokens {
            return vec![sentence.to_string()];
        }

        let mut clauses: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for word in words {
            current.push(word);
            if ends_clause(word) || current.len() >= self.max_unit_tokens {
                clauses.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            clauses.push(current);
        }

        let mut units: Vec<Vec<&str>> = Vec::new();
        for clause in clauses {
            match units.last_mut() {
                Some(last) if last.len() + clause.len() <= self.max_unit_tokens => {
                    last.extend(clause);
                }
                _ => units.push(clause),
            }
        }
        units.into_iter().map(|u| u.join(" ")).collect()
    }
}

impl ReferenceSegmenter for SentenceSegmenter {
    fn segment(&self, chapter_id: &str, text: &str) -> Result<Vec<ReferenceUnit>> {
        let mut units = Vec::new();
        for sentence in Self::sentences(text) {
            for piece in self.split_long(&sentence) {
                let ordinal = units.len();
                let unit = ReferenceUnit::from_text(Self::unit_id(chapter_id, ordinal), ordinal, &piece);
                if !unit.tokens.is_empty() {
                    units.push(unit);
                }
            }
        }

        if units.is_empty() {
            return Err(AlignError::InvalidReference {
                message: format!("chapter {chapter_id} has no alignable text"),
            });
        }
        Ok(units)
    }
}

const CLOSERS: &[char] = &['"', '\'', ')', ']', '»', '”', '’'];

fn ends_sentence(word: &str) -> bool {
    let trimmed = word.trim_end_matches(CLOSERS);
    trimmed.ends_with(['.', '!', '?', '…'])
}

fn ends_clause(word: &str) -> bool {
    let trimmed = word.trim_end_matches(CLOSERS);
    trimmed.ends_with([',', ';', ':'])
}
