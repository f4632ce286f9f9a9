//! Token normalization and lexical similarity.
//!
//! Similarity is computed over normalized forms: lowercase, diacritics
//! stripped, punctuation removed. All scores are in [0, 1].

use crate::types::Token;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalizes a single word for comparison.
///
/// `đ` has no decomposition, so it is folded to `d` explicitly.
pub fn normalize_token(word: &str) -> String {
    word.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'đ' { 'd' } else { c })
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Splits reference text into tokens, dropping pure punctuation.
pub fn tokenize_reference(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(Token::reference)
        .filter(|t| !t.normalized.is_empty())
        .collect()
}

/// Similarity of two normalized words.
pub fn token_similarity(a: &Token, b: &Token) -> f32 {
    normalized_similarity(&a.normalized, &b.normalized)
}

/// `1 - token_similarity`.
pub fn lexical_distance(a: &Token, b: &Token) -> f32 {
    1.0 - token_similarity(a, b)
}

/// Similarity of two token windows, compared as space-joined normalized text.
pub fn window_similarity(a: &[Token], b: &[Token]) -> f32 {
    normalized_similarity(&joined(a), &joined(b))
}

/// Space-joined normalized text of a token slice.
pub fn joined(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.normalized);
    }
    out
}

/// Normalized Levenshtein similarity of two already-normalized strings.
pub fn normalized_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b) as f32
}
