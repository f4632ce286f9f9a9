//! Audio-text alignment engine.
//!
//! ```text
//! reference units ─┐
//!                  ├─▶ anchor ─▶ anchors ─▶ solver ─▶ candidate spans ─▶ scorer ─▶ segments
//! audio tokens ────┘
//! ```
//!
//! Each stage is a plain function over owned inputs; [`run::AlignmentRun`]
//! sequences them for one chapter.

pub mod anchor;
pub mod run;
pub mod scorer;
pub mod solver;

pub use anchor::{AnchorMatch, enforce_monotonic, match_anchors};
pub use run::{AlignmentRun, CancellationToken, NoProgress, ProgressObserver, RunOutput};
pub use scorer::score_segments;
pub use solver::{CandidateSpan, Solution, Step, solve};

use crate::types::{ReferenceUnit, Token};

/// The reference units of a chapter flattened into one token stream.
#[derive(Debug, Clone)]
pub struct FlatReference {
    pub tokens: Vec<Token>,
    /// Unit index (into the unit slice) of every token.
    pub unit_of: Vec<usize>,
    /// Half-open token range of every unit.
    pub unit_ranges: Vec<(usize, usize)>,
}

impl FlatReference {
    pub fn new(units: &[ReferenceUnit]) -> Self {
        let total = units.iter().map(|u| u.tokens.len()).sum();
        let mut tokens = Vec::with_capacity(total);
        let mut unit_of = Vec::with_capacity(total);
        let mut unit_ranges = Vec::with_capacity(units.len());

        for (index, unit) in units.iter().enumerate() {
            let start = tokens.len();
            tokens.extend(unit.tokens.iter().cloned());
            unit_of.extend(std::iter::repeat_n(index, unit.tokens.len()));
            unit_ranges.push((start, tokens.len()));
        }

        Self {
            tokens,
            unit_of,
            unit_ranges,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_reference_tracks_units() {
        let units = vec![
            ReferenceUnit::from_text("a", 0, "Chapter One."),
            ReferenceUnit::from_text("b", 1, "..."),
            ReferenceUnit::from_text("c", 2, "It was dark."),
        ];
        let flat = FlatReference::new(&units);

        assert_eq!(flat.len(), 5);
        assert_eq!(flat.unit_of, vec![0, 0, 2, 2, 2]);
        assert_eq!(flat.unit_ranges, vec![(0, 2), (2, 2), (2, 5)]);
    }
}
