//! Per-chapter rejection report: the fate of every reference unit.

use crate::error::Result;
use crate::types::{AlignmentSegment, Decision, ReferenceUnit, RejectionReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// How far a chapter got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    Aligned,
    Unalignable,
    Cancelled,
}

/// Terminal outcome of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fate", rename_all = "snake_case")]
pub enum UnitFate {
    Accepted,
    Rejected { reasons: Vec<RejectionReason> },
    Ambiguous { reasons: Vec<RejectionReason> },
    /// The run stopped before the unit was scored.
    NeverReached { cause: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub unit_id: String,
    pub ordinal: usize,
    #[serde(flatten)]
    pub fate: UnitFate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audio_start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audio_end_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text_audio_similarity: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub units: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub ambiguous: usize,
    pub never_reached: usize,
}

/// Full accounting of one chapter, written next to its corpus lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionReport {
    pub chapter_id: String,
    pub status: ChapterStatus,
    pub anchor_count: usize,
    pub totals: ReportTotals,
    /// Occurrences of each reason across rejected and ambiguous units.
    pub reason_counts: BTreeMap<String, usize>,
    pub units: Vec<UnitOutcome>,
}

impl RejectionReport {
    /// Report for a chapter that ran to completion.
    pub fn from_segments(chapter_id: &str, anchor_count: usize, segments: &[AlignmentSegment]) -> Self {
        let mut totals = ReportTotals {
            units: segments.len(),
            ..ReportTotals::default()
        };
        let mut reason_counts = BTreeMap::new();

        let units = segments
            .iter()
            .map(|segment| {
                let fate = match segment.decision {
                    Decision::Accepted => {
                        totals.accepted += 1;
                        UnitFate::Accepted
                    }
                    Decision::Rejected => {
                        totals.rejected += 1;
                        UnitFate::Rejected {
                            reasons: segment.reasons.clone(),
                        }
                    }
                    Decision::Ambiguous => {
                        totals.ambiguous += 1;
                        UnitFate::Ambiguous {
                            reasons: segment.reasons.clone(),
                        }
                    }
                };
                for reason in &segment.reasons {
                    *reason_counts.entry(reason.as_str().to_string()).or_insert(0) += 1;
                }
                UnitOutcome {
                    unit_id: segment.reference_unit_id.clone(),
                    ordinal: segment.ordinal,
                    fate,
                    audio_start_time: Some(segment.audio_start_time),
                    audio_end_time: Some(segment.audio_end_time),
                    text_audio_similarity: Some(segment.text_audio_similarity),
                }
            })
            .collect();

        Self {
            chapter_id: chapter_id.to_string(),
            status: ChapterStatus::Aligned,
            anchor_count,
            totals,
            reason_counts,
            units,
        }
    }

    /// Report for a chapter whose run stopped early. Every unit is never reached.
    pub fn stopped(
        chapter_id: &str,
        status: ChapterStatus,
        anchor_count: usize,
        units: &[ReferenceUnit],
        cause: &str,
    ) -> Self {
        let outcomes = units
            .iter()
            .map(|unit| UnitOutcome {
                unit_id: unit.id.clone(),
                ordinal: unit.ordinal,
                fate: UnitFate::NeverReached {
                    cause: cause.to_string(),
                },
                audio_start_time: None,
                audio_end_time: None,
                text_audio_similarity: None,
            })
            .collect();

        Self {
            chapter_id: chapter_id.to_string(),
            status,
            anchor_count,
            totals: ReportTotals {
                units: units.len(),
                never_reached: units.len(),
                ..ReportTotals::default()
            },
            reason_counts: BTreeMap::new(),
            units: outcomes,
        }
    }

    pub fn unalignable(chapter_id: &str, anchor_count: usize, units: &[ReferenceUnit], cause: &str) -> Self {
        Self::stopped(chapter_id, ChapterStatus::Unalignable, anchor_count, units, cause)
    }

    pub fn cancelled(chapter_id: &str, units: &[ReferenceUnit]) -> Self {
        Self::stopped(chapter_id, ChapterStatus::Cancelled, 0, units, "run cancelled")
    }

    /// True when every unit has exactly one outcome and the totals agree.
    pub fn is_complete(&self) -> bool {
        let t = &self.totals;
        t.units == self.units.len()
            && t.accepted + t.rejected + t.ambiguous + t.never_reached == t.units
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, decision: Decision, reasons: Vec<RejectionReason>) -> AlignmentSegment {
        AlignmentSegment {
            reference_unit_id: id.to_string(),
            ordinal: 0,
            text: String::new(),
            audio_start_time: 1.0,
            audio_end_time: 2.0,
            audio_token_range: Some((0, 3)),
            text_audio_similarity: 0.9,
            residual_cost: 0.1,
            duration_ratio: 1.0,
            mean_confidence: 0.9,
            decision,
            reasons,
        }
    }

    #[test]
    fn test_report_counts_every_unit() {
        let segments = vec![
            segment("a", Decision::Accepted, vec![]),
            segment(
                "b",
                Decision::Rejected,
                vec![RejectionReason::LowConfidence, RejectionReason::SimilarityTooLow],
            ),
            segment("c", Decision::Rejected, vec![RejectionReason::LowConfidence]),
            segment("d", Decision::Ambiguous, vec![RejectionReason::RepeatedNarration]),
        ];
        let report = RejectionReport::from_segments("ch", 3, &segments);

        assert_eq!(report.status, ChapterStatus::Aligned);
        assert_eq!(report.totals.accepted, 1);
        assert_eq!(report.totals.rejected, 2);
        assert_eq!(report.totals.ambiguous, 1);
        assert_eq!(report.reason_counts["low_confidence"], 2);
        assert_eq!(report.reason_counts["repeated_narration"], 1);
        assert!(report.is_complete());
    }

    #[test]
    fn test_unalignable_report_marks_all_never_reached() {
        let units = vec![
            ReferenceUnit::from_text("ch-00000", 0, "One."),
            ReferenceUnit::from_text("ch-00001", 1, "Two."),
        ];
        let report = RejectionReport::unalignable("ch", 1, &units, "found 1 anchor(s)");

        assert_eq!(report.status, ChapterStatus::Unalignable);
        assert_eq!(report.totals.never_reached, 2);
        assert!(report.is_complete());
        assert!(matches!(report.units[1].fate, UnitFate::NeverReached { .. }));
    }

    #[test]
    fn test_report_json_shape() {
        let segments = vec![segment(
            "b",
            Decision::Rejected,
            vec![RejectionReason::NoAudioMatch],
        )];
        let report = RejectionReport::from_segments("ch", 2, &segments);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "aligned");
        assert_eq!(json["units"][0]["fate"], "rejected");
        assert_eq!(json["units"][0]["reasons"][0], "no_audio_match");
        assert_eq!(json["totals"]["rejected"], 1);

        let back: RejectionReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_cancelled_report_omits_timing() {
        let units = vec![ReferenceUnit::from_text("ch-00000", 0, "One.")];
        let json = RejectionReport::cancelled("ch", &units).to_json().unwrap();

        assert!(json.contains("\"never_reached\""));
        assert!(json.contains("run cancelled"));
        assert!(!json.contains("audio_start_time"));
    }
}
