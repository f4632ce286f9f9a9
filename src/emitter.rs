//! Corpus emitters: where finished chapters go.

use crate::error::Result;
use crate::pipeline::types::ChapterOutcome;
use crate::report::ChapterStatus;
use crate::types::AlignmentSegment;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory under the output root holding per-unit clips.
pub const CLIP_DIR: &str = "wavs";

/// Receives chapter outcomes in batch order.
pub trait CorpusEmitter: Send {
    fn emit(&mut self, outcome: &ChapterOutcome) -> Result<()>;

    /// Flushes pending output and returns what was written.
    fn finish(&mut self) -> Result<EmitSummary>;

    fn name(&self) -> &'static str {
        "emitter"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmitSummary {
    pub chapters: usize,
    pub segments_written: usize,
    pub clips_written: usize,
    pub reports_written: usize,
}

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct CollectorEmitter {
    outcomes: Vec<ChapterOutcome>,
}

impl CollectorEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> &[ChapterOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<ChapterOutcome> {
        self.outcomes
    }
}

impl CorpusEmitter for CollectorEmitter {
    fn emit(&mut self, outcome: &ChapterOutcome) -> Result<()> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<EmitSummary> {
        Ok(EmitSummary {
            chapters: self.outcomes.len(),
            segments_written: self.outcomes.iter().map(|o| o.accepted().count()).sum(),
            clips_written: 0,
            reports_written: 0,
        })
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// One corpus line in `<chapter>.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLine {
    pub id: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub clip: Option<String>,
}

/// Writes JSON-lines manifests, rejection reports and optional WAV clips.
///
/// ```text
/// <out>/<chapter>.jsonl         accepted segments
/// <out>/<chapter>.report.json   every unit's fate
/// <out>/wavs/<unit_id>.wav      clip per accepted segment
/// ```
#[derive(Debug)]
pub struct ManifestEmitter {
    dir: PathBuf,
    write_clips: bool,
    summary: EmitSummary,
}

impl ManifestEmitter {
    pub fn new(dir: impl Into<PathBuf>, write_clips: bool) -> Self {
        Self {
            dir: dir.into(),
            write_clips,
            summary: EmitSummary::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self, chapter_id: &str) -> PathBuf {
        self.dir.join(format!("{chapter_id}.jsonl"))
    }

    pub fn report_path(&self, chapter_id: &str) -> PathBuf {
        self.dir.join(format!("{chapter_id}.report.json"))
    }

    fn write_manifest(&self, outcome: &ChapterOutcome, clips: &HashSet<String>) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(self.manifest_path(&outcome.chapter_id))?);
        let mut lines = 0;
        for segment in outcome.accepted() {
            let clip = clips
                .contains(&segment.reference_unit_id)
                .then(|| format!("{CLIP_DIR}/{}.wav", segment.reference_unit_id));
            let line = ManifestLine {
                id: segment.reference_unit_id.clone(),
                text: segment.text.clone(),
                start: segment.audio_start_time,
                end: segment.audio_end_time,
                score: segment.text_audio_similarity,
                clip,
            };
            serde_json::to_writer(&mut writer, &line)?;
            writer.write_all(b"\n")?;
            lines += 1;
        }
        writer.flush()?;
        Ok(lines)
    }
}

impl CorpusEmitter for ManifestEmitter {
    fn emit(&mut self, outcome: &ChapterOutcome) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        outcome.report.write(&self.report_path(&outcome.chapter_id))?;
        self.summary.reports_written += 1;
        self.summary.chapters += 1;

        if outcome.status() != ChapterStatus::Aligned {
            return Ok(());
        }

        let mut clips = HashSet::new();
        if self.write_clips
            && let Some(wav) = &outcome.wav_path
        {
            let accepted: Vec<&AlignmentSegment> = outcome.accepted().collect();
            if let Err(e) = cut_clips(wav, &accepted, &self.dir.join(CLIP_DIR), &mut clips) {
                tracing::warn!(
                    chapter = %outcome.chapter_id,
                    wav = %wav.display(),
                    written = clips.len(),
                    "clip cutting stopped: {e}"
                );
            }
        }
        self.summary.clips_written += clips.len();
        self.summary.segments_written += self.write_manifest(outcome, &clips)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<EmitSummary> {
        Ok(self.summary)
    }

    fn name(&self) -> &'static str {
        "manifest"
    }
}

fn frame_at(seconds: f64, sample_rate: u32, round_up: bool) -> u32 {
    let frames = seconds.max(0.0) * f64::from(sample_rate);
    let frames = if round_up { frames.ceil() } else { frames.floor() };
    frames.min(f64::from(u32::MAX)) as u32
}

/// Cuts each segment's span out of `wav`, adding the IDs written to
/// `written`. On error the clips finished so far stay recorded and the
/// clip being cut is removed.
fn cut_clips(
    wav: &Path,
    segments: &[&AlignmentSegment],
    out_dir: &Path,
    written: &mut HashSet<String>,
) -> Result<()> {
    let mut reader = hound::WavReader::new(BufReader::new(File::open(wav)?))?;
    let spec = reader.spec();
    let total = reader.duration();
    fs::create_dir_all(out_dir)?;

    for segment in segments {
        let start = frame_at(segment.audio_start_time, spec.sample_rate, false).min(total);
        let end = frame_at(segment.audio_end_time, spec.sample_rate, true).min(total);
        if end <= start {
            continue;
        }

        let path = out_dir.join(format!("{}.wav", segment.reference_unit_id));
        if let Err(e) = cut_one(&mut reader, start, end, &path) {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Err(e);
        }
        written.insert(segment.reference_unit_id.clone());
    }
    Ok(())
}

fn cut_one(
    reader: &mut hound::WavReader<BufReader<File>>,
    start: u32,
    end: u32,
    path: &Path,
) -> Result<()> {
    let spec = reader.spec();
    reader.seek(start)?;
    let count = (end - start) as usize * usize::from(spec.channels);
    let mut writer = hound::WavWriter::create(path, spec)?;
    match spec.sample_format {
        hound::SampleFormat::Float => copy_samples::<f32>(reader, &mut writer, count)?,
        hound::SampleFormat::Int => copy_samples::<i32>(reader, &mut writer, count)?,
    }
    writer.finalize()?;
    Ok(())
}

fn copy_samples<S: hound::Sample>(
    reader: &mut hound::WavReader<BufReader<File>>,
    writer: &mut hound::WavWriter<BufWriter<File>>,
    count: usize,
) -> Result<()> {
    for sample in reader.samples::<S>().take(count) {
        writer.write_sample(sample?)?;
    }
    Ok(())
}
