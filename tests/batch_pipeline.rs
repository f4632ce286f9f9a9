//! Integration tests for corpus discovery, batch alignment and manifest output.

use bookalign::config::{AlignConfig, BatchConfig};
use bookalign::emitter::{CLIP_DIR, ManifestEmitter, ManifestLine};
use bookalign::pipeline::{BatchAligner, discover_chapters};
use bookalign::report::{ChapterStatus, RejectionReport};
use bookalign::segmenter::SentenceSegmenter;
use bookalign::transcript::JsonTranscriptLoader;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const WORD_SECS: f64 = 0.35;
const SAMPLE_RATE: u32 = 8000;

const STORY: [&str; 6] = [
    "The old lighthouse keeper climbed the stairs every single evening.",
    "He lit the great lamp and watched the ships pass.",
    "Night fell quickly over everything.",
    "His daughter kept careful notes on passing vessels.",
    "One winter a strange schooner anchored in the bay.",
    "Nobody came ashore for three long days.",
];

fn words(sentences: &[&str]) -> Vec<serde_json::Value> {
    sentences
        .iter()
        .flat_map(|s| s.split_whitespace())
        .enumerate()
        .map(|(i, w)| {
            json!({
                "word": w,
                "start": i as f64 * WORD_SECS,
                "end": (i + 1) as f64 * WORD_SECS,
                "probability": 0.95,
            })
        })
        .collect()
}

fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..SAMPLE_RATE * seconds {
        writer.write_sample((i % 200) as i16 - 100).unwrap();
    }
    writer.finalize().unwrap();
}

/// Three chapters of two books: a clean one with audio, one with an
/// omitted sentence (segmented dump shape), and one whose transcript
/// belongs to something else entirely.
fn corpus(dir: &Path) {
    let text = STORY.join(" ");

    fs::write(dir.join("harbor_01.txt"), &text).unwrap();
    fs::write(
        dir.join("harbor_01.words.json"),
        serde_json::to_string(&words(&STORY)).unwrap(),
    )
    .unwrap();
    write_wav(&dir.join("harbor_01.wav"), 18);

    let mut omitted = STORY.to_vec();
    omitted.remove(3);
    fs::write(dir.join("harbor_02.txt"), &text).unwrap();
    fs::write(
        dir.join("harbor_02.words.json"),
        json!({ "segments": [{ "words": words(&omitted) }] }).to_string(),
    )
    .unwrap();

    fs::write(dir.join("quiet_01.txt"), &text).unwrap();
    fs::write(
        dir.join("quiet_01.words.json"),
        serde_json::to_string(&words(&[
            "Quartz zebras juggle violet marmalade beneath humming copper kites",
        ]))
        .unwrap(),
    )
    .unwrap();

    fs::write(dir.join("README.md"), "notes").unwrap();
}

fn aligner(workers: usize) -> BatchAligner {
    BatchAligner::new(
        Arc::new(JsonTranscriptLoader::new()),
        Arc::new(SentenceSegmenter::default()),
        AlignConfig::default(),
        BatchConfig {
            workers,
            ..BatchConfig::default()
        },
    )
}

fn read_manifest(path: &Path) -> Vec<ManifestLine> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_discovery_pairs_chapters_and_reports_strays() {
    let input = TempDir::new().unwrap();
    corpus(input.path());

    let found = discover_chapters(input.path()).unwrap();
    assert_eq!(found.books.len(), 2);
    assert_eq!(found.chapter_count(), 3);
    assert_eq!(found.unpaired, vec![input.path().join("README.md")]);

    let jobs = found.jobs();
    let ids: Vec<&str> = jobs.iter().map(|j| j.chapter_id.as_str()).collect();
    assert_eq!(ids, vec!["harbor_01", "harbor_02", "quiet_01"]);
    assert!(jobs[0].wav_path.is_some());
    assert!(jobs[1].wav_path.is_none());
}

#[test]
fn test_batch_writes_manifests_reports_and_clips() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    corpus(input.path());

    let jobs = discover_chapters(input.path()).unwrap().jobs();
    let mut emitter = ManifestEmitter::new(output.path(), true);
    let summary = aligner(2).run(jobs, &mut emitter).unwrap();

    assert_eq!(summary.books, 2);
    assert_eq!(summary.chapters, 3);
    assert_eq!(summary.aligned, 2);
    assert_eq!(summary.unalignable, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.accepted, 11);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.emitted.reports_written, 3);
    assert_eq!(summary.emitted.segments_written, 11);
    assert_eq!(summary.emitted.clips_written, 6);

    // Clean chapter with audio: every line has a clip of the right length.
    let lines = read_manifest(&emitter.manifest_path("harbor_01"));
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0].id, "harbor_01-00000");
    for line in &lines {
        let clip = line.clip.as_deref().unwrap();
        assert!(clip.starts_with(CLIP_DIR));
        let reader = hound::WavReader::open(output.path().join(clip)).unwrap();
        let seconds = f64::from(reader.duration()) / f64::from(SAMPLE_RATE);
        assert!((seconds - (line.end - line.start)).abs() < 0.01, "{}", line.id);
    }
    for pair in lines.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }

    // Omitted sentence: five lines, no clips, and a report naming the gap.
    let lines = read_manifest(&emitter.manifest_path("harbor_02"));
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|l| l.clip.is_none()));
    assert!(lines.iter().all(|l| l.id != "harbor_02-00003"));
    let report: RejectionReport =
        serde_json::from_str(&fs::read_to_string(emitter.report_path("harbor_02")).unwrap())
            .unwrap();
    assert_eq!(report.status, ChapterStatus::Aligned);
    assert_eq!(report.reason_counts.get("no_audio_match"), Some(&1));

    // Unalignable chapter: a report only.
    assert!(!emitter.manifest_path("quiet_01").exists());
    let report: RejectionReport =
        serde_json::from_str(&fs::read_to_string(emitter.report_path("quiet_01")).unwrap())
            .unwrap();
    assert_eq!(report.status, ChapterStatus::Unalignable);
    assert_eq!(report.totals.never_reached, STORY.len());
    assert!(report.is_complete());
}

#[test]
fn test_batch_output_is_independent_of_worker_count() {
    let input = TempDir::new().unwrap();
    corpus(input.path());

    let mut manifests = Vec::new();
    for workers in [1, 3] {
        let output = TempDir::new().unwrap();
        let jobs = discover_chapters(input.path()).unwrap().jobs();
        let mut emitter = ManifestEmitter::new(output.path(), false);
        aligner(workers).run(jobs, &mut emitter).unwrap();

        let harbor = fs::read_to_string(emitter.manifest_path("harbor_01")).unwrap();
        let report = fs::read_to_string(emitter.report_path("harbor_02")).unwrap();
        manifests.push((harbor, report));
    }
    assert_eq!(manifests[0], manifests[1]);
}

#[test]
fn test_missing_transcript_counts_as_failed() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    corpus(input.path());

    let jobs = discover_chapters(input.path()).unwrap().jobs();
    fs::remove_file(input.path().join("harbor_02.words.json")).unwrap();

    let mut emitter = ManifestEmitter::new(output.path(), false);
    let summary = aligner(2).run(jobs, &mut emitter).unwrap();

    assert_eq!(summary.chapters, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.aligned, 1);
    assert_eq!(summary.unalignable, 1);
    assert!(!emitter.report_path("harbor_02").exists());
}
