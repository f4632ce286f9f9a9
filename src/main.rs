use anyhow::{Context, Result};
use bookalign::cli::{Cli, Commands, ConfigAction};
use bookalign::config::{BatchConfig, Config};
use bookalign::emitter::{CorpusEmitter, EmitSummary, ManifestEmitter};
use bookalign::pipeline::{BatchAligner, BatchSummary, ChapterJob, ChapterOutcome, discover_chapters};
use bookalign::segmenter::{ReferenceSegmenter, SentenceSegmenter};
use bookalign::transcript::{JsonTranscriptLoader, load_transcript};
use bookalign::{AlignmentRun, CancellationToken};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    tracing::debug!(version = %bookalign::version_string(), "starting");

    match cli.command {
        Commands::Align {
            reference,
            transcript,
            audio,
            chapter,
            output,
            no_clips,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let args = AlignArgs {
                reference,
                transcript,
                audio,
                chapter,
                output,
                no_clips,
                json,
            };
            run_align(&config, args, cli.quiet)?;
        }
        Commands::Batch {
            dir,
            output,
            workers,
            no_clips,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_batch(&config, &dir, output, workers, no_clips, cli.quiet)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "bookalign",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "bookalign=info",
        (false, _) => "bookalign=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from custom path or default location, then apply env overrides.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}

struct AlignArgs {
    reference: PathBuf,
    transcript: Option<PathBuf>,
    audio: Option<PathBuf>,
    chapter: Option<String>,
    output: Option<PathBuf>,
    no_clips: bool,
    json: bool,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chapter".to_string())
}

fn run_align(config: &Config, args: AlignArgs, quiet: bool) -> Result<()> {
    let started = Instant::now();
    let chapter_id = args.chapter.unwrap_or_else(|| file_stem(&args.reference));
    let transcript_path = args
        .transcript
        .unwrap_or_else(|| JsonTranscriptLoader::transcript_path(&args.reference));

    let text = std::fs::read_to_string(&args.reference)
        .with_context(|| format!("reading {}", args.reference.display()))?;
    let units = SentenceSegmenter::new(config.segmenter.max_unit_tokens).segment(&chapter_id, &text)?;
    let tokens = load_transcript(&transcript_path)
        .with_context(|| format!("loading transcript {}", transcript_path.display()))?;

    let run = AlignmentRun::new(chapter_id.clone(), units, tokens, &config.align);
    let bar = if quiet || args.json {
        ProgressBar::hidden()
    } else {
        window_bar()
    };
    let progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };

    let (segments, report) = match run.execute_to_report(&CancellationToken::new(), &progress) {
        Ok(settled) => settled,
        Err(e) => {
            bar.abandon();
            return Err(e.into());
        }
    };
    bar.finish_and_clear();

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    let outcome = ChapterOutcome {
        sequence: 0,
        book_id: bookalign::pipeline::discovery::book_id(&chapter_id).to_string(),
        chapter_id: chapter_id.clone(),
        wav_path: args.audio,
        segments,
        report,
        elapsed: started.elapsed(),
    };

    let out_dir = args.output.unwrap_or_else(|| config.output.dir.clone());
    let mut emitter = ManifestEmitter::new(&out_dir, config.output.write_clips && !args.no_clips);
    emitter.emit(&outcome)?;
    let emitted = emitter.finish()?;

    if !quiet {
        print_chapter_summary(&outcome, &emitted, &out_dir);
    }
    if outcome.report.totals.never_reached > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn window_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        // SAFETY: hardcoded template string, always valid
        #[allow(clippy::expect_used)]
        ProgressStyle::default_bar()
            .template("{spinner:.green} aligning [{bar:40.cyan/blue}] {pos}/{len} windows")
            .expect("hardcoded progress bar template")
            .progress_chars("#>-"),
    );
    bar
}

fn chapter_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        // SAFETY: hardcoded template string, always valid
        #[allow(clippy::expect_used)]
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chapters ({eta}) {msg}")
            .expect("hardcoded progress bar template")
            .progress_chars("#>-"),
    );
    bar
}

fn print_chapter_summary(outcome: &ChapterOutcome, emitted: &EmitSummary, out_dir: &Path) {
    let totals = &outcome.report.totals;
    if totals.never_reached > 0 {
        eprintln!(
            "{} {} is unalignable ({} anchors), report written to {}",
            "✗".red(),
            outcome.chapter_id,
            outcome.report.anchor_count,
            out_dir.display()
        );
        return;
    }

    println!(
        "{} {}: {} accepted, {} rejected, {} ambiguous of {} units ({:.1}s)",
        "✓".green(),
        outcome.chapter_id,
        totals.accepted.green(),
        totals.rejected.red(),
        totals.ambiguous.yellow(),
        totals.units,
        outcome.elapsed.as_secs_f64()
    );
    for (reason, count) in &outcome.report.reason_counts {
        println!("    {reason}: {count}");
    }
    println!(
        "  wrote {} segments and {} clips to {}",
        emitted.segments_written,
        emitted.clips_written,
        out_dir.display()
    );
}

/// Advances a chapter bar as outcomes reach the real emitter.
struct ProgressEmitter<E> {
    inner: E,
    bar: ProgressBar,
}

impl<E: CorpusEmitter> CorpusEmitter for ProgressEmitter<E> {
    fn emit(&mut self, outcome: &ChapterOutcome) -> bookalign::Result<()> {
        self.inner.emit(outcome)?;
        self.bar.set_message(outcome.chapter_id.clone());
        self.bar.inc(1);
        Ok(())
    }

    fn finish(&mut self) -> bookalign::Result<EmitSummary> {
        self.bar.finish_and_clear();
        self.inner.finish()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

fn run_batch(
    config: &Config,
    dir: &Path,
    output: Option<PathBuf>,
    workers: Option<usize>,
    no_clips: bool,
    quiet: bool,
) -> Result<()> {
    let discovery = discover_chapters(dir).with_context(|| format!("scanning {}", dir.display()))?;
    if discovery.chapter_count() == 0 {
        anyhow::bail!("no chapters found in {}", dir.display());
    }
    let jobs: Vec<ChapterJob> = discovery.jobs();

    let batch = BatchConfig {
        workers: workers.unwrap_or(config.batch.workers),
        ..config.batch.clone()
    };
    let aligner = BatchAligner::new(
        Arc::new(JsonTranscriptLoader::new()),
        Arc::new(SentenceSegmenter::new(config.segmenter.max_unit_tokens)),
        config.align.clone(),
        batch,
    );

    let out_dir = output.unwrap_or_else(|| config.output.dir.clone());
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        chapter_bar(jobs.len())
    };
    let mut emitter = ProgressEmitter {
        inner: ManifestEmitter::new(&out_dir, config.output.write_clips && !no_clips),
        bar,
    };

    let summary = aligner.run(jobs, &mut emitter)?;
    if !quiet {
        print_batch_summary(&summary, discovery.unpaired.len(), &out_dir);
    }
    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_batch_summary(summary: &BatchSummary, unpaired: usize, out_dir: &Path) {
    println!(
        "{} {} chapters from {} books in {:.1}s",
        "✓".green(),
        summary.chapters,
        summary.books,
        summary.elapsed.as_secs_f64()
    );
    println!(
        "  chapters: {} aligned, {} unalignable, {} cancelled, {} failed",
        summary.aligned.green(),
        summary.unalignable.yellow(),
        summary.cancelled,
        summary.failed.red()
    );
    println!(
        "  segments: {} accepted, {} rejected, {} ambiguous",
        summary.accepted.green(),
        summary.rejected.red(),
        summary.ambiguous.yellow()
    );
    println!(
        "  wrote {} segments, {} clips, {} reports to {}",
        summary.emitted.segments_written,
        summary.emitted.clips_written,
        summary.emitted.reports_written,
        out_dir.display()
    );
    if unpaired > 0 {
        println!(
            "  {} {} unpaired file(s) skipped (see warnings)",
            "!".yellow(),
            unpaired
        );
    }
}
