//! Command-line interface for bookalign
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Audiobook-to-text alignment for TTS corpora
#[derive(Parser, Debug)]
#[command(
    name = "bookalign",
    version,
    about = "Audiobook-to-text alignment for TTS corpora"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress bars and summaries
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-chapter logs, -vv: per-stage diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align one chapter's reference text against its ASR transcript
    Align {
        /// Reference text file (one chapter)
        reference: PathBuf,

        /// ASR word dump (default: <reference stem>.words.json)
        #[arg(long, short = 't', value_name = "FILE")]
        transcript: Option<PathBuf>,

        /// Chapter audio to cut clips from (WAV)
        #[arg(long, short = 'a', value_name = "FILE")]
        audio: Option<PathBuf>,

        /// Chapter ID used for unit IDs and output names (default: reference stem)
        #[arg(long, value_name = "ID")]
        chapter: Option<String>,

        /// Output directory (default: output.dir from config)
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<PathBuf>,

        /// Do not cut WAV clips
        #[arg(long)]
        no_clips: bool,

        /// Print the rejection report as JSON instead of writing a corpus
        #[arg(long)]
        json: bool,
    },

    /// Align every chapter found in a corpus directory
    Batch {
        /// Directory with <stem>.txt, <stem>.words.json and optional <stem>.wav files
        dir: PathBuf,

        /// Output directory (default: output.dir from config)
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<PathBuf>,

        /// Worker threads (default: batch.workers from config, 0 = one per core)
        #[arg(long, short = 'w', value_name = "N")]
        workers: Option<usize>,

        /// Do not cut WAV clips
        #[arg(long)]
        no_clips: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment overrides) as TOML
    Show,
    /// Print the configuration file path
    Path,
}
