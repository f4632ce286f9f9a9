//! Chapter discovery in a prepared corpus directory.
//!
//! A chapter is a `<stem>.txt` reference with a `<stem>.words.json` ASR dump,
//! optionally with `<stem>.wav`. Chapters of the same book share the stem
//! prefix before the first `_` (`mybook_01`, `mybook_02`).

use crate::defaults;
use crate::error::Result;
use crate::pipeline::types::ChapterJob;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const WAV_SUFFIX: &str = ".wav";

/// All chapters of one book, in part order.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub book_id: String,
    pub chapters: Vec<ChapterJob>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub books: Vec<Book>,
    /// Files that belong to no complete chapter.
    pub unpaired: Vec<PathBuf>,
}

impl Discovery {
    pub fn chapter_count(&self) -> usize {
        self.books.iter().map(|b| b.chapters.len()).sum()
    }

    /// Every chapter, numbered in book then part order.
    pub fn jobs(&self) -> Vec<ChapterJob> {
        self.books
            .iter()
            .flat_map(|b| b.chapters.iter().cloned())
            .enumerate()
            .map(|(i, mut job)| {
                job.sequence = i as u64;
                job
            })
            .collect()
    }
}

#[derive(Default)]
struct StemFiles {
    reference: Option<PathBuf>,
    transcript: Option<PathBuf>,
    wav: Option<PathBuf>,
}

/// Book ID of a chapter stem: everything before the first `_`.
pub fn book_id(stem: &str) -> &str {
    stem.split('_').next().unwrap_or(stem)
}

/// Scans `dir` (not recursively) and groups complete chapters into books.
pub fn discover_chapters(dir: &Path) -> Result<Discovery> {
    let mut stems: BTreeMap<String, StemFiles> = BTreeMap::new();
    let mut unpaired = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
            unpaired.push(path);
            continue;
        };

        if let Some(stem) = name.strip_suffix(defaults::TRANSCRIPT_SUFFIX) {
            stems.entry(stem.to_string()).or_default().transcript = Some(path);
        } else if let Some(stem) = name.strip_suffix(defaults::REFERENCE_SUFFIX) {
            stems.entry(stem.to_string()).or_default().reference = Some(path);
        } else if let Some(stem) = name.strip_suffix(WAV_SUFFIX) {
            stems.entry(stem.to_string()).or_default().wav = Some(path);
        } else {
            unpaired.push(path);
        }
    }

    let mut books: BTreeMap<String, Vec<ChapterJob>> = BTreeMap::new();
    for (stem, files) in stems {
        match files {
            StemFiles {
                reference: Some(reference),
                transcript: Some(_),
                wav,
            } => {
                let audio = dir.join(format!("{stem}{WAV_SUFFIX}"));
                let book = book_id(&stem).to_string();
                let mut job = ChapterJob::new(book.clone(), stem, reference, audio);
                job.wav_path = wav;
                books.entry(book).or_default().push(job);
            }
            StemFiles {
                reference,
                transcript,
                wav,
            } => unpaired.extend([reference, transcript, wav].into_iter().flatten()),
        }
    }

    unpaired.sort();
    for path in &unpaired {
        tracing::warn!(path = %path.display(), "file does not belong to a complete chapter");
    }

    let books: Vec<Book> = books
        .into_iter()
        .map(|(book_id, chapters)| Book { book_id, chapters })
        .collect();
    tracing::debug!(
        dir = %dir.display(),
        books = books.len(),
        unpaired = unpaired.len(),
        "discovered chapters"
    );

    Ok(Discovery { books, unpaired })
}
