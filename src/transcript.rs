use crate::defaults;
use crate::error::{AlignError, Result};
use crate::types::Token;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of time-stamped ASR tokens for a chapter's audio.
///
/// The aligner never runs recognition itself; the pipeline resolves this
/// before a run starts and hands over the finished token list.
pub trait Transcriber: Send + Sync {
    /// Produce the ordered, timed token sequence for an audio file.
    fn transcribe(&self, audio: &Path) -> Result<Vec<Token>>;

    /// Name of the backend for logging.
    fn name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across workers.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &Path) -> Result<Vec<Token>> {
        (**self).transcribe(audio)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Deserialize)]
struct WordEntry {
    #[serde(alias = "text")]
    word: String,
    start: f64,
    end: f64,
    #[serde(default = "full_confidence", alias = "confidence")]
    probability: f32,
}

#[derive(Debug, Deserialize)]
struct SegmentEntry {
    #[serde(default)]
    words: Vec<WordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptDump {
    Words(Vec<WordEntry>),
    Segments { segments: Vec<SegmentEntry> },
}

fn full_confidence() -> f32 {
    1.0
}

/// Reads precomputed ASR word dumps stored next to the audio.
///
/// `book_01.wav` is transcribed by `book_01.words.json`.
#[derive(Debug, Clone, Default)]
pub struct JsonTranscriptLoader;

impl JsonTranscriptLoader {
    pub fn new() -> Self {
        Self
    }

    /// Path of the word dump that belongs to an audio file.
    pub fn transcript_path(audio: &Path) -> PathBuf {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        audio.with_file_name(format!("{stem}{}", defaults::TRANSCRIPT_SUFFIX))
    }
}

impl Transcriber for JsonTranscriptLoader {
    fn transcribe(&self, audio: &Path) -> Result<Vec<Token>> {
        load_transcript(&Self::transcript_path(audio))
    }

    fn name(&self) -> &str {
        "json-words"
    }
}

/// Loads and validates a word dump from disk.
pub fn load_transcript(path: &Path) -> Result<Vec<Token>> {
    let contents = fs::read_to_string(path)?;
    parse_transcript(&contents)
}

/// Parses a word dump in either the flat or the segmented shape.
pub fn parse_transcript(json: &str) -> Result<Vec<Token>> {
    let dump: TranscriptDump =
        serde_json::from_str(json).map_err(|e| AlignError::InvalidTranscript {
            message: e.to_string(),
        })?;

    let words: Vec<WordEntry> = match dump {
        TranscriptDump::Words(words) => words,
        TranscriptDump::Segments { segments } => {
            segments.into_iter().flat_map(|s| s.words).collect()
        }
    };

    let tokens: Vec<Token> = words
        .into_iter()
        .map(|w| Token::audio(w.word.trim(), w.start, w.end, w.probability))
        .filter(|t| !t.normalized.is_empty())
        .collect();

    validate_audio_tokens(&tokens)?;
    Ok(tokens)
}

/// Checks the timing and confidence contract of transcriber output.
pub fn validate_audio_tokens(tokens: &[Token]) -> Result<()> {
    let mut prev_start = 0.0_f64;
    for (i, token) in tokens.iter().enumerate() {
        if !(token.start_time.is_finite() && token.end_time.is_finite()) || token.start_time < 0.0 {
            return Err(AlignError::InvalidTranscript {
                message: format!("token {i} ({:?}) has invalid timestamps", token.text),
            });
        }
        if token.end_time < token.start_time {
            return Err(AlignError::InvalidTranscript {
                message: format!("token {i} ({:?}) ends before it starts", token.text),
            });
        }
        if token.start_time < prev_start {
            return Err(AlignError::InvalidTranscript {
                message: format!(
                    "token {i} ({:?}) starts at {:.3}s, before the previous token ({:.3}s)",
                    token.text, token.start_time, prev_start
                ),
            });
        }
        if !(0.0..=1.0).contains(&token.confidence) {
            return Err(AlignError::InvalidTranscript {
                message: format!(
                    "token {i} ({:?}) has confidence {} outside [0, 1]",
                    token.text, token.confidence
                ),
            });
        }
        prev_start = token.start_time;
    }
    Ok(())
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    tokens: Vec<Token>,
    should_fail: bool,
}

impl MockTranscriber {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            should_fail: false,
        }
    }

    /// Builds evenly timed tokens from a sentence, `word_secs` per word.
    pub fn from_words(text: &str, word_secs: f64, confidence: f32) -> Self {
        let tokens = text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| {
                let start = i as f64 * word_secs;
                let end = (i + 1) as f64 * word_secs;
                Token::audio(w, start, end, confidence)
            })
            .filter(|t| !t.normalized.is_empty())
            .collect();
        Self::new(tokens)
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &Path) -> Result<Vec<Token>> {
        if self.should_fail {
            Err(AlignError::InvalidTranscript {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.tokens.clone())
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_flat_words() {
        let json = r#"[
            {"word": " Chapter", "start": 0.0, "end": 0.4, "probability": 0.98},
            {"word": " one.", "start": 0.4, "end": 0.7, "probability": 0.91}
        ]"#;
        let tokens = parse_transcript(json).unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "Chapter");
        assert_eq!(tokens[1].normalized, "one");
        assert_eq!(tokens[1].confidence, 0.91);
    }

    #[test]
    fn test_parse_segmented_words_with_aliases() {
        let json = r#"{"segments": [
            {"words": [{"text": "It", "start": 1.0, "end": 1.2, "confidence": 0.8}]},
            {"words": []},
            {"words": [{"text": "was", "start": 1.2, "end": 1.4}]}
        ]}"#;
        let tokens = parse_transcript(json).unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].confidence, 0.8);
        assert_eq!(tokens[1].confidence, 1.0, "missing probability defaults to 1.0");
    }

    #[test]
    fn test_punctuation_only_words_are_dropped() {
        let json = r#"[
            {"word": "Hi", "start": 0.0, "end": 0.2},
            {"word": " -", "start": 0.2, "end": 0.2}
        ]"#;
        assert_eq!(parse_transcript(json).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_decreasing_start_times() {
        let tokens = vec![
            Token::audio("a", 1.0, 1.2, 0.9),
            Token::audio("b", 0.5, 0.7, 0.9),
        ];
        let err = validate_audio_tokens(&tokens).unwrap_err();
        assert!(err.to_string().contains("before the previous token"));
    }

    #[test]
    fn test_rejects_end_before_start_and_bad_confidence() {
        let tokens = vec![Token::audio("a", 1.0, 0.8, 0.9)];
        assert!(validate_audio_tokens(&tokens).is_err());

        let tokens = vec![Token::audio("a", 1.0, 1.2, 1.5)];
        assert!(validate_audio_tokens(&tokens).is_err());
    }

    #[test]
    fn test_malformed_json_is_invalid_transcript() {
        let err = parse_transcript("{\"segments\": 3}").unwrap_err();
        assert!(matches!(err, AlignError::InvalidTranscript { .. }));
    }

    #[test]
    fn test_transcript_path_next_to_audio() {
        let path = JsonTranscriptLoader::transcript_path(Path::new("/data/book_01.wav"));
        assert_eq!(path, PathBuf::from("/data/book_01.words.json"));
    }

    #[test]
    fn test_loader_reads_dump_next_to_audio() {
        let dir = TempDir::new().unwrap();
        let mut file = fs::File::create(dir.path().join("book_02.words.json")).unwrap();
        file.write_all(br#"[{"word": "hello", "start": 0.0, "end": 0.5, "probability": 0.9}]"#)
            .unwrap();

        let loader = JsonTranscriptLoader::new();
        let tokens = loader.transcribe(&dir.path().join("book_02.wav")).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(loader.name(), "json-words");
    }

    #[test]
    fn test_mock_transcriber() {
        let mock = MockTranscriber::from_words("hello there world", 0.5, 0.9);
        let tokens = mock.transcribe(Path::new("x.wav")).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].start_time, 1.0);
        assert_eq!(tokens[2].end_time, 1.5);

        let failing = MockTranscriber::new(Vec::new()).with_failure();
        assert!(failing.transcribe(Path::new("x.wav")).is_err());
    }

    #[test]
    fn test_arc_transcriber_delegates() {
        let shared = Arc::new(MockTranscriber::from_words("a b", 0.1, 1.0));
        assert_eq!(shared.name(), "mock");
        assert_eq!(shared.transcribe(Path::new("x.wav")).unwrap().len(), 2);
    }
}
