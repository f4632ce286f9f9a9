use crate::defaults;
use crate::error::{AlignError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub align: AlignConfig,
    pub segmenter: SegmenterConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Alignment engine configuration (anchor matcher, solver, scorer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignConfig {
    pub anchor_similarity_threshold: f32,
    pub anchor_search_radius: usize,
    pub anchor_window_len: usize,
    pub anchor_uniqueness_margin: f32,
    pub min_anchors: usize,
    pub token_match_threshold: f32,
    pub skip_reference_cost: f32,
    pub skip_audio_cost: f32,
    pub low_confidence_token_floor: f32,
    pub low_confidence_penalty: f32,
    pub max_window_cells: usize,
    pub duration_ratio_range: (f32, f32),
    pub expected_chars_per_second: f32,
    pub confidence_floor: f32,
    pub similarity_ceiling: f32,
}

/// Reference segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    pub max_unit_tokens: usize,
}

/// Parallel batch configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; 0 picks one per available core.
    pub workers: usize,
    pub queue_capacity: usize,
}

/// Corpus output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Cut accepted spans into per-unit WAV clips when the chapter audio is available.
    pub write_clips: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            anchor_similarity_threshold: defaults::ANCHOR_SIMILARITY_THRESHOLD,
            anchor_search_radius: defaults::ANCHOR_SEARCH_RADIUS,
            anchor_window_len: defaults::ANCHOR_WINDOW_LEN,
            anchor_uniqueness_margin: defaults::ANCHOR_UNIQUENESS_MARGIN,
            min_anchors: defaults::MIN_ANCHORS,
            token_match_threshold: defaults::TOKEN_MATCH_THRESHOLD,
            skip_reference_cost: defaults::SKIP_REFERENCE_COST,
            skip_audio_cost: defaults::SKIP_AUDIO_COST,
            low_confidence_token_floor: defaults::LOW_CONFIDENCE_TOKEN_FLOOR,
            low_confidence_penalty: defaults::LOW_CONFIDENCE_PENALTY,
            max_window_cells: defaults::MAX_WINDOW_CELLS,
            duration_ratio_range: (defaults::DURATION_RATIO_MIN, defaults::DURATION_RATIO_MAX),
            expected_chars_per_second: defaults::EXPECTED_CHARS_PER_SECOND,
            confidence_floor: defaults::CONFIDENCE_FLOOR,
            similarity_ceiling: defaults::SIMILARITY_CEILING,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_unit_tokens: defaults::MAX_UNIT_TOKENS,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: defaults::BATCH_QUEUE_CAPACITY,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::OUTPUT_DIR),
            write_clips: true,
        }
    }
}

impl AlignConfig {
    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        unit_interval("anchor_similarity_threshold", self.anchor_similarity_threshold)?;
        unit_interval("anchor_uniqueness_margin", self.anchor_uniqueness_margin)?;
        unit_interval("token_match_threshold", self.token_match_threshold)?;
        unit_interval("skip_reference_cost", self.skip_reference_cost)?;
        unit_interval("skip_audio_cost", self.skip_audio_cost)?;
        unit_interval("low_confidence_token_floor", self.low_confidence_token_floor)?;
        unit_interval("low_confidence_penalty", self.low_confidence_penalty)?;
        unit_interval("confidence_floor", self.confidence_floor)?;
        unit_interval("similarity_ceiling", self.similarity_ceiling)?;

        if !(defaults::ANCHOR_WINDOW_MIN..=defaults::ANCHOR_WINDOW_MAX)
            .contains(&self.anchor_window_len)
        {
            return Err(invalid(
                "anchor_window_len",
                format!(
                    "must be between {} and {}",
                    defaults::ANCHOR_WINDOW_MIN,
                    defaults::ANCHOR_WINDOW_MAX
                ),
            ));
        }
        if self.anchor_search_radius == 0 {
            return Err(invalid("anchor_search_radius", "must be positive"));
        }
        if self.min_anchors < 2 {
            return Err(invalid("min_anchors", "must be at least 2"));
        }
        if self.max_window_cells == 0 {
            return Err(invalid("max_window_cells", "must be positive"));
        }
        let (min, max) = self.duration_ratio_range;
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(invalid(
                "duration_ratio_range",
                format!("expected 0 < min <= max, got ({min}, {max})"),
            ));
        }
        if !(self.expected_chars_per_second.is_finite() && self.expected_chars_per_second > 0.0) {
            return Err(invalid("expected_chars_per_second", "must be positive"));
        }
        Ok(())
    }
}

fn unit_interval(key: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, format!("must be within [0, 1], got {value}")))
    }
}

fn invalid(key: &str, message: impl Into<String>) -> AlignError {
    AlignError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AlignError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                AlignError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(AlignError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - BOOKALIGN_ANCHOR_THRESHOLD → align.anchor_similarity_threshold
    /// - BOOKALIGN_WORKERS → batch.workers
    /// - BOOKALIGN_OUTPUT_DIR → output.dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("BOOKALIGN_ANCHOR_THRESHOLD")
            && !value.is_empty()
        {
            match value.parse::<f32>() {
                Ok(threshold) => self.align.anchor_similarity_threshold = threshold,
                Err(e) => tracing::warn!("ignoring BOOKALIGN_ANCHOR_THRESHOLD={value}: {e}"),
            }
        }

        if let Ok(value) = std::env::var("BOOKALIGN_WORKERS")
            && !value.is_empty()
        {
            match value.parse::<usize>() {
                Ok(workers) => self.batch.workers = workers,
                Err(e) => tracing::warn!("ignoring BOOKALIGN_WORKERS={value}: {e}"),
            }
        }

        if let Ok(dir) = std::env::var("BOOKALIGN_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.output.dir = PathBuf::from(dir);
        }

        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.align.validate()?;
        if self.segmenter.max_unit_tokens == 0 {
            return Err(invalid("max_unit_tokens", "must be positive"));
        }
        if self.batch.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be positive"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/bookalign/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookalign")
            .join("config.toml")
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AlignError::ConfigParse {
            message: e.to_string(),
        })
    }
}
