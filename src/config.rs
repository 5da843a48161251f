//! Run configuration.
//!
//! Settings come from three layers: built-in defaults, an optional TOML file
//! (`--config`), and command-line flags, later layers winning. The file is
//! optional; a missing or empty file yields `Config::default()`. Unknown keys
//! are accepted but logged as warnings since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Input file {0} does not exist")]
    MissingInput(PathBuf),

    #[error("NER classification requires translation (--translate)")]
    NerRequiresTranslation,

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Image fetching and re-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Download and cache story images.
    pub fetch: bool,
    /// Scrape the article page's `og:image` when the feed carries no image.
    pub og_fallback: bool,
    /// Fit images within `width` x `height`.
    pub resize: bool,
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            fetch: true,
            og_fallback: true,
            resize: true,
            width: 800,
            height: 600,
            quality: 90,
        }
    }
}

/// Machine translation into English via a LibreTranslate-compatible server.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Source languages to install at startup.
    pub languages: Vec<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:5000".to_string(),
            api_key: None,
            languages: [
                "ar", "az", "ca", "zh", "cs", "da", "nl", "eo", "fi", "fr", "de", "el", "he", "hi",
                "hu", "id", "ga", "it", "ja", "ko", "fa", "pl", "pt", "ru", "sk", "es", "sv", "th",
                "tr",
            ]
            .iter()
            .map(|code| code.to_string())
            .collect(),
        }
    }
}

/// Mask api_key in Debug output to prevent secret leakage.
impl std::fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("languages", &self.languages)
            .finish()
    }
}

/// Named-entity recognition via a token-classification inference endpoint.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub api_token: Option<String>,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api-inference.huggingface.co/models".to_string(),
            model: "dbmdz/bert-large-cased-finetuned-conll03-english".to_string(),
            api_token: None,
        }
    }
}

/// Mask api_token in Debug output to prevent secret leakage.
impl std::fmt::Debug for NerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Top-level run configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `input_feeds` and `verbose` only come from the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub input_feeds: PathBuf,

    #[serde(skip)]
    pub verbose: bool,

    /// Directory for per-feed JSON files; images go in `images/` below it.
    pub output_dir: PathBuf,

    /// Entries processed per feed, taken from the top of the feed.
    pub max_entries: usize,

    /// Entries enriched concurrently within one feed.
    pub workers: usize,

    pub images: ImageConfig,
    pub translation: TranslationConfig,
    pub ner: NerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_feeds: PathBuf::new(),
            verbose: false,
            output_dir: PathBuf::from("./output"),
            max_entries: 50,
            workers: default_workers(),
            images: ImageConfig::default(),
            translation: TranslationConfig::default(),
            ner: NerConfig::default(),
        }
    }
}

/// Available parallelism plus four, capped at 32. Workers spend most of
/// their time waiting on the network.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_add(4)
        .min(32)
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "output_dir",
        "max_entries",
        "workers",
        "images",
        "translation",
        "ner",
    ];

    const KNOWN_TABLE_KEYS: &'static [(&'static str, &'static [&'static str])] = &[
        (
            "images",
            &["fetch", "og_fallback", "resize", "width", "height", "quality"],
        ),
        ("translation", &["enabled", "endpoint", "api_key", "languages"]),
        ("ner", &["enabled", "endpoint", "model", "api_token"]),
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Checks settings that would make the run pointless or inconsistent.
    ///
    /// Runs before any feed work begins; every error here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.input_feeds.is_file() {
            return Err(ConfigError::MissingInput(self.input_feeds.clone()));
        }
        if self.ner.enabled && !self.translation.enabled {
            return Err(ConfigError::NerRequiresTranslation);
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::InvalidValue {
                key: "image_quality",
                reason: format!("{} is outside 1-100", self.images.quality),
            });
        }
        if self.images.width == 0 || self.images.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "image_width/image_height",
                reason: "dimensions must be positive".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers",
                reason: "at least one worker is required".to_string(),
            });
        }
        Ok(())
    }

    /// Directory holding cached story images.
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (key, value) in raw {
        if !Config::KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            continue;
        }
        let Some(table) = value.as_table() else {
            continue;
        };
        let Some((_, known)) = Config::KNOWN_TABLE_KEYS
            .iter()
            .find(|(name, _)| *name == key.as_str())
        else {
            continue;
        };
        for sub in table.keys() {
            if !known.contains(&sub.as_str()) {
                tracing::warn!(key = %format!("{}.{}", key, sub), "Unknown key in config file, ignoring");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
