use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles loading, validating and saving configuration settings.
/// The API key is deliberately not part of it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language of the translation
    #[serde(default)]
    pub target_language: TargetLanguage,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Supported target languages
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetLanguage {
    // @language: Brazilian Portuguese
    #[default]
    #[serde(rename = "pt-BR")]
    BrazilianPortuguese,
}

impl TargetLanguage {
    // @returns: Language name as used in prompts
    pub fn display_name(&self) -> &str {
        match self {
            Self::BrazilianPortuguese => "Brazilian Portuguese",
        }
    }

    // @returns: BCP 47 tag, also used as the output file suffix
    pub fn code(&self) -> &str {
        match self {
            Self::BrazilianPortuguese => "pt-BR",
        }
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pt-br" | "pt_br" | "pt" | "portuguese" | "brazilian portuguese" => Ok(Self::BrazilianPortuguese),
            _ => Err(anyhow!("Unsupported target language: {}", s)),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Token ceiling for one batch of subtitle texts
    #[serde(default = "default_max_tokens_per_group")]
    pub max_tokens_per_group: usize,

    /// Attempts per request before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempt budget for a single segment left over after splitting
    #[serde(default = "default_single_segment_attempts")]
    pub single_segment_attempts: u32,

    /// Base backoff time in milliseconds, doubled on each retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Cool-down after the service reports quota exhaustion
    #[serde(default = "default_quota_cooldown_secs")]
    pub quota_cooldown_secs: u64,

    /// Keys shorter than this are rejected without a request
    #[serde(default = "default_min_api_key_length")]
    pub min_api_key_length: usize,

    /// Requests shorter than this many characters count as short text
    /// for the unreported-quota heuristic
    #[serde(default = "default_short_text_threshold")]
    pub short_text_threshold: usize,

    /// Consecutive transient failures on short text treated as a quota condition
    #[serde(default = "default_short_text_failure_limit")]
    pub short_text_failure_limit: u32,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_tokens_per_group: default_max_tokens_per_group(),
            max_attempts: default_max_attempts(),
            single_segment_attempts: default_single_segment_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            quota_cooldown_secs: default_quota_cooldown_secs(),
            min_api_key_length: default_min_api_key_length(),
            short_text_threshold: default_short_text_threshold(),
            short_text_failure_limit: default_short_text_failure_limit(),
            temperature: None,
        }
    }
}

impl TranslationConfig {
    pub fn quota_cooldown(&self) -> Duration {
        Duration::from_secs(self.quota_cooldown_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens_per_group() -> usize {
    700
}

fn default_max_attempts() -> u32 {
    3
}

fn default_single_segment_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000 // 1s, 2s, 4s...
}

fn default_quota_cooldown_secs() -> u64 {
    65
}

fn default_min_api_key_length() -> usize {
    30
}

fn default_short_text_threshold() -> usize {
    120
}

fn default_short_text_failure_limit() -> u32 {
    2
}

impl Config {
    /// Load a configuration file, writing a default one if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        log::warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let t = &self.translation;
        if t.model.trim().is_empty() {
            return Err(anyhow!("Translation model must not be empty"));
        }
        url::Url::parse(&t.endpoint)
            .with_context(|| format!("Invalid translation endpoint: {}", t.endpoint))?;
        if t.max_tokens_per_group == 0 {
            return Err(anyhow!("max_tokens_per_group must be greater than zero"));
        }
        if t.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }
        if t.single_segment_attempts < t.max_attempts {
            return Err(anyhow!(
                "single_segment_attempts ({}) must not be lower than max_attempts ({})",
                t.single_segment_attempts, t.max_attempts
            ));
        }
        if let Some(temperature) = t.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow!("temperature must be between 0.0 and 2.0, got {}", temperature));
            }
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: TargetLanguage::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
