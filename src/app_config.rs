use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO) of the loaded subtitles
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO) of the translation
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Generation service settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Batch pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Where the API key is persisted; defaults to the user config directory
    #[serde(default)]
    pub credential_store_path: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// The distinct kinds of generation calls, each with its own model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    // @task: Clean up source-language text
    Normalize,
    // @task: Translate into the target language
    Translate,
    // @task: Whole-document character extraction
    AnalyzeCharacters,
    // @task: Pronoun/gender correction against a roster
    FixGender,
    // @task: Minimal credential check
    Probe,
}

impl GenerationTask {
    // @returns: Human-readable task name used in logs and errors
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normalize => "Normalize source text",
            Self::Translate => "Translate",
            Self::AnalyzeCharacters => "Analyze characters",
            Self::FixGender => "Fix gender",
            Self::Probe => "Check API key",
        }
    }
}

impl std::fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Generation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used to normalize source text
    #[serde(default = "default_task_model")]
    pub normalize_model: String,

    /// Model used to translate
    #[serde(default = "default_task_model")]
    pub translate_model: String,

    /// Model used for character analysis and gender fixing
    #[serde(default = "default_task_model")]
    pub fix_model: String,

    /// Cheaper model used by the API key probe
    #[serde(default = "default_probe_model")]
    pub probe_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GenerationConfig {
    /// Model id configured for a task
    pub fn model_for(&self, task: GenerationTask) -> &str {
        match task {
            GenerationTask::Normalize => &self.normalize_model,
            GenerationTask::Translate => &self.translate_model,
            GenerationTask::AnalyzeCharacters | GenerationTask::FixGender => &self.fix_model,
            GenerationTask::Probe => &self.probe_model,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            normalize_model: default_task_model(),
            translate_model: default_task_model(),
            fix_model: default_task_model(),
            probe_model: default_probe_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What to do when a batch response has fewer segments than the batch has entries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Keep the original text for unmatched entries and carry on
    #[default]
    Lenient,
    /// Fail the run
    Strict,
}

/// Batch pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Maximum number of entries sent in one request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Handling of short responses
    #[serde(default)]
    pub shape_policy: ShapePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            shape_policy: ShapePolicy::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
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
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "zh".to_string()
}

fn default_target_language() -> String {
    "vi".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_task_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_probe_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_batch_size() -> usize {
    30
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        Url::parse(&self.generation.endpoint)
            .with_context(|| format!("Invalid generation endpoint: {}", self.generation.endpoint))?;

        let models = [
            ("normalize_model", &self.generation.normalize_model),
            ("translate_model", &self.generation.translate_model),
            ("fix_model", &self.generation.fix_model),
            ("probe_model", &self.generation.probe_model),
        ];
        for (name, model) in models {
            if model.trim().is_empty() {
                return Err(anyhow!("Model id '{}' must not be empty", name));
            }
        }

        if self.generation.timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }

        if self.pipeline.batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        Ok(())
    }

    /// Load the configuration file, writing a default one when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        crate::file_utils::FileManager::write_to_file(path, &config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            generation: GenerationConfig::default(),
            pipeline: PipelineConfig::default(),
            credential_store_path: None,
            log_level: LogLevel::default(),
        }
    }
}
