use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::pipeline::StageKind;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Every component receives the parts it needs at construction time.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Corpus partitioning settings
    #[serde(default)]
    pub partition: PartitionConfig,

    /// Negation annotation settings
    #[serde(default)]
    pub negation: NegationConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Translation collaborator settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Advisory monitoring thresholds
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Optional stages
    #[serde(default)]
    pub stages: StagesConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Directory layout of a pipeline workspace
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Where the source corpus (.txt or .csv) lives
    #[serde(default = "default_raw_data_dir")]
    pub raw_data_dir: PathBuf,

    /// Where batch artifacts are written
    #[serde(default = "default_batches_dir")]
    pub batches_dir: PathBuf,

    /// Where derived (translated) artifacts are written
    #[serde(default = "default_translated_dir")]
    pub translated_dir: PathBuf,

    /// Where the ledger and derived ledger live
    #[serde(default = "default_meta_dir")]
    pub meta_dir: PathBuf,

    /// Where per-batch analysis reports are written
    #[serde(default = "default_analysis_dir")]
    pub analysis_dir: PathBuf,

    /// Where log files are written
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

impl PathsConfig {
    /// Root every relative path at `root`
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            raw_data_dir: root.join(defaults.raw_data_dir),
            batches_dir: root.join(defaults.batches_dir),
            translated_dir: root.join(defaults.translated_dir),
            meta_dir: root.join(defaults.meta_dir),
            analysis_dir: root.join(defaults.analysis_dir),
            logs_dir: root.join(defaults.logs_dir),
        }
    }

    /// Ledger database location
    pub fn ledger_path(&self) -> PathBuf {
        self.meta_dir.join("batch_ledger.db")
    }

    /// Derived ledger location
    pub fn derived_ledger_path(&self) -> PathBuf {
        self.meta_dir.join("derived_ledger.jsonl")
    }

    fn all(&self) -> [(&'static str, &PathBuf); 6] {
        [
            ("raw_data_dir", &self.raw_data_dir),
            ("batches_dir", &self.batches_dir),
            ("translated_dir", &self.translated_dir),
            ("meta_dir", &self.meta_dir),
            ("analysis_dir", &self.analysis_dir),
            ("logs_dir", &self.logs_dir),
        ]
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: default_raw_data_dir(),
            batches_dir: default_batches_dir(),
            translated_dir: default_translated_dir(),
            meta_dir: default_meta_dir(),
            analysis_dir: default_analysis_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// Corpus partitioning settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PartitionConfig {
    /// Sentences per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Only generate (and schedule) the first N batches
    #[serde(default)]
    pub max_batches: Option<usize>,

    /// Column holding the sentences in CSV sources
    #[serde(default = "default_text_column")]
    pub text_column: String,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_batches: None,
            text_column: default_text_column(),
        }
    }
}

/// Negation annotation settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NegationConfig {
    /// Extra cue words or phrases appended after the built-in vocabulary
    #[serde(default)]
    pub extra_cues: Vec<String>,
}

/// Scheduler settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SchedulerConfig {
    /// Run batches on a bounded worker pool instead of one at a time
    #[serde(default)]
    pub parallel: bool,

    /// Explicit pool size; derived from the execution context when unset
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Halt each batch after this stage without marking it done
    #[serde(default)]
    pub stop_after: Option<StageKind>,
}

/// Numeric precision requested from the translation model
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Full (fp32) precision
    #[default]
    Full,
    /// Half (fp16) precision, accelerator only
    Half,
}

/// Preferred execution device
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use an accelerator when one is detected
    #[default]
    Auto,
    /// Never use an accelerator
    Cpu,
    /// Ask for an accelerator, falling back to CPU when none is present
    Cuda,
}

/// Translation collaborator settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name passed to the service
    #[serde(default = "default_model")]
    pub model: String,

    /// Sentences sent to the model per request
    #[serde(default = "default_sub_batch_size")]
    pub sub_batch_size: usize,

    /// Requested precision
    #[serde(default)]
    pub precision: Precision,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Device preference
    #[serde(default)]
    pub device: DevicePreference,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            sub_batch_size: default_sub_batch_size(),
            precision: Precision::default(),
            timeout_secs: default_timeout_secs(),
            device: DevicePreference::default(),
        }
    }
}

/// Advisory monitoring thresholds; exceeding them only logs a warning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    /// Check resources every N translation sub-batches
    #[serde(default = "default_monitoring_frequency")]
    pub frequency: usize,

    /// System memory usage alert (%)
    #[serde(default = "default_alert_percent")]
    pub alert_memory_percent: u8,

    /// Accelerator memory usage alert (%)
    #[serde(default = "default_alert_percent")]
    pub alert_accelerator_percent: u8,

    /// Per-batch elapsed time alert (seconds)
    #[serde(default = "default_alert_unit_secs")]
    pub alert_unit_secs: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            frequency: default_monitoring_frequency(),
            alert_memory_percent: default_alert_percent(),
            alert_accelerator_percent: default_alert_percent(),
            alert_unit_secs: default_alert_unit_secs(),
        }
    }
}

/// Which optional stages are installed
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StagesConfig {
    /// Install the postprocess stage
    #[serde(default = "default_true")]
    pub postprocess: bool,

    /// Install the analyze stage
    #[serde(default = "default_true")]
    pub analyze: bool,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            postprocess: true,
            analyze: true,
        }
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
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
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
    "en".to_string()
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_raw_data_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_batches_dir() -> PathBuf {
    PathBuf::from("data/batches")
}

fn default_translated_dir() -> PathBuf {
    PathBuf::from("data/translated")
}

fn default_meta_dir() -> PathBuf {
    PathBuf::from("data/meta")
}

fn default_analysis_dir() -> PathBuf {
    PathBuf::from("data/analysis")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_batch_size() -> usize {
    100
}

fn default_text_column() -> String {
    "en".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8765".to_string()
}

fn default_model() -> String {
    "opus-mt-en-fr".to_string()
}

fn default_sub_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_monitoring_frequency() -> usize {
    1
}

fn default_alert_percent() -> u8 {
    90
}

fn default_alert_unit_secs() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration file, creating a default one when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))
                .map_err(|e| AppError::Configuration(format!("{:#}", e)))?;
            let reader = BufReader::new(file);
            return serde_json::from_reader(reader).map_err(|e| {
                AppError::Configuration(format!("Failed to parse config file {:?}: {}", path, e))
            });
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, config_json).map_err(|e| {
            AppError::Configuration(format!("Failed to write default config to {:?}: {}", path, e))
        })?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, code) in [
            ("source_language", &self.source_language),
            ("target_language", &self.target_language),
        ] {
            if !is_valid_language_code(code) {
                return Err(AppError::Configuration(format!(
                    "{} is not a valid ISO 639 code: '{}'",
                    field, code
                )));
            }
        }

        for (name, path) in self.paths.all() {
            if path.as_os_str().is_empty() {
                return Err(AppError::Configuration(format!("paths.{} must be set", name)));
            }
        }

        if self.partition.batch_size == 0 {
            return Err(AppError::Configuration(
                "partition.batch_size must be greater than zero".to_string(),
            ));
        }

        if self.partition.max_batches == Some(0) {
            return Err(AppError::Configuration(
                "partition.max_batches must be greater than zero when set".to_string(),
            ));
        }

        if self.partition.text_column.trim().is_empty() {
            return Err(AppError::Configuration(
                "partition.text_column must be set".to_string(),
            ));
        }

        if self.scheduler.max_workers == Some(0) {
            return Err(AppError::Configuration(
                "scheduler.max_workers must be greater than zero when set".to_string(),
            ));
        }

        if self.translation.sub_batch_size == 0 {
            return Err(AppError::Configuration(
                "translation.sub_batch_size must be greater than zero".to_string(),
            ));
        }

        url::Url::parse(&self.translation.endpoint).map_err(|e| {
            AppError::Configuration(format!(
                "translation.endpoint is not a valid URL '{}': {}",
                self.translation.endpoint, e
            ))
        })?;

        if self.monitoring.frequency == 0 {
            return Err(AppError::Configuration(
                "monitoring.frequency must be greater than zero".to_string(),
            ));
        }

        for (name, value) in [
            ("alert_memory_percent", self.monitoring.alert_memory_percent),
            ("alert_accelerator_percent", self.monitoring.alert_accelerator_percent),
        ] {
            if value > 100 {
                return Err(AppError::Configuration(format!(
                    "monitoring.{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }

        let alert_secs = self.monitoring.alert_unit_secs;
        if alert_secs.is_nan() || alert_secs <= 0.0 {
            return Err(AppError::Configuration(
                "monitoring.alert_unit_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            paths: PathsConfig::default(),
            partition: PartitionConfig::default(),
            negation: NegationConfig::default(),
            scheduler: SchedulerConfig::default(),
            translation: TranslationConfig::default(),
            monitoring: MonitoringConfig::default(),
            stages: StagesConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Accept ISO 639-1 and ISO 639-3 codes
fn is_valid_language_code(code: &str) -> bool {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => isolang::Language::from_639_1(&normalized).is_some(),
        3 => isolang::Language::from_639_3(&normalized).is_some(),
        _ => false,
    }
}
