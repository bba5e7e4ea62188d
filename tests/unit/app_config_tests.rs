/*!
 * Tests for application configuration functionality
 */

use negbatch::app_config::{Config, LogLevel, PathsConfig, Precision};
use negbatch::errors::AppError;
use negbatch::pipeline::StageKind;
use std::path::Path;
use tempfile::TempDir;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.partition.batch_size, 100);
    assert_eq!(config.partition.max_batches, None);
    assert!(!config.scheduler.parallel);
    assert_eq!(config.scheduler.stop_after, None);
    assert_eq!(config.translation.precision, Precision::Full);
    assert!(config.stages.postprocess);
    assert!(config.stages.analyze);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.translation.sub_batch_size = 0;
    assert!(config.validate().is_err());
    config.translation.sub_batch_size = 8;

    config.translation.endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
    config.translation.endpoint = "http://localhost:9000".to_string();

    config.monitoring.alert_memory_percent = 101;
    assert!(config.validate().is_err());
    config.monitoring.alert_memory_percent = 100;

    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withZeroBatchSize_shouldReturnConfigurationError() {
    let mut config = Config::default();
    config.partition.batch_size = 0;

    let err = config.validate().unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.partition.batch_size, 100);

    // a second load reads the file back
    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.target_language, config.target_language);
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "target_language": "de", "partition": { "batch_size": 7 }, "scheduler": { "stop_after": "translate" } }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.target_language, "de");
    assert_eq!(config.source_language, "en");
    assert_eq!(config.partition.batch_size, 7);
    assert_eq!(config.partition.text_column, "en");
    assert_eq!(config.scheduler.stop_after, Some(StageKind::Translate));
}

#[test]
fn test_loadOrCreate_withMalformedFile_shouldReturnConfigurationError() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_or_create(&path).unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
}

#[test]
fn test_pathsRootedAt_shouldPlaceLedgersInMetaDir() {
    let paths = PathsConfig::rooted_at(Path::new("/work"));

    assert_eq!(paths.raw_data_dir, Path::new("/work/data/raw"));
    assert_eq!(paths.ledger_path(), Path::new("/work/data/meta/batch_ledger.db"));
    assert_eq!(
        paths.derived_ledger_path(),
        Path::new("/work/data/meta/derived_ledger.jsonl")
    );
}
