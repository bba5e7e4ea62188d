/*!
 * Tests for error types and conversions
 */

use anyhow::anyhow;
use anyhow::Context;
use negbatch::errors::{AppError, LedgerError, TranslationError, exit_code};

#[test]
fn test_appError_fromAnyhow_shouldRecoverWrappedAppError() {
    let wrapped = anyhow::Error::new(AppError::SourceData("empty corpus".to_string()));

    let err: AppError = wrapped.into();
    assert!(matches!(err, AppError::SourceData(_)));
}

#[test]
fn test_appError_fromPlainAnyhow_shouldBecomeUnknown() {
    let err: AppError = anyhow!("something odd").into();
    assert!(matches!(err, AppError::Unknown(msg) if msg.contains("something odd")));
}

#[test]
fn test_appError_fromIo_shouldBecomeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: AppError = io.into();
    assert!(matches!(err, AppError::File(_)));
}

#[test]
fn test_isFatal_shouldOnlyFlagSetupErrors() {
    assert!(AppError::Configuration("x".into()).is_fatal());
    assert!(AppError::SourceData("x".into()).is_fatal());
    assert!(!AppError::artifact("b_000001_000002", "corrupt").is_fatal());
    assert!(!AppError::Precondition("x".into()).is_fatal());
    assert!(!AppError::from(LedgerError::UnknownBatch("b".into())).is_fatal());
}

#[test]
fn test_display_shouldNameTheBatch() {
    let err = AppError::artifact("corpus_000001_000002", "corrupt record on line 3");
    let text = err.to_string();

    assert!(text.contains("corpus_000001_000002"));
    assert!(text.contains("line 3"));
}

#[test]
fn test_translationError_shouldWrapIntoAppError() {
    let err: AppError = TranslationError::ResourceExhausted("out of memory".into()).into();
    assert!(matches!(
        err,
        AppError::Translation(TranslationError::ResourceExhausted(_))
    ));
}

#[test]
fn test_exitCode_withSetupError_shouldReturnTwo() {
    let err = anyhow::Error::new(AppError::Configuration("batch_size is 0".into()));
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn test_exitCode_withContextWrappedSetupError_shouldReturnTwo() {
    let result: Result<(), AppError> = Err(AppError::SourceData("empty corpus".into()));
    let err = result.context("Configuration validation failed").unwrap_err();
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn test_exitCode_withRunError_shouldReturnOne() {
    assert_eq!(exit_code(&anyhow::Error::new(AppError::artifact("b_000001_000002", "corrupt"))), 1);
    assert_eq!(exit_code(&anyhow!("network down")), 1);
}
