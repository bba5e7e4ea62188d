/*!
 * Error types for the negbatch pipeline.
 *
 * This module contains custom error types for the different parts of the
 * pipeline, using the thiserror crate for ergonomic error definitions.
 * Configuration and source-data errors are fatal for a run; artifact errors
 * are fatal for a single batch; translation errors are recovered locally.
 */

use thiserror::Error;

/// Errors raised by a translation collaborator
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The model ran out of memory or the device is saturated
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The request could not be completed
    #[error("Translation request failed: {0}")]
    RequestFailed(String),

    /// The collaborator answered with the wrong number of sentences
    #[error("Translator returned {actual} sentences, expected {expected}")]
    LengthMismatch {
        /// Number of sentences sent
        expected: usize,
        /// Number of sentences received
        actual: usize,
    },
}

/// Errors raised by the batch ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Transition or lookup on a batch that was never registered
    #[error("Unknown batch in ledger: {0}")]
    UnknownBatch(String),

    /// Registration of a batch that already has a row
    #[error("Batch already registered: {0}")]
    DuplicateBatch(String),

    /// A status move that would break the monotone lifecycle
    #[error("Invalid transition for {batch_id}: {from} -> {to}")]
    InvalidTransition {
        /// Batch being moved
        batch_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Underlying storage failure
    #[error("Ledger storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<LedgerError>() {
            Ok(ledger_error) => ledger_error,
            Err(other) => Self::Storage(format!("{:#}", other)),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source corpus missing, empty or malformed
    #[error("Source data error: {0}")]
    SourceData(String),

    /// A persisted batch is missing or corrupt
    #[error("Batch artifact error for {batch_id}: {message}")]
    BatchArtifact {
        /// Batch the artifact belongs to
        batch_id: String,
        /// What went wrong
        message: String,
    },

    /// A caller broke an operation's precondition
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Error from the ledger
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Shorthand for a batch artifact error
    pub fn artifact(batch_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BatchArtifact {
            batch_id: batch_id.into(),
            message: message.into(),
        }
    }

    /// Whether the error must terminate the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::SourceData(_))
    }
}

/// Process exit status for a failed run: 2 when setup was wrong (bad
/// configuration or unusable corpus), 1 for anything else.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<AppError>() {
        Some(app_error) if app_error.is_fatal() => 2,
        _ => 1,
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<AppError>() {
            Ok(app_error) => app_error,
            Err(other) => Self::Unknown(format!("{:#}", other)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::File(format!("JSON error: {}", error))
    }
}
