/*!
 * # negbatch - negation-annotated corpus batches for translation
 *
 * A Rust library that splits a sentence corpus into fixed-size batches,
 * annotates each sentence with negation cues and scope, and drives every
 * batch through a staged translation pipeline tracked in a persistent ledger.
 *
 * ## Features
 *
 * - Deterministic corpus partitioning with batch ids recoverable from file names
 * - Negation cue detection with char-accurate scope offsets
 * - SQLite-backed batch ledger with a monotone status lifecycle
 * - Sequential or bounded-parallel batch scheduling
 * - Fixed stage pipeline (normalize, translate, postprocess, analyze)
 * - Derived batch assembly with an append-only derived ledger
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `corpus`: Corpus loading, batch identity and partitioning
 * - `negation`: Cue vocabulary and the annotator
 * - `artifact`: JSON Lines batch artifacts
 * - `database`: The batch ledger
 * - `pipeline`: Stage trait, stage implementations and the runner
 * - `scheduler`: Execution context, resource monitor and worker pool
 * - `output`: Output assembler and derived ledger
 * - `providers`: Translation service clients
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod artifact;
pub mod corpus;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod negation;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod scheduler;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, StatusReport};
pub use artifact::{ArtifactStore, DerivedRecord, SentenceRecord};
pub use corpus::{Batch, BatchId, PartitionOutcome, Partitioner};
pub use database::{BatchLedger, BatchStatus, LedgerEntry, StatusCounts};
pub use errors::{AppError, LedgerError, TranslationError};
pub use negation::{CueVocabulary, NegationAnnotation, NegationAnnotator};
pub use output::{DerivedLedger, OutputAssembler};
pub use pipeline::{StageKind, StagePipeline};
pub use scheduler::{BatchScheduler, RunSummary};
