/*!
 * Database module for the batch ledger.
 *
 * SQLite persistence for batch status tracking:
 * - Connection management with a single mutex-guarded writer
 * - Versioned schema
 * - The ledger job-queue operations
 */

pub mod connection;
pub mod ledger;
pub mod models;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use ledger::BatchLedger;
pub use models::{BatchStatus, LedgerEntry, StatusCounts};
