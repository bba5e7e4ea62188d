/*!
 * Translated output: derived artifacts and their append-only ledger.
 */

pub mod assembler;
pub mod derived_ledger;

pub use assembler::OutputAssembler;
pub use derived_ledger::{DerivedLedger, DerivedLedgerEntry};
