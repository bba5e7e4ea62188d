/*!
 * Tests for the output assembler and derived ledger
 */

use std::sync::Arc;
use tempfile::TempDir;

use negbatch::artifact::{ArtifactStore, SentenceRecord};
use negbatch::corpus::BatchId;
use negbatch::errors::AppError;
use negbatch::negation::NegationAnnotator;
use negbatch::output::{DerivedLedger, OutputAssembler};

fn sentences() -> Vec<SentenceRecord> {
    let annotator = NegationAnnotator::default();
    vec![
        SentenceRecord::annotated(11, 1, "No fever.".to_string(), "notes.txt", &annotator),
        SentenceRecord::annotated(12, 2, "Stable vitals.".to_string(), "notes.txt", &annotator),
    ]
}

#[test]
fn test_assemble_withMatchingTranslations_shouldWriteArtifactAndLedger() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path().join("batches"), dir.path().join("translated"));
    let derived = Arc::new(DerivedLedger::new(dir.path().join("meta/derived_ledger.jsonl")));
    let assembler = OutputAssembler::new(store.clone(), Arc::clone(&derived), "fr");
    let batch_id = BatchId::new("notes.txt", 11, 12).unwrap();

    let entry = assembler
        .assemble(
            &batch_id,
            &sentences(),
            vec!["Pas de fièvre.".to_string(), "Constantes stables.".to_string()],
        )
        .unwrap();

    assert_eq!(entry.batch_id, "fr_notes_000011_000012");
    assert_eq!(entry.source_batch_id, "notes_000011_000012");
    assert_eq!(entry.phrase_count, 2);
    assert_eq!(entry.status, "pending");

    let records = store.load_derived(&entry.batch_id).unwrap();
    assert_eq!(records[0].id, 11);
    assert_eq!(records[0].translation, "Pas de fièvre.");
    assert_eq!(records[1].line_number, 2);
    assert_eq!(records[1].word_count, 2);

    assert_eq!(derived.entries().unwrap(), vec![entry]);
}

#[test]
fn test_assemble_withLengthMismatch_shouldFailAndWriteNothing() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path().join("batches"), dir.path().join("translated"));
    let derived = Arc::new(DerivedLedger::new(dir.path().join("meta/derived_ledger.jsonl")));
    let assembler = OutputAssembler::new(store.clone(), Arc::clone(&derived), "fr");
    let batch_id = BatchId::new("notes.txt", 11, 12).unwrap();

    let err = assembler
        .assemble(&batch_id, &sentences(), vec!["Pas de fièvre.".to_string()])
        .unwrap_err();

    assert!(matches!(err, AppError::Precondition(_)));
    assert!(store.list_derived().unwrap().is_empty());
    assert!(derived.entries().unwrap().is_empty());
}

#[test]
fn test_assemble_twice_shouldAppendTwoLedgerRecords() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path().join("batches"), dir.path().join("translated"));
    let derived = Arc::new(DerivedLedger::new(dir.path().join("meta/derived_ledger.jsonl")));
    let assembler = OutputAssembler::new(store.clone(), Arc::clone(&derived), "de");
    let batch_id = BatchId::new("notes.txt", 11, 12).unwrap();

    for _ in 0..2 {
        assembler
            .assemble(&batch_id, &sentences(), vec![String::new(), String::new()])
            .unwrap();
    }

    assert_eq!(derived.entries().unwrap().len(), 2);
    assert_eq!(store.list_derived().unwrap().len(), 1);
}
