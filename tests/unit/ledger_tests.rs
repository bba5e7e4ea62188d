/*!
 * Tests for the batch ledger
 */

use negbatch::corpus::BatchId;
use negbatch::database::{BatchLedger, BatchStatus, LedgerEntry};
use negbatch::errors::LedgerError;
use tempfile::TempDir;

fn entry(start: u64, end: u64) -> LedgerEntry {
    let id = BatchId::new("corpus.txt", start, end).unwrap();
    LedgerEntry::pending(&id, "corpus.txt", (end - start + 1) as usize, "batch_size=2", "abc")
}

#[tokio::test]
async fn test_listPending_shouldFollowRegistrationOrderAndSkipTerminal() {
    let ledger = BatchLedger::in_memory().unwrap();
    ledger
        .register_all(vec![entry(1, 2), entry(3, 4), entry(5, 6)])
        .await
        .unwrap();

    ledger
        .transition("corpus_000003_000004", BatchStatus::InProgress, None)
        .await
        .unwrap();
    ledger
        .transition("corpus_000003_000004", BatchStatus::Error, Some("boom".into()))
        .await
        .unwrap();
    ledger
        .transition("corpus_000005_000006", BatchStatus::InProgress, None)
        .await
        .unwrap();

    let pending = ledger.list_pending().await.unwrap();
    assert_eq!(pending, vec!["corpus_000001_000002", "corpus_000005_000006"]);
}

#[tokio::test]
async fn test_transition_fromDone_shouldBeRejected() {
    let ledger = BatchLedger::in_memory().unwrap();
    ledger.register(entry(1, 2)).await.unwrap();

    let id = "corpus_000001_000002";
    ledger.transition(id, BatchStatus::InProgress, None).await.unwrap();
    ledger.transition(id, BatchStatus::Done, None).await.unwrap();

    for next in BatchStatus::ALL {
        let err = ledger.transition(id, next, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }), "{next}");
    }
    assert_eq!(ledger.get(id).await.unwrap().unwrap().status, BatchStatus::Done);
}

#[tokio::test]
async fn test_transition_withUnknownBatch_shouldFail() {
    let ledger = BatchLedger::in_memory().unwrap();
    let err = ledger
        .transition("missing_000001_000001", BatchStatus::InProgress, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownBatch(_)));
}

#[tokio::test]
async fn test_registerAll_withDuplicate_shouldWriteNothing() {
    let ledger = BatchLedger::in_memory().unwrap();
    ledger.register(entry(1, 2)).await.unwrap();

    let result = ledger.register_all(vec![entry(3, 4), entry(1, 2)]).await;
    assert!(result.is_err());
    assert_eq!(ledger.status_counts().await.unwrap().total(), 1);
}

#[tokio::test]
async fn test_open_shouldPersistAcrossHandles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meta/batch_ledger.db");

    {
        let ledger = BatchLedger::open(&path).unwrap();
        ledger.register(entry(1, 2)).await.unwrap();
        ledger
            .transition("corpus_000001_000002", BatchStatus::InProgress, None)
            .await
            .unwrap();
    }

    let reopened = BatchLedger::open(&path).unwrap();
    let row = reopened.get("corpus_000001_000002").await.unwrap().unwrap();
    assert_eq!(row.status, BatchStatus::InProgress);
    assert_eq!(row.start_id, 1);
    assert_eq!(row.end_id, 2);
    assert_eq!(row.parameters, "batch_size=2");

    let counts = reopened.status_counts().await.unwrap();
    assert_eq!(counts.in_progress, 1);
    assert_eq!(counts.remaining(), 1);
}

#[tokio::test]
async fn test_clear_shouldEmptyTheLedger() {
    let ledger = BatchLedger::in_memory().unwrap();
    ledger.register_all(vec![entry(1, 2), entry(3, 3)]).await.unwrap();

    assert_eq!(ledger.clear().await.unwrap(), 2);
    assert!(ledger.entries().await.unwrap().is_empty());
}
