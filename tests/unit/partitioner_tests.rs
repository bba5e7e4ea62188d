/*!
 * Tests for corpus partitioning
 */

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use negbatch::app_config::PartitionConfig;
use negbatch::artifact::ArtifactStore;
use negbatch::corpus::{BatchId, PartitionOutcome, Partitioner, plan_batches};
use negbatch::database::{BatchLedger, BatchStatus, LedgerEntry};
use negbatch::errors::AppError;
use negbatch::negation::NegationAnnotator;
use negbatch::output::DerivedLedger;

use crate::common::{SAMPLE_SENTENCES, write_corpus};

struct Fixture {
    dir: TempDir,
    store: ArtifactStore,
    ledger: BatchLedger,
    derived: Arc<DerivedLedger>,
}

impl Fixture {
    fn new(sentences: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("raw")).unwrap();
        write_corpus(&dir.path().join("raw"), "notes.txt", sentences).unwrap();

        Self {
            store: ArtifactStore::new(dir.path().join("batches"), dir.path().join("translated")),
            ledger: BatchLedger::in_memory().unwrap(),
            derived: Arc::new(DerivedLedger::new(dir.path().join("meta/derived.jsonl"))),
            dir,
        }
    }

    fn partitioner(&self, batch_size: usize, max_batches: Option<usize>) -> Partitioner {
        let config = PartitionConfig {
            batch_size,
            max_batches,
            ..PartitionConfig::default()
        };
        Partitioner::new(
            self.dir.path().join("raw"),
            config,
            Arc::new(NegationAnnotator::default()),
            self.store.clone(),
            self.ledger.clone(),
            Arc::clone(&self.derived),
        )
        .unwrap()
    }
}

#[test]
fn test_planBatches_forManySizes_shouldPartitionExactly() {
    for total in [0usize, 1, 2, 3, 99, 100, 101, 1000] {
        for batch_size in [1usize, 2, 3, 7, 100] {
            let plan = plan_batches(total, batch_size, None);
            let sizes: Vec<u64> = plan.iter().map(|r| r.end() - r.start() + 1).collect();

            assert_eq!(plan.len(), total.div_ceil(batch_size));
            assert_eq!(sizes.iter().sum::<u64>(), total as u64);
            assert!(plan.windows(2).all(|w| *w[1].start() == w[0].end() + 1));
        }
    }
}

#[tokio::test]
async fn test_partition_withThreeSentences_shouldProduceTwoBatches() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES[..3]);

    let outcome = fixture.partitioner(2, None).partition(false).await.unwrap();
    let ids: Vec<String> = outcome.generated().iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, vec!["notes_000001_000002", "notes_000003_000003"]);

    let first = fixture
        .store
        .load_batch(&BatchId::parse("notes_000001_000002").unwrap())
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, 1);
    assert_eq!(first[1].line_number, 2);
    assert!(first[0].has_negation);
    assert!(!first[1].has_negation);

    let entries = fixture.ledger.entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == BatchStatus::Pending));
    assert_eq!(entries[1].phrase_count, 1);
    assert_eq!(entries[0].source_hash, entries[1].source_hash);
}

#[tokio::test]
async fn test_partition_calledTwice_shouldBeIdempotent() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    let partitioner = fixture.partitioner(2, None);

    partitioner.partition(false).await.unwrap();
    let before = fixture.ledger.entries().await.unwrap();

    let outcome = partitioner.partition(false).await.unwrap();
    assert_eq!(outcome, PartitionOutcome::AlreadyPresent { artifacts: 3 });
    assert!(outcome.generated().is_empty());

    let after = fixture.ledger.entries().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_partition_withForceRebuild_shouldRegenerateEverything() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    fixture.partitioner(2, None).partition(false).await.unwrap();
    fixture
        .ledger
        .transition("notes_000001_000002", BatchStatus::InProgress, None)
        .await
        .unwrap();

    let outcome = fixture.partitioner(4, None).partition(true).await.unwrap();
    assert_eq!(outcome.generated().len(), 2);

    let names: Vec<String> = fixture
        .store
        .list_batches()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["notes_000001_000004.jsonl", "notes_000005_000005.jsonl"]);

    let counts = fixture.ledger.status_counts().await.unwrap();
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_partition_withArtifactsButNoLedgerRows_shouldRestoreRows() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    let partitioner = fixture.partitioner(2, None);
    partitioner.partition(false).await.unwrap();
    fixture.ledger.clear().await.unwrap();

    let outcome = partitioner.partition(false).await.unwrap();
    assert_eq!(outcome, PartitionOutcome::AlreadyPresent { artifacts: 3 });

    let entries = fixture.ledger.entries().await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.batch_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["notes_000001_000002", "notes_000003_000004", "notes_000005_000005"]
    );
    assert!(entries.iter().all(|e| e.status == BatchStatus::Pending));
    assert!(entries.iter().all(|e| e.source_file == "notes.txt"));
    assert_eq!((entries[1].start_id, entries[1].end_id), (3, 4));
    assert_eq!(entries[0].phrase_count, 2);
    assert_eq!(entries[2].phrase_count, 1);
}

#[tokio::test]
async fn test_partition_withSomeRowsMissing_shouldKeepExistingStatus() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    let partitioner = fixture.partitioner(2, None);
    partitioner.partition(false).await.unwrap();
    fixture.ledger.clear().await.unwrap();

    let first = BatchId::parse("notes_000001_000002").unwrap();
    fixture
        .ledger
        .register_all(vec![LedgerEntry::pending(&first, "notes.txt", 2, "batch_size=2", "")])
        .await
        .unwrap();
    for status in [BatchStatus::InProgress, BatchStatus::Done] {
        fixture
            .ledger
            .transition("notes_000001_000002", status, None)
            .await
            .unwrap();
    }

    partitioner.partition(false).await.unwrap();

    let counts = fixture.ledger.status_counts().await.unwrap();
    assert_eq!(counts.total(), 3);
    assert_eq!(counts.done, 1);
    assert_eq!(counts.pending, 2);
}

#[tokio::test]
async fn test_partition_withForceRebuild_shouldRemoveAnalysisReports() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    let reports = fixture.dir.path().join("analysis");
    fs::create_dir_all(&reports).unwrap();
    fs::write(reports.join("analysis_notes_000001_000002.json"), "{}").unwrap();
    fs::write(reports.join("overview.json"), "{}").unwrap();

    fixture.partitioner(2, None).partition(false).await.unwrap();
    fixture
        .partitioner(4, None)
        .with_reports_dir(&reports)
        .partition(true)
        .await
        .unwrap();

    assert!(!reports.join("analysis_notes_000001_000002.json").exists());
    assert!(reports.join("overview.json").exists());
}

#[tokio::test]
async fn test_partition_withMaxBatches_shouldStopEarly() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);

    let outcome = fixture.partitioner(2, Some(1)).partition(false).await.unwrap();
    assert_eq!(outcome.generated().len(), 1);
    assert_eq!(fixture.ledger.status_counts().await.unwrap().total(), 1);
}

#[tokio::test]
async fn test_partition_withMissingCorpus_shouldKeepExistingTree() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    fixture.partitioner(2, None).partition(false).await.unwrap();
    fs::remove_file(fixture.dir.path().join("raw/notes.txt")).unwrap();

    let err = fixture.partitioner(2, None).partition(true).await.unwrap_err();
    assert!(matches!(err, AppError::SourceData(_)));
    assert_eq!(fixture.store.list_batches().unwrap().len(), 3);
    assert_eq!(fixture.ledger.status_counts().await.unwrap().total(), 3);
}

#[test]
fn test_new_withZeroBatchSize_shouldFail() {
    let fixture = Fixture::new(&SAMPLE_SENTENCES);
    let result = Partitioner::new(
        fixture.dir.path().join("raw"),
        PartitionConfig {
            batch_size: 0,
            ..PartitionConfig::default()
        },
        Arc::new(NegationAnnotator::default()),
        fixture.store.clone(),
        fixture.ledger.clone(),
        Arc::clone(&fixture.derived),
    );
    assert!(matches!(result, Err(AppError::Configuration(_))));
}
