/*!
 * Integration tests for the full partition and run lifecycle
 */

use anyhow::Result;
use std::sync::Arc;

use negbatch::corpus::{BatchId, PartitionOutcome};
use negbatch::database::BatchStatus;
use negbatch::pipeline::BatchAnalysis;
use negbatch::providers::MockTranslator;

use crate::common::{SAMPLE_SENTENCES, TestWorkspace};

#[tokio::test]
async fn test_run_withThreeSentences_shouldFinishBothBatches() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES[..3], 2)?;
    let translator = MockTranslator::working();
    let controller = workspace.controller(Arc::new(translator.clone()))?;

    let summary = controller.run(false).await?;
    assert_eq!(summary.scheduled, 2);
    assert_eq!(summary.done, 2);
    assert_eq!(summary.failed, 0);

    let entries = controller.ledger().entries().await?;
    let ranges: Vec<(u64, u64)> = entries.iter().map(|e| (e.start_id, e.end_id)).collect();
    assert_eq!(ranges, vec![(1, 2), (3, 3)]);
    assert!(entries.iter().all(|e| e.status == BatchStatus::Done));

    // sub-batch size 2: one request for the first batch, one for the second
    assert_eq!(translator.call_count(), 2);

    let derived = controller.store().load_derived("fr_corpus_000001_000002")?;
    assert_eq!(derived.len(), 2);
    assert_eq!(
        derived[0].translation,
        format!("[TRANSLATED] {}", SAMPLE_SENTENCES[0])
    );
    assert_eq!(controller.derived_ledger().entries()?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_shouldWriteAnalysisReports() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 5)?;
    let controller = workspace.controller(Arc::new(MockTranslator::echo()))?;

    controller.run(false).await?;

    let report_path = workspace
        .config
        .paths
        .analysis_dir
        .join("analysis_corpus_000001_000005.json");
    let analysis: BatchAnalysis = serde_json::from_str(&std::fs::read_to_string(report_path)?)?;
    assert_eq!(analysis.sentences, 5);
    assert_eq!(analysis.negated_sentences, 3);
    assert_eq!(analysis.translated_sentences, Some(5));
    assert_eq!(analysis.empty_translations, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_run_calledAgain_shouldNotReprocessDoneBatches() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 2)?;
    let translator = MockTranslator::working();
    let controller = workspace.controller(Arc::new(translator.clone()))?;

    controller.run(false).await?;
    let calls = translator.call_count();

    let second = controller.run(false).await?;
    assert_eq!(second.scheduled, 0);
    assert_eq!(translator.call_count(), calls);

    let status = controller.status().await?;
    assert_eq!(status.counts.done, 3);
    assert_eq!(status.counts.remaining(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withForceRebuild_shouldResetLedgerAndArtifacts() -> Result<()> {
    let mut workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 2)?;
    workspace.controller(Arc::new(MockTranslator::echo()))?.run(false).await?;

    let stale_report = workspace
        .config
        .paths
        .analysis_dir
        .join("analysis_corpus_000001_000002.json");
    assert!(stale_report.exists());

    workspace.config.partition.batch_size = 5;
    let controller = workspace.controller(Arc::new(MockTranslator::echo()))?;

    let outcome = controller.partition(true).await?;
    let ids: Vec<String> = outcome.generated().iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, vec!["corpus_000001_000005"]);

    let status = controller.status().await?;
    assert_eq!(status.counts.pending, 1);
    assert_eq!(status.counts.total(), 1);
    assert_eq!(status.derived_batches, 0);
    assert!(controller.store().list_derived()?.is_empty());
    assert!(!stale_report.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withArtifactsMissingLedgerRows_shouldScheduleThem() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 2)?;
    let controller = workspace.controller(Arc::new(MockTranslator::echo()))?;

    controller.partition(false).await?;
    controller.ledger().clear().await?;

    let summary = controller.run(false).await?;
    assert_eq!(summary.scheduled, 3);
    assert_eq!(summary.done, 3);

    let entries = controller.ledger().entries().await?;
    let counts: Vec<usize> = entries.iter().map(|e| e.phrase_count).collect();
    assert_eq!(counts, vec![2, 2, 1]);
    Ok(())
}

#[tokio::test]
async fn test_partition_withExistingArtifacts_shouldReuseThem() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 2)?;
    let controller = workspace.controller(Arc::new(MockTranslator::echo()))?;

    assert!(matches!(
        controller.partition(false).await?,
        PartitionOutcome::Generated(_)
    ));
    assert_eq!(
        controller.partition(false).await?,
        PartitionOutcome::AlreadyPresent { artifacts: 3 }
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingSubBatch_shouldBlankOnlyThatSubBatch() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 5)?;
    let controller = workspace.controller(Arc::new(MockTranslator::fail_on_call(2)))?;

    let summary = controller.run(false).await?;
    assert_eq!(summary.done, 1);

    let derived = controller.store().load_derived("fr_corpus_000001_000005")?;
    let blanks: Vec<bool> = derived.iter().map(|r| r.translation.is_empty()).collect();
    assert_eq!(blanks, vec![false, false, true, true, false]);
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingCorpus_shouldFailBeforeScheduling() -> Result<()> {
    let workspace = TestWorkspace::with_corpus(&SAMPLE_SENTENCES, 2)?;
    std::fs::remove_file(workspace.config.paths.raw_data_dir.join("corpus.txt"))?;
    let controller = workspace.controller(Arc::new(MockTranslator::echo()))?;

    let err = controller.run(false).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(controller.status().await?.counts.total(), 0);
    Ok(())
}

#[test]
fn test_batchId_shouldRoundTripThroughArtifactName() {
    let id = BatchId::new("corpus.txt", 101, 200).unwrap();
    assert_eq!(BatchId::from_file_name(id.file_name()).unwrap(), id);
}
