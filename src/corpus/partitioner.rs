/*!
 * Corpus partitioning.
 *
 * Splits the source corpus into contiguous fixed-size windows, annotates
 * every sentence, writes one artifact per window and registers one pending
 * ledger row per window. Planning is a pure function so the window layout
 * can be checked without touching the filesystem.
 */

use log::{debug, info, warn};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use super::batch_id::BatchId;
use super::source::SourceCorpus;
use crate::app_config::PartitionConfig;
use crate::artifact::{ArtifactStore, SentenceRecord};
use crate::database::{BatchLedger, LedgerEntry};
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::negation::NegationAnnotator;
use crate::output::DerivedLedger;
use crate::pipeline::clear_reports;

/// Inclusive 1-based id ranges for `total` rows cut into windows of
/// `batch_size`, keeping at most `max_batches` windows. The last window may
/// be shorter. A zero `batch_size` plans nothing.
pub fn plan_batches(
    total: usize,
    batch_size: usize,
    max_batches: Option<usize>,
) -> Vec<RangeInclusive<u64>> {
    if batch_size == 0 {
        return Vec::new();
    }

    let windows = (1..=total)
        .step_by(batch_size)
        .map(|start| {
            let end = (start + batch_size - 1).min(total);
            start as u64..=end as u64
        });

    match max_batches {
        Some(cap) => windows.take(cap).collect(),
        None => windows.collect(),
    }
}

/// One generated batch
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: BatchId,
    pub source_file: String,
    pub sentence_count: usize,
}

/// Result of a partitioning request
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    /// Artifacts were already on disk and nothing was written
    AlreadyPresent { artifacts: usize },
    /// Fresh batches were written and registered
    Generated(Vec<Batch>),
}

impl PartitionOutcome {
    pub fn generated(&self) -> &[Batch] {
        match self {
            PartitionOutcome::Generated(batches) => batches,
            PartitionOutcome::AlreadyPresent { .. } => &[],
        }
    }
}

/// Writes batch artifacts and their ledger rows
#[derive(Debug)]
pub struct Partitioner {
    raw_data_dir: PathBuf,
    config: PartitionConfig,
    annotator: Arc<NegationAnnotator>,
    store: ArtifactStore,
    ledger: BatchLedger,
    derived_ledger: Arc<DerivedLedger>,
    reports_dir: Option<PathBuf>,
}

impl Partitioner {
    pub fn new(
        raw_data_dir: impl Into<PathBuf>,
        config: PartitionConfig,
        annotator: Arc<NegationAnnotator>,
        store: ArtifactStore,
        ledger: BatchLedger,
        derived_ledger: Arc<DerivedLedger>,
    ) -> Result<Self, AppError> {
        if config.batch_size == 0 {
            return Err(AppError::Configuration(
                "partition.batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            raw_data_dir: raw_data_dir.into(),
            config,
            annotator,
            store,
            ledger,
            derived_ledger,
            reports_dir: None,
        })
    }

    /// Also delete per-batch analysis reports in `dir` on a forced rebuild
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Generate batches unless artifacts already exist.
    ///
    /// With `force_rebuild` every artifact, derived artifact, derived ledger
    /// record, ledger row and analysis report is deleted first. Otherwise
    /// artifacts missing a ledger row get a pending row rebuilt from their
    /// file name. The rebuild is not atomic and
    /// must not run while a scheduler is reading the same workspace.
    pub async fn partition(&self, force_rebuild: bool) -> Result<PartitionOutcome, AppError> {
        let existing = self.store.list_batches()?;

        if !existing.is_empty() && !force_rebuild {
            let restored = self.reconcile(&existing).await?;
            if restored > 0 {
                warn!(
                    "Registered {} batch artifacts that had no ledger row",
                    restored
                );
            }
            info!(
                "{} batch artifacts already present, skipping generation",
                existing.len()
            );
            return Ok(PartitionOutcome::AlreadyPresent {
                artifacts: existing.len(),
            });
        }

        // Load before deleting anything so a missing corpus leaves the old tree intact
        let corpus = SourceCorpus::load(&self.raw_data_dir, &self.config.text_column)?;
        let source_hash = FileManager::sha256_file(&corpus.path)
            .map_err(|e| AppError::SourceData(format!("{:#}", e)))?;

        if force_rebuild {
            self.clear_all().await?;
        } else {
            let stale = self.ledger.clear().await?;
            if stale > 0 {
                warn!("Dropped {} ledger rows without artifacts", stale);
            }
        }

        let plan = plan_batches(
            corpus.rows.len(),
            self.config.batch_size,
            self.config.max_batches,
        );
        let parameters = format!("batch_size={}", self.config.batch_size);

        let mut batches = Vec::with_capacity(plan.len());
        let mut entries = Vec::with_capacity(plan.len());

        for range in plan {
            let id = BatchId::new(&corpus.file_name, *range.start(), *range.end())?;
            let records = self.build_records(&corpus, &range);

            self.store.save_batch(&id, &records)?;
            entries.push(LedgerEntry::pending(
                &id,
                &corpus.file_name,
                records.len(),
                &parameters,
                &source_hash,
            ));

            info!("Generated batch {} ({} sentences)", id, records.len());
            batches.push(Batch {
                id,
                source_file: corpus.file_name.clone(),
                sentence_count: records.len(),
            });
        }

        self.ledger.register_all(entries).await?;

        let written: usize = batches.iter().map(|b| b.sentence_count).sum();
        info!(
            "Partitioned {} of {} sentences into {} batches",
            written,
            corpus.rows.len(),
            batches.len()
        );
        Ok(PartitionOutcome::Generated(batches))
    }

    fn build_records(
        &self,
        corpus: &SourceCorpus,
        range: &RangeInclusive<u64>,
    ) -> Vec<SentenceRecord> {
        range
            .clone()
            .enumerate()
            .map(|(offset, id)| {
                let text = corpus.rows[(id - 1) as usize].clone();
                SentenceRecord::annotated(id, offset + 1, text, &corpus.file_name, &self.annotator)
            })
            .collect()
    }

    /// Register a pending row for every artifact the ledger does not know.
    /// Covers a crash between writing artifacts and registering them.
    async fn reconcile(&self, artifacts: &[PathBuf]) -> Result<usize, AppError> {
        let known: HashSet<String> = self
            .ledger
            .entries()
            .await?
            .into_iter()
            .map(|entry| entry.batch_id)
            .collect();

        let parameters = format!("batch_size={}", self.config.batch_size);
        let mut missing = Vec::new();

        for path in artifacts {
            let id = match BatchId::from_file_name(path) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Ignoring {:?}: {}", path, e);
                    continue;
                }
            };
            if known.contains(&id.to_string()) {
                continue;
            }

            let records = self.store.load_batch(&id)?;
            let source_file = records
                .first()
                .map(|r| r.source_file.clone())
                .unwrap_or_else(|| id.stem().to_string());

            missing.push(LedgerEntry::pending(
                &id,
                &source_file,
                records.len(),
                &parameters,
                "",
            ));
        }

        for entry in &missing {
            debug!("Restoring ledger row for {}", entry.batch_id);
        }

        Ok(self.ledger.register_all(missing).await?)
    }

    async fn clear_all(&self) -> Result<(), AppError> {
        let artifacts = self.store.clear()?;
        self.derived_ledger.clear()?;
        let rows = self.ledger.clear().await?;
        let reports = match &self.reports_dir {
            Some(dir) => clear_reports(dir)?,
            None => 0,
        };
        info!(
            "Force rebuild: removed {} artifacts, {} ledger rows and {} reports",
            artifacts, rows, reports
        );
        Ok(())
    }
}
