use log::{info, warn};
use std::fmt;
use std::sync::Arc;

use crate::app_config::Config;
use crate::artifact::ArtifactStore;
use crate::corpus::{PartitionOutcome, Partitioner};
use crate::database::{BatchLedger, BatchStatus, LedgerEntry, StatusCounts};
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::negation::{CueVocabulary, NegationAnnotator};
use crate::output::{DerivedLedger, OutputAssembler};
use crate::pipeline::{AnalyzeStage, NormalizeStage, PostprocessStage, StagePipeline, TranslateStage};
use crate::providers::{HttpTranslator, MockTranslator, Translator};
use crate::scheduler::{BatchScheduler, ExecutionContext, ResourceMonitor, RunSummary, SchedulerOptions};

// @module: Application controller wiring the pipeline components

/// Ledger overview for the `status` command
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub counts: StatusCounts,
    /// Rows in error, with their last comment
    pub failed: Vec<LedgerEntry>,
    /// Records in the derived ledger
    pub derived_batches: usize,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.counts)?;
        writeln!(f, "Derived batches assembled: {}", self.derived_batches)?;
        for entry in &self.failed {
            writeln!(f, "  error {}: {}", entry.batch_id, entry.comment)?;
        }
        Ok(())
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    context: ExecutionContext,
    store: ArtifactStore,
    ledger: BatchLedger,
    derived_ledger: Arc<DerivedLedger>,
    annotator: Arc<NegationAnnotator>,
    translator: Arc<dyn Translator>,
    monitor: Arc<ResourceMonitor>,
}

impl Controller {
    // @method: Create a controller for the given configuration.
    // `dry_run` swaps the HTTP translator for an echoing mock.
    pub fn with_config(config: Config, dry_run: bool) -> Result<Self, AppError> {
        config.validate()?;
        let context = ExecutionContext::detect(config.translation.device);

        let translator: Arc<dyn Translator> = if dry_run {
            info!("Dry run: translations echo the source text");
            Arc::new(MockTranslator::echo())
        } else {
            Arc::new(HttpTranslator::new(
                &config.translation,
                &config.source_language,
                &config.target_language,
            )?)
        };

        Self::with_parts(config, translator, context)
    }

    /// Create a controller around an explicit translator and execution context
    pub fn with_parts(
        config: Config,
        translator: Arc<dyn Translator>,
        context: ExecutionContext,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let paths = &config.paths;
        for dir in [
            &paths.batches_dir,
            &paths.translated_dir,
            &paths.meta_dir,
            &paths.analysis_dir,
        ] {
            FileManager::ensure_dir(dir)
                .map_err(|e| AppError::Configuration(format!("{:#}", e)))?;
        }

        let ledger = BatchLedger::open(paths.ledger_path())?;
        let store = ArtifactStore::new(&paths.batches_dir, &paths.translated_dir);
        let derived_ledger = Arc::new(DerivedLedger::new(paths.derived_ledger_path()));
        let vocabulary = CueVocabulary::with_extra(&config.negation.extra_cues);
        let annotator = Arc::new(NegationAnnotator::new(vocabulary));
        let monitor = Arc::new(ResourceMonitor::new(
            config.monitoring.clone(),
            context.has_accelerator(),
        ));

        Ok(Self {
            config,
            context,
            store,
            ledger,
            derived_ledger,
            annotator,
            translator,
            monitor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &BatchLedger {
        &self.ledger
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn derived_ledger(&self) -> &DerivedLedger {
        &self.derived_ledger
    }

    /// Generate batches (a no-op when artifacts exist, unless forced)
    pub async fn partition(&self, force_rebuild: bool) -> Result<PartitionOutcome, AppError> {
        let partitioner = Partitioner::new(
            &self.config.paths.raw_data_dir,
            self.config.partition.clone(),
            Arc::clone(&self.annotator),
            self.store.clone(),
            self.ledger.clone(),
            Arc::clone(&self.derived_ledger),
        )?
        .with_reports_dir(&self.config.paths.analysis_dir);
        partitioner.partition(force_rebuild).await
    }

    /// Partition, then process every pending batch
    pub async fn run(&self, force_rebuild: bool) -> Result<RunSummary, AppError> {
        match self.partition(force_rebuild).await? {
            PartitionOutcome::Generated(batches) => {
                info!("{} batches generated", batches.len())
            }
            PartitionOutcome::AlreadyPresent { artifacts } => {
                info!("Reusing {} existing batches", artifacts)
            }
        }

        let scheduler = BatchScheduler::new(
            self.ledger.clone(),
            Arc::new(self.build_pipeline()),
            Arc::clone(&self.monitor),
            self.context,
            SchedulerOptions {
                parallel: self.config.scheduler.parallel,
                max_workers: self.config.scheduler.max_workers,
                stop_after: self.config.scheduler.stop_after,
                max_batches: self.config.partition.max_batches,
            },
        );

        let summary = scheduler.run().await?;
        if summary.failed > 0 {
            warn!(
                "{} batch(es) ended in error; see `status` for details",
                summary.failed
            );
        }
        Ok(summary)
    }

    /// Current ledger state
    pub async fn status(&self) -> Result<StatusReport, AppError> {
        let counts = self.ledger.status_counts().await?;
        let failed = self
            .ledger
            .entries()
            .await?
            .into_iter()
            .filter(|entry| entry.status == BatchStatus::Error)
            .collect();
        let derived_batches = self.derived_ledger.entries()?.len();

        Ok(StatusReport {
            counts,
            failed,
            derived_batches,
        })
    }

    /// Stage pipeline for this configuration
    pub fn build_pipeline(&self) -> StagePipeline {
        let target = &self.config.target_language;
        let precision = self
            .context
            .effective_precision(self.config.translation.precision);

        let assembler = Arc::new(OutputAssembler::new(
            self.store.clone(),
            Arc::clone(&self.derived_ledger),
            target.clone(),
        ));

        let mut pipeline = StagePipeline::new()
            .with_stage(Arc::new(NormalizeStage::new(
                self.store.clone(),
                Arc::clone(&self.annotator),
            )))
            .with_stage(Arc::new(TranslateStage::new(
                self.store.clone(),
                Arc::clone(&self.translator),
                assembler,
                Arc::clone(&self.monitor),
                self.config.translation.sub_batch_size,
                precision,
            )));

        if self.config.stages.postprocess {
            pipeline = pipeline.with_stage(Arc::new(PostprocessStage::new(
                self.store.clone(),
                target.clone(),
            )));
        }
        if self.config.stages.analyze {
            pipeline = pipeline.with_stage(Arc::new(AnalyzeStage::new(
                self.store.clone(),
                &self.config.paths.analysis_dir,
                target.clone(),
            )));
        }

        pipeline
    }
}
