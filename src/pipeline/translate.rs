/*!
 * Translate stage.
 *
 * Sends the batch to the translator in sub-batches. A failed sub-batch is
 * logged and replaced by empty strings so the rest of the batch still
 * completes; the assembled output always has one translation per sentence.
 */

use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;

use super::stage::{Stage, StageKind};
use crate::app_config::Precision;
use crate::artifact::ArtifactStore;
use crate::corpus::BatchId;
use crate::errors::{AppError, TranslationError};
use crate::output::OutputAssembler;
use crate::providers::Translator;
use crate::scheduler::ResourceMonitor;

pub struct TranslateStage {
    store: ArtifactStore,
    translator: Arc<dyn Translator>,
    assembler: Arc<OutputAssembler>,
    monitor: Arc<ResourceMonitor>,
    sub_batch_size: usize,
    precision: Precision,
}

/// Per-batch translation tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationTally {
    pub sub_batches: usize,
    pub failed_sub_batches: usize,
    pub empty_sentences: usize,
}

impl TranslateStage {
    pub fn new(
        store: ArtifactStore,
        translator: Arc<dyn Translator>,
        assembler: Arc<OutputAssembler>,
        monitor: Arc<ResourceMonitor>,
        sub_batch_size: usize,
        precision: Precision,
    ) -> Self {
        Self {
            store,
            translator,
            assembler,
            monitor,
            sub_batch_size: sub_batch_size.max(1),
            precision,
        }
    }

    /// Translate `texts`, substituting empty strings for failed sub-batches
    pub async fn translate_all(
        &self,
        batch_id: &BatchId,
        texts: &[String],
    ) -> (Vec<String>, TranslationTally) {
        let mut translations = Vec::with_capacity(texts.len());
        let mut tally = TranslationTally::default();

        for (index, chunk) in texts.chunks(self.sub_batch_size).enumerate() {
            tally.sub_batches += 1;
            let label = format!("{} sub-batch {}", batch_id, index + 1);

            if self.monitor.is_due(index) {
                self.monitor.check_resources(&label).await;
            }

            let result = match self.translator.translate(chunk, self.precision).await {
                Ok(out) if out.len() != chunk.len() => Err(TranslationError::LengthMismatch {
                    expected: chunk.len(),
                    actual: out.len(),
                }),
                other => other,
            };

            match result {
                Ok(out) => translations.extend(out),
                Err(e) => {
                    match &e {
                        TranslationError::ResourceExhausted(_) => {
                            error!("[{}] resource exhaustion, sub-batch left untranslated: {}", label, e);
                        }
                        _ => warn!("[{}] translation failed, sub-batch left untranslated: {}", label, e),
                    }
                    tally.failed_sub_batches += 1;
                    tally.empty_sentences += chunk.len();
                    translations.extend(std::iter::repeat_n(String::new(), chunk.len()));
                }
            }
        }

        (translations, tally)
    }
}

#[async_trait]
impl Stage for TranslateStage {
    fn kind(&self) -> StageKind {
        StageKind::Translate
    }

    async fn run(&self, batch_id: &BatchId) -> Result<(), AppError> {
        let records = self.store.load_batch(batch_id)?;
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();

        let (translations, tally) = self.translate_all(batch_id, &texts).await;

        self.assembler.assemble(batch_id, &records, translations)?;

        if tally.failed_sub_batches > 0 {
            warn!(
                "{}: {}/{} sub-batches failed with {}, {} sentences left empty",
                batch_id,
                tally.failed_sub_batches,
                tally.sub_batches,
                self.translator.name(),
                tally.empty_sentences
            );
        } else {
            info!(
                "Translated {} ({} sentences, {} sub-batches)",
                batch_id,
                texts.len(),
                tally.sub_batches
            );
        }
        Ok(())
    }
}
