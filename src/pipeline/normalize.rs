/*!
 * Normalize stage: trims sentences, rejects empty ones and checks that the
 * artifact still matches the id range encoded in its batch id.
 *
 * Annotations are always recomputed from the text, so a record whose stored
 * cues, counts or scope offsets disagree with its text leaves this stage
 * repaired.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::stage::{Stage, StageKind};
use crate::artifact::{ArtifactStore, SentenceRecord};
use crate::corpus::BatchId;
use crate::errors::AppError;
use crate::negation::NegationAnnotator;

pub struct NormalizeStage {
    store: ArtifactStore,
    annotator: Arc<NegationAnnotator>,
}

impl NormalizeStage {
    pub fn new(store: ArtifactStore, annotator: Arc<NegationAnnotator>) -> Self {
        Self { store, annotator }
    }

    /// Normalize records in place; returns how many records changed
    pub fn normalize_records(
        &self,
        batch_id: &BatchId,
        records: &mut [SentenceRecord],
    ) -> Result<usize, AppError> {
        let id = batch_id.to_string();

        if records.len() != batch_id.sentence_count() {
            return Err(AppError::artifact(
                &id,
                format!(
                    "expected {} sentences, found {}",
                    batch_id.sentence_count(),
                    records.len()
                ),
            ));
        }

        let mut changed = 0;
        for (offset, record) in records.iter_mut().enumerate() {
            let expected_id = batch_id.start() + offset as u64;
            if record.id != expected_id {
                return Err(AppError::artifact(
                    &id,
                    format!("sentence {} found where {} was expected", record.id, expected_id),
                ));
            }

            let trimmed = record.text.trim();
            if trimmed.is_empty() {
                return Err(AppError::artifact(
                    &id,
                    format!("sentence {} is empty", record.id),
                ));
            }

            let before = record.clone();
            if trimmed.len() != record.text.len() {
                record.text = trimmed.to_string();
            }
            record.reannotate(&self.annotator);

            if *record != before {
                if record.text == before.text {
                    warn!(
                        "[{}] sentence {} had stale annotations, recomputed",
                        id, record.id
                    );
                }
                changed += 1;
            }

            if !record.scope_is_consistent() {
                return Err(AppError::artifact(
                    &id,
                    format!("sentence {} has an inconsistent negation scope", record.id),
                ));
            }
        }

        Ok(changed)
    }
}

#[async_trait]
impl Stage for NormalizeStage {
    fn kind(&self) -> StageKind {
        StageKind::Normalize
    }

    async fn run(&self, batch_id: &BatchId) -> Result<(), AppError> {
        let mut records = self.store.load_batch(batch_id)?;
        let changed = self.normalize_records(batch_id, &mut records)?;

        self.store.save_batch(batch_id, &records)?;

        if changed > 0 {
            info!("Normalized {} sentences in {}", changed, batch_id);
        } else {
            debug!("{} already normalized", batch_id);
        }
        Ok(())
    }
}
