/*!
 * Postprocess stage: collapses runs of whitespace in translated text and
 * trims both ends.
 */

use async_trait::async_trait;
use log::debug;

use super::stage::{Stage, StageKind};
use crate::artifact::ArtifactStore;
use crate::corpus::BatchId;
use crate::errors::AppError;

pub struct PostprocessStage {
    store: ArtifactStore,
    target_language: String,
}

impl PostprocessStage {
    pub fn new(store: ArtifactStore, target_language: impl Into<String>) -> Self {
        Self {
            store,
            target_language: target_language.into(),
        }
    }
}

/// Single-space a translation
pub fn clean_translation(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl Stage for PostprocessStage {
    fn kind(&self) -> StageKind {
        StageKind::Postprocess
    }

    async fn run(&self, batch_id: &BatchId) -> Result<(), AppError> {
        let derived_id = batch_id.derived(&self.target_language);
        let mut records = self.store.load_derived(&derived_id)?;

        let mut changed = 0;
        for record in &mut records {
            let cleaned = clean_translation(&record.translation);
            if cleaned != record.translation {
                record.translation = cleaned;
                changed += 1;
            }
        }

        self.store.save_derived(&derived_id, &records)?;
        debug!("Postprocessed {} ({} translations cleaned)", derived_id, changed);
        Ok(())
    }
}
