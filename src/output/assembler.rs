/*!
 * Output assembly: pairs a source batch with its translations, writes the
 * derived artifact and records it in the derived ledger.
 */

use log::info;
use std::sync::Arc;

use super::derived_ledger::{DerivedLedger, DerivedLedgerEntry};
use crate::artifact::{ArtifactStore, DerivedRecord, SentenceRecord};
use crate::corpus::BatchId;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct OutputAssembler {
    store: ArtifactStore,
    derived_ledger: Arc<DerivedLedger>,
    target_language: String,
}

impl OutputAssembler {
    pub fn new(
        store: ArtifactStore,
        derived_ledger: Arc<DerivedLedger>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            store,
            derived_ledger,
            target_language: target_language.into(),
        }
    }

    /// Derived id for `batch_id` in the configured target language
    pub fn derived_id(&self, batch_id: &BatchId) -> String {
        batch_id.derived(&self.target_language)
    }

    /// Write the derived artifact and append its ledger record.
    ///
    /// `translations[i]` belongs to `sentences[i]`. A length mismatch is
    /// rejected before anything touches the disk.
    pub fn assemble(
        &self,
        batch_id: &BatchId,
        sentences: &[SentenceRecord],
        translations: Vec<String>,
    ) -> Result<DerivedLedgerEntry, AppError> {
        if sentences.len() != translations.len() {
            return Err(AppError::Precondition(format!(
                "{} has {} sentences but {} translations",
                batch_id,
                sentences.len(),
                translations.len()
            )));
        }

        let records: Vec<DerivedRecord> = sentences
            .iter()
            .zip(translations)
            .map(|(sentence, translation)| DerivedRecord {
                id: sentence.id,
                translation,
                word_count: sentence.word_count,
                source_file: sentence.source_file.clone(),
                line_number: sentence.line_number,
            })
            .collect();

        let derived_id = self.derived_id(batch_id);
        let artifact_path = self.store.save_derived(&derived_id, &records)?;

        let entry = DerivedLedgerEntry {
            batch_id: derived_id,
            source_batch_id: batch_id.to_string(),
            artifact_path,
            created_at: chrono::Utc::now().to_rfc3339(),
            phrase_count: records.len(),
            status: "pending".to_string(),
            comment: String::new(),
        };
        self.derived_ledger.append(&entry)?;

        info!("Assembled {} ({} sentences)", entry.batch_id, entry.phrase_count);
        Ok(entry)
    }
}
