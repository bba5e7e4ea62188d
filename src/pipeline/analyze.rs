/*!
 * Analyze stage: per-batch statistics written to
 * `{analysis_dir}/analysis_{batch_id}.json`.
 */

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::stage::{Stage, StageKind};
use crate::artifact::{ArtifactStore, DerivedRecord, SentenceRecord};
use crate::corpus::BatchId;
use crate::errors::AppError;
use crate::file_utils::FileManager;

/// Statistics for one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub batch_id: String,
    pub sentences: usize,
    pub negated_sentences: usize,
    /// Share of negated sentences, 0.0 to 1.0
    pub negation_rate: f64,
    pub mean_words: f64,
    pub mean_chars: f64,
    /// Sentences containing each cue
    pub cue_frequencies: BTreeMap<String, usize>,
    /// Absent when no derived artifact exists yet
    pub translated_sentences: Option<usize>,
    pub empty_translations: Option<usize>,
    pub created_at: String,
}

impl BatchAnalysis {
    pub fn compute(
        batch_id: &BatchId,
        sentences: &[SentenceRecord],
        derived: Option<&[DerivedRecord]>,
    ) -> Self {
        let count = sentences.len();
        let negated = sentences.iter().filter(|s| s.has_negation).count();

        let mut cue_frequencies = BTreeMap::new();
        for cue in sentences.iter().flat_map(|s| &s.cue_words) {
            *cue_frequencies.entry(cue.clone()).or_insert(0) += 1;
        }

        let mean = |total: usize| {
            if count == 0 {
                0.0
            } else {
                total as f64 / count as f64
            }
        };

        Self {
            batch_id: batch_id.to_string(),
            sentences: count,
            negated_sentences: negated,
            negation_rate: mean(negated),
            mean_words: mean(sentences.iter().map(|s| s.word_count).sum()),
            mean_chars: mean(sentences.iter().map(|s| s.char_count).sum()),
            cue_frequencies,
            translated_sentences: derived.map(|d| d.len()),
            empty_translations: derived
                .map(|d| d.iter().filter(|r| r.translation.trim().is_empty()).count()),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

const REPORT_PREFIX: &str = "analysis_";

/// Delete every per-batch report in `dir`, returning how many were removed.
/// Other files in the directory are left alone.
pub fn clear_reports(dir: &Path) -> Result<usize, AppError> {
    let reports: Vec<PathBuf> = FileManager::list_files(dir, &["json"])?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(REPORT_PREFIX))
                .unwrap_or(false)
        })
        .collect();
    Ok(FileManager::remove_files(&reports)?)
}

pub struct AnalyzeStage {
    store: ArtifactStore,
    analysis_dir: PathBuf,
    target_language: String,
}

impl AnalyzeStage {
    pub fn new(
        store: ArtifactStore,
        analysis_dir: impl Into<PathBuf>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            store,
            analysis_dir: analysis_dir.into(),
            target_language: target_language.into(),
        }
    }

    pub fn report_path(&self, batch_id: &BatchId) -> PathBuf {
        self.analysis_dir.join(format!("{}{}.json", REPORT_PREFIX, batch_id))
    }
}

#[async_trait]
impl Stage for AnalyzeStage {
    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    async fn run(&self, batch_id: &BatchId) -> Result<(), AppError> {
        let sentences = self.store.load_batch(batch_id)?;

        let derived_id = batch_id.derived(&self.target_language);
        let derived = if FileManager::file_exists(self.store.derived_path(&derived_id)) {
            Some(self.store.load_derived(&derived_id)?)
        } else {
            None
        };

        let analysis = BatchAnalysis::compute(batch_id, &sentences, derived.as_deref());
        let json = serde_json::to_vec_pretty(&analysis)?;
        let path = self.report_path(batch_id);
        FileManager::write_atomic(&path, &json)
            .map_err(|e| AppError::artifact(batch_id.to_string(), format!("{:#}", e)))?;

        info!(
            "Analysis of {}: {}/{} negated sentences",
            batch_id, analysis.negated_sentences, analysis.sentences
        );
        Ok(())
    }
}
