/*!
 * Persisted batch artifacts.
 *
 * Artifacts are JSON Lines files, one record per sentence. Source batches
 * live in `batches_dir/{batch_id}.jsonl`; translated batches live in
 * `translated_dir/{target}_{batch_id}.jsonl`. Every write replaces the whole
 * file atomically, so a stage can be re-run on the same artifact safely.
 */

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::corpus::BatchId;
use crate::corpus::batch_id::ARTIFACT_EXTENSION;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::negation::NegationAnnotator;

/// One annotated source sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceRecord {
    /// Global 1-based sentence id
    pub id: u64,
    /// 1-based position inside the batch
    pub line_number: usize,
    /// Sentence text
    pub text: String,
    pub word_count: usize,
    pub char_count: usize,
    /// Cue words found, in vocabulary order
    pub cue_words: Vec<String>,
    pub has_negation: bool,
    /// Scope text, empty when there is no negation
    pub scope: String,
    pub scope_start: Option<usize>,
    pub scope_end: Option<usize>,
    /// Source corpus file name
    pub source_file: String,
}

impl SentenceRecord {
    /// Build and annotate a record
    pub fn annotated(
        id: u64,
        line_number: usize,
        text: String,
        source_file: &str,
        annotator: &NegationAnnotator,
    ) -> Self {
        let mut record = Self {
            id,
            line_number,
            text,
            word_count: 0,
            char_count: 0,
            cue_words: Vec::new(),
            has_negation: false,
            scope: String::new(),
            scope_start: None,
            scope_end: None,
            source_file: source_file.to_string(),
        };
        record.reannotate(annotator);
        record
    }

    /// Recompute every derived field from `text`
    pub fn reannotate(&mut self, annotator: &NegationAnnotator) {
        let annotation = annotator.annotate(&self.text);

        self.word_count = annotation.word_count;
        self.char_count = annotation.char_count;
        self.has_negation = annotation.has_negation();
        self.cue_words = annotation.cue_words;

        match annotation.scope {
            Some(scope) => {
                self.scope_start = Some(scope.start);
                self.scope_end = Some(scope.end);
                self.scope = scope.text;
            }
            None => {
                self.scope_start = None;
                self.scope_end = None;
                self.scope = String::new();
            }
        }
    }

    /// Check the scope offsets against the text
    pub fn scope_is_consistent(&self) -> bool {
        match (self.scope_start, self.scope_end) {
            (None, None) => !self.has_negation && self.scope.is_empty(),
            (Some(start), Some(end)) => {
                self.has_negation && start <= end && end == self.text.chars().count()
            }
            _ => false,
        }
    }
}

/// One translated sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    /// Global sentence id of the source sentence
    pub id: u64,
    /// Translated text, empty when translation failed
    pub translation: String,
    /// Word count of the source sentence
    pub word_count: usize,
    pub source_file: String,
    pub line_number: usize,
}

/// Reads and writes batch artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    batches_dir: PathBuf,
    translated_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(batches_dir: impl Into<PathBuf>, translated_dir: impl Into<PathBuf>) -> Self {
        Self {
            batches_dir: batches_dir.into(),
            translated_dir: translated_dir.into(),
        }
    }

    pub fn batch_path(&self, batch_id: &BatchId) -> PathBuf {
        self.batches_dir.join(batch_id.file_name())
    }

    pub fn derived_path(&self, derived_id: &str) -> PathBuf {
        self.translated_dir
            .join(format!("{}.{}", derived_id, ARTIFACT_EXTENSION))
    }

    /// Existing source batch artifacts, sorted by name
    pub fn list_batches(&self) -> Result<Vec<PathBuf>, AppError> {
        Ok(FileManager::list_files(&self.batches_dir, &[ARTIFACT_EXTENSION])?)
    }

    /// Existing translated artifacts, sorted by name
    pub fn list_derived(&self) -> Result<Vec<PathBuf>, AppError> {
        Ok(FileManager::list_files(&self.translated_dir, &[ARTIFACT_EXTENSION])?)
    }

    pub fn load_batch(&self, batch_id: &BatchId) -> Result<Vec<SentenceRecord>, AppError> {
        read_records(&self.batch_path(batch_id), &batch_id.to_string())
    }

    pub fn save_batch(&self, batch_id: &BatchId, records: &[SentenceRecord]) -> Result<(), AppError> {
        write_records(&self.batch_path(batch_id), &batch_id.to_string(), records)
    }

    pub fn load_derived(&self, derived_id: &str) -> Result<Vec<DerivedRecord>, AppError> {
        read_records(&self.derived_path(derived_id), derived_id)
    }

    pub fn save_derived(&self, derived_id: &str, records: &[DerivedRecord]) -> Result<PathBuf, AppError> {
        let path = self.derived_path(derived_id);
        write_records(&path, derived_id, records)?;
        Ok(path)
    }

    /// Delete every source and translated artifact; returns how many went
    pub fn clear(&self) -> Result<usize, AppError> {
        let mut removed = FileManager::remove_files(&self.list_batches()?)?;
        removed += FileManager::remove_files(&self.list_derived()?)?;
        Ok(removed)
    }
}

fn read_records<T: DeserializeOwned>(path: &Path, artifact_id: &str) -> Result<Vec<T>, AppError> {
    if !FileManager::file_exists(path) {
        return Err(AppError::artifact(artifact_id, format!("artifact not found: {:?}", path)));
    }

    let content = FileManager::read_to_string(path)
        .map_err(|e| AppError::artifact(artifact_id, format!("{:#}", e)))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                AppError::artifact(artifact_id, format!("corrupt record on line {}: {}", index + 1, e))
            })
        })
        .collect()
}

fn write_records<T: Serialize>(path: &Path, artifact_id: &str, records: &[T]) -> Result<(), AppError> {
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buffer, record)?;
        buffer.push(b'\n');
    }

    FileManager::write_atomic(path, &buffer)
        .map_err(|e| AppError::artifact(artifact_id, format!("{:#}", e)))?;

    debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
