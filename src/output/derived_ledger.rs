/*!
 * Append-only ledger of derived (translated) batches.
 *
 * One JSON object per line. Lines are only ever appended; the file is never
 * rewritten, so a reader sees every historical assembly of a batch.
 */

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::file_utils::FileManager;

/// One derived ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedLedgerEntry {
    /// Derived id, `{target}_{source_batch_id}`
    pub batch_id: String,
    pub source_batch_id: String,
    /// Where the derived artifact was written
    pub artifact_path: PathBuf,
    /// RFC 3339 assembly time
    pub created_at: String,
    pub phrase_count: usize,
    /// Always `pending`: downstream consumers own the rest of the lifecycle
    pub status: String,
    pub comment: String,
}

/// Serialized appender for the derived ledger file
#[derive(Debug)]
pub struct DerivedLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DerivedLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub fn append(&self, entry: &DerivedLedgerEntry) -> Result<(), AppError> {
        let line = serde_json::to_string(entry)?;

        let _guard = self.lock.lock();
        FileManager::append_line(&self.path, &line)?;

        debug!("Derived ledger += {}", entry.batch_id);
        Ok(())
    }

    /// Every record, oldest first; empty when the file does not exist
    pub fn entries(&self) -> Result<Vec<DerivedLedgerEntry>, AppError> {
        let _guard = self.lock.lock();
        if !FileManager::file_exists(&self.path) {
            return Ok(Vec::new());
        }

        let content = FileManager::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AppError::from))
            .collect()
    }

    /// Remove the file; only used by a forced rebuild
    pub fn clear(&self) -> Result<bool, AppError> {
        let _guard = self.lock.lock();
        Ok(FileManager::remove_if_exists(&self.path)?)
    }
}
