/*!
 * Ledger entity models.
 *
 * These structures map directly to the `batch_ledger` table and provide
 * type-safe access to persisted rows.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corpus::BatchId;

/// Processing status of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Registered, not yet picked up
    Pending,
    /// Claimed by a worker; also the state left behind by a crash or a stop
    InProgress,
    /// All stages completed
    Done,
    /// A stage failed; see the comment
    Error,
}

impl BatchStatus {
    /// Every status, in lifecycle order
    pub const ALL: [BatchStatus; 4] = [
        BatchStatus::Pending,
        BatchStatus::InProgress,
        BatchStatus::Done,
        BatchStatus::Error,
    ];

    /// Terminal states are never left except by a rebuild
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Done | BatchStatus::Error)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotone.
    /// `in_progress -> in_progress` is allowed so an interrupted batch can be
    /// claimed again on the next run.
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::InProgress)
                | (BatchStatus::InProgress, BatchStatus::InProgress)
                | (BatchStatus::InProgress, BatchStatus::Done)
                | (BatchStatus::InProgress, BatchStatus::Error)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::InProgress => write!(f, "in_progress"),
            BatchStatus::Done => write!(f, "done"),
            BatchStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BatchStatus::Pending),
            "in_progress" => Ok(BatchStatus::InProgress),
            "done" => Ok(BatchStatus::Done),
            "error" => Ok(BatchStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid batch status: {}", s)),
        }
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique batch identity
    pub batch_id: String,
    /// Source corpus file name
    pub source_file: String,
    /// First global sentence id
    pub start_id: u64,
    /// Last global sentence id
    pub end_id: u64,
    pub status: BatchStatus,
    /// RFC 3339 creation time
    pub created_at: String,
    /// RFC 3339 time of the last transition
    pub updated_at: String,
    /// Sentences in the batch
    pub phrase_count: usize,
    /// Partitioning parameters, e.g. `batch_size=100`
    pub parameters: String,
    /// SHA-256 of the source corpus file
    pub source_hash: String,
    /// Last diagnostic message
    pub comment: String,
}

impl LedgerEntry {
    /// A fresh pending row for `batch_id`
    pub fn pending(
        batch_id: &BatchId,
        source_file: &str,
        phrase_count: usize,
        parameters: &str,
        source_hash: &str,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            batch_id: batch_id.to_string(),
            source_file: source_file.to_string(),
            start_id: batch_id.start(),
            end_id: batch_id.end(),
            status: BatchStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
            phrase_count,
            parameters: parameters.to_string(),
            source_hash: source_hash.to_string(),
            comment: String::new(),
        }
    }
}

/// Number of ledger rows per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.done + self.error
    }

    /// Rows still eligible for scheduling
    pub fn remaining(&self) -> usize {
        self.pending + self.in_progress
    }

    pub(crate) fn add(&mut self, status: BatchStatus, count: usize) {
        match status {
            BatchStatus::Pending => self.pending += count,
            BatchStatus::InProgress => self.in_progress += count,
            BatchStatus::Done => self.done += count,
            BatchStatus::Error => self.error += count,
        }
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batches: {} total, {} pending, {} in progress, {} done, {} error",
            self.total(),
            self.pending,
            self.in_progress,
            self.done,
            self.error
        )
    }
}
