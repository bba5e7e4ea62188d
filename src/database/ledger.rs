/*!
 * The batch ledger: a crash-tolerant job queue over the `batch_ledger` table.
 *
 * Every operation runs on the shared connection's blocking pool and every
 * mutation is a transaction, so concurrent workers serialize on the
 * connection mutex and no status update can be lost. A process that dies
 * mid-batch leaves the row `in_progress`, which `list_pending` still returns.
 */

use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

use super::connection::DatabaseConnection;
use super::models::{BatchStatus, LedgerEntry, StatusCounts};
use crate::errors::LedgerError;

const SELECT_COLUMNS: &str = "batch_id, source_file, start_id, end_id, status, created_at, \
     updated_at, phrase_count, parameters, source_hash, comment";

/// Status-tracked batch registry
#[derive(Clone, Debug)]
pub struct BatchLedger {
    db: DatabaseConnection,
}

impl BatchLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open the ledger database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// A throwaway ledger (for testing)
    pub fn in_memory() -> Result<Self, LedgerError> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Insert one pending row; a second registration of the same id fails
    pub async fn register(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.db
            .transaction_async(move |tx| {
                insert_entry(tx, &entry)?;
                Ok(())
            })
            .await
            .map_err(LedgerError::from)
    }

    /// Insert many pending rows atomically; nothing is written on a duplicate
    pub async fn register_all(&self, entries: Vec<LedgerEntry>) -> Result<usize, LedgerError> {
        let count = entries.len();

        self.db
            .transaction_async(move |tx| {
                for entry in &entries {
                    insert_entry(tx, entry)?;
                }
                Ok(())
            })
            .await?;

        debug!("Registered {} batches", count);
        Ok(count)
    }

    /// Ids of every batch not yet done or error, in registration order
    pub async fn list_pending(&self) -> Result<Vec<String>, LedgerError> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT batch_id FROM batch_ledger
                     WHERE status NOT IN ('done', 'error')
                     ORDER BY seq",
                )?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(ids)
            })
            .await
            .map_err(LedgerError::from)
    }

    /// Move a batch to `status`.
    ///
    /// The read and the write happen in one transaction. `comment`, when
    /// given, replaces the stored comment. Returns the updated row.
    pub async fn transition(
        &self,
        batch_id: &str,
        status: BatchStatus,
        comment: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let batch_id = batch_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let mut entry = select_entry(tx, &batch_id)?
                    .ok_or_else(|| LedgerError::UnknownBatch(batch_id.clone()))?;

                if !entry.status.can_transition_to(status) {
                    return Err(LedgerError::InvalidTransition {
                        batch_id: batch_id.clone(),
                        from: entry.status.to_string(),
                        to: status.to_string(),
                    }
                    .into());
                }

                if entry.status == BatchStatus::InProgress && status == BatchStatus::InProgress {
                    warn!("Reclaiming interrupted batch {}", batch_id);
                }

                entry.status = status;
                entry.updated_at = chrono::Utc::now().to_rfc3339();
                if let Some(comment) = comment {
                    entry.comment = comment;
                }

                tx.execute(
                    "UPDATE batch_ledger SET status = ?1, updated_at = ?2, comment = ?3 WHERE batch_id = ?4",
                    params![entry.status.to_string(), entry.updated_at, entry.comment, batch_id],
                )?;

                Ok(entry)
            })
            .await
            .map_err(LedgerError::from)
    }

    pub async fn get(&self, batch_id: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let batch_id = batch_id.to_string();

        self.db
            .execute_async(move |conn| select_entry(conn, &batch_id))
            .await
            .map_err(LedgerError::from)
    }

    /// Every row in registration order
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.db
            .execute_async(|conn| {
                let sql = format!("SELECT {} FROM batch_ledger ORDER BY seq", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], parse_entry_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(LedgerError::from)
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, LedgerError> {
        self.db
            .execute_async(|conn| {
                let mut stmt =
                    conn.prepare("SELECT status, COUNT(*) FROM batch_ledger GROUP BY status")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut counts = StatusCounts::default();
                for (status, count) in rows {
                    counts.add(status.parse()?, count as usize);
                }
                Ok(counts)
            })
            .await
            .map_err(LedgerError::from)
    }

    /// Delete every row; only used by a forced rebuild
    pub async fn clear(&self) -> Result<usize, LedgerError> {
        self.db
            .transaction_async(|tx| {
                let removed = tx.execute("DELETE FROM batch_ledger", [])?;
                Ok(removed)
            })
            .await
            .map_err(LedgerError::from)
    }
}

fn insert_entry(conn: &Connection, entry: &LedgerEntry) -> anyhow::Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM batch_ledger WHERE batch_id = ?1",
        [&entry.batch_id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(LedgerError::DuplicateBatch(entry.batch_id.clone()).into());
    }

    conn.execute(
        r#"
        INSERT INTO batch_ledger (
            batch_id, source_file, start_id, end_id, status, created_at,
            updated_at, phrase_count, parameters, source_hash, comment
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            entry.batch_id,
            entry.source_file,
            entry.start_id as i64,
            entry.end_id as i64,
            BatchStatus::Pending.to_string(),
            entry.created_at,
            entry.updated_at,
            entry.phrase_count as i64,
            entry.parameters,
            entry.source_hash,
            entry.comment,
        ],
    )?;
    Ok(())
}

fn select_entry(conn: &Connection, batch_id: &str) -> anyhow::Result<Option<LedgerEntry>> {
    let sql = format!("SELECT {} FROM batch_ledger WHERE batch_id = ?1", SELECT_COLUMNS);
    let entry = conn.query_row(&sql, [batch_id], parse_entry_row).optional()?;
    Ok(entry)
}

fn parse_entry_row(row: &Row) -> rusqlite::Result<LedgerEntry> {
    let status_text: String = row.get(4)?;
    let status = status_text.parse().map_err(|e: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(LedgerEntry {
        batch_id: row.get(0)?,
        source_file: row.get(1)?,
        start_id: row.get::<_, i64>(2)? as u64,
        end_id: row.get::<_, i64>(3)? as u64,
        status,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        phrase_count: row.get::<_, i64>(7)? as usize,
        parameters: row.get(8)?,
        source_hash: row.get(9)?,
        comment: row.get(10)?,
    })
}
