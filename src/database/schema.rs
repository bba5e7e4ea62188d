/*!
 * Ledger schema definitions and migrations.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing ledger schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating ledger schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Ledger schema v{} is newer than this build supports (v{})",
            current_version,
            SCHEMA_VERSION
        ));
    } else {
        debug!("Ledger schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL keeps the ledger readable while a transition commits
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // seq preserves registration order for FIFO scheduling
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS batch_ledger (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL UNIQUE,
            source_file TEXT NOT NULL,
            start_id INTEGER NOT NULL,
            end_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'in_progress', 'done', 'error')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            phrase_count INTEGER NOT NULL,
            parameters TEXT NOT NULL DEFAULT '',
            source_hash TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_batch_ledger_status ON batch_ledger(status);
        "#,
    )?;

    info!("Ledger schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let current = from_version;

    if current < SCHEMA_VERSION {
        // No released version predates v1 yet
        return Err(anyhow::anyhow!(
            "Unknown ledger schema version: {}. Cannot migrate.",
            current
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Ledger schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
