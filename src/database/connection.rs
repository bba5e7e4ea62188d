/*!
 * Ledger database connection management.
 *
 * One SQLite connection behind a mutex is the single writer for the whole
 * process. Async callers go through `spawn_blocking` so the runtime never
 * blocks on the lock or on disk I/O.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::schema;

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl DatabaseConnection {
    /// Open (or create) the database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening ledger database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory ledger database");

        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation with the connection
    ///
    /// This method acquires the mutex lock and executes the provided closure
    /// with access to the connection. For async contexts, use `execute_async`.
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

        f(&conn)
    }

    /// Execute a database operation asynchronously using spawn_blocking
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Run `f` inside a transaction; commits only when `f` succeeds
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Async variant of `transaction`
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;

            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;

            Ok(result)
        })
        .await
        .context("Database transaction task panicked")?
    }
}
