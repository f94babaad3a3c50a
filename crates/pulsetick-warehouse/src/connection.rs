//! Shared `DuckDB` connection handle.
//!
//! Collectors run one at a time, so the warehouse keeps a single read-write
//! connection and serializes access through a mutex instead of pooling.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ::duckdb::Connection;

/// Cloneable handle to one `DuckDB` connection.
#[derive(Clone)]
pub struct SharedConnection {
    db_path: Option<PathBuf>,
    inner: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let connection = Connection::open(db_path.as_path())?;
        configure_connection(&connection)?;
        Ok(Self {
            db_path: Some(db_path),
            inner: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open a throwaway in-memory database.
    ///
    /// # Errors
    /// Returns an error if `DuckDB` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, ::duckdb::Error> {
        let connection = Connection::open_in_memory()?;
        configure_connection(&connection)?;
        Ok(Self {
            db_path: None,
            inner: Arc::new(Mutex::new(connection)),
        })
    }

    /// Borrow the connection for the duration of the guard.
    ///
    /// A poisoned lock only means an earlier statement panicked mid-call; the
    /// connection itself is still usable, so the guard is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of the backing file, `None` for in-memory databases.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    Ok(())
}
