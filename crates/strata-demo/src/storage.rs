//! SQLite-backed key-value storage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Storage failures. All of them surface to clients as `424 DATABASE`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite rejected the statement (a duplicate key, for example).
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No value is stored under the key.
    #[error("Database error: no value for key '{0}'")]
    NotFound(String),

    /// A previous holder of the connection panicked.
    #[error("Database error: connection lock poisoned")]
    Poisoned,
}

/// Key-value table in a single SQLite connection.
#[derive(Debug)]
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (key TEXT NOT NULL PRIMARY KEY, value TEXT)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts a new key. Keys are write-once; a second `set` fails.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.execute(
            "INSERT INTO storage (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Reads the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<String, StorageError> {
        self.lock()?
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .map(Option::unwrap_or_default)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}
