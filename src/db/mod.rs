mod geocode;
mod ledger_state;
mod setting;
mod user;

use crate::error::{Error, ErrorKind};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::task::spawn_blocking;

const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS user (
    username TEXT PRIMARY KEY NOT NULL,
    avatar TEXT NOT NULL DEFAULT '',
    fullname TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    lat REAL,
    lon REAL,
    bio TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    last_update INTEGER NOT NULL DEFAULT 0,
    following TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS geocode (
    location TEXT PRIMARY KEY NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS ledger_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_block_hash TEXT
);
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);";

/// Handle to the SQLite database that holds the user store, the geocode
/// cache, the ledger state and the settings.
///
/// Cloning is cheap; every clone talks to the same connection. Only one
/// thread at a time gets the connection.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Mutex<Connection>>,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Storage, Error> {
        let connection = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX
                | rusqlite::OpenFlags::SQLITE_OPEN_NOFOLLOW,
        )?;

        // Performance:
        connection.pragma_update(None, "journal_mode", "WAL")?;
        connection.pragma_update(None, "synchronous", "normal")?;
        connection.pragma_update(None, "temp_store", "memory")?;

        tracing::info!("Opened database {}", path.display());
        Self::setup(connection)
    }

    pub fn open_in_memory() -> Result<Storage, Error> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(connection: Connection) -> Result<Storage, Error> {
        let version: u32 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(ErrorKind::SchemaTooNew(version).into());
        }

        connection.execute_batch(SCHEMA)?;
        if version < SCHEMA_VERSION {
            tracing::info!("Database schema upgraded {} -> {}", version, SCHEMA_VERSION);
            connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(Storage {
            db: Arc::new(Mutex::new(connection)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, Error> + Send + 'static,
    {
        let db = self.db.clone();
        spawn_blocking(move || {
            let mut connection = db.lock();
            f(&mut connection)
        })
        .await?
    }
}
