//! Database connection management with pragma configuration.
//!
//! Opens the SQLite database backing every versioned store, applies the
//! pragmas required for WAL mode and cascading deletes, and brings the
//! schema up to date.

use super::schema::{self, SCHEMA_VERSION};
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Store database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. All named stores live in one database file.
#[derive(Clone, Debug)]
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas and upgrades
    /// the schema. Fails if the file was written by a newer schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        tracing::info!(path = %path.display(), "opened store database");
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        let found = conn
            .call(|conn| -> Result<i64, Error> {
                conn.execute_batch(PRAGMAS)?;
                schema::upgrade(conn)
            })
            .await
            .map_err(Error::from)?;

        if found < SCHEMA_VERSION {
            tracing::info!(from = found, to = SCHEMA_VERSION, "upgraded store schema");
        }

        Ok(Self { conn })
    }
}
