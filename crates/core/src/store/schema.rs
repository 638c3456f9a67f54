//! Store database schema versioning.
//!
//! The schema version is kept in SQLite's `user_version` header field. Each
//! step upgrades the previous version inside its own transaction. A database
//! written by a newer build is refused and left untouched, since an older
//! binary could otherwise drop entries it does not understand.

use crate::Error;
use tokio_rusqlite::rusqlite::Connection;

/// Upgrade steps; step `n` (1-based) produces schema version `n`.
const STEPS: &[&str] = &[
    include_str!("../../migrations/001_stores.sql"),
    include_str!("../../migrations/002_entries.sql"),
];

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = STEPS.len() as i64;

/// Bring the schema up to [`SCHEMA_VERSION`]; returns the version found on disk.
pub(crate) fn upgrade(conn: &mut Connection) -> Result<i64, Error> {
    let on_disk: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if on_disk > SCHEMA_VERSION {
        return Err(Error::MigrationFailed(format!(
            "store schema v{on_disk} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    for (version, sql) in (1_i64..).zip(STEPS).skip(usize::try_from(on_disk).unwrap_or(0)) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("schema step {version}: {e}")))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::debug!(version, "applied store schema step");
    }

    Ok(on_disk)
}
