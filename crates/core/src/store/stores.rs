//! Named store management: open, enumerate and delete whole stores.

use super::connection::StoreDb;
use crate::Error;
use tokio_rusqlite::params;

impl StoreDb {
    /// Open a store, creating it if absent.
    ///
    /// Returns true when the store was created by this call.
    pub async fn open_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a store exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every store name in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
