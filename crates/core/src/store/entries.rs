//! Entry operations within a named store.
//!
//! Entries are keyed by request key and overwritten on conflict; they are
//! only ever removed together with their store.

use super::connection::StoreDb;
use super::key::request_key;
use crate::Error;
use crate::http::{Request, Response, ResponseType};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of one stored entry, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub content_type: Option<String>,
    pub size: u64,
    pub stored_at: String,
}

fn decode_status(raw: i64) -> Result<u16, Error> {
    u16::try_from(raw).map_err(|_| Error::Serialization(format!("status out of range: {raw}")))
}

fn decode_type(raw: &str) -> Result<ResponseType, Error> {
    ResponseType::parse(raw).ok_or_else(|| Error::Serialization(format!("unknown response type: {raw}")))
}

impl StoreDb {
    /// Write a response under the request's key, creating the store if needed.
    pub async fn put_entry(&self, store: &str, request: &Request, response: Response) -> Result<(), Error> {
        let store = store.to_string();
        let key = request_key(request);
        let method = request.method.clone();
        let url = request.url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![&store, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    store_name, key_hash, method, url, status, status_text,
                    response_type, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(store_name, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &store,
                        &key,
                        &method,
                        &url,
                        response.status as i64,
                        &response.status_text,
                        response.response_type.as_str(),
                        &headers_json,
                        response.body.as_ref(),
                        &now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a response by exact request key.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, response_type, headers_json, body
                FROM entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                });

                let (status, status_text, response_type, headers_json, body) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                Ok(Some(Response {
                    status: decode_status(status)?,
                    status_text,
                    response_type: decode_type(&response_type)?,
                    headers: serde_json::from_str(&headers_json)?,
                    body: Bytes::from(body),
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// List entry summaries of a store, ordered by URL.
    pub async fn list_entries(&self, store: &str) -> Result<Vec<StoredEntry>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status, response_type, headers_json,
                        LENGTH(body), stored_at
                FROM entries WHERE store_name = ?1 ORDER BY url ASC",
                )?;

                let rows = stmt
                    .query_map(params![store], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(key, method, url, status, response_type, headers_json, size, stored_at)| {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        let content_type = headers
                            .into_iter()
                            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                            .map(|(_, v)| v);
                        Ok(StoredEntry {
                            key,
                            method,
                            url,
                            status: decode_status(status)?,
                            response_type: decode_type(&response_type)?,
                            content_type,
                            size: size.max(0) as u64,
                            stored_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries in a store.
    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
