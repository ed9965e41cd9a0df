//! Request -> response entries inside a cache generation.
//!
//! Entries are immutable once written; an update replaces the whole row.

use super::generations::Cache;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Request identity an entry is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// SHA-256 hash used as the primary key inside a generation.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

/// Snapshot of a response as kept in cache storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub final_url: String,
    pub stored_at: String,
}

impl StoredResponse {
    /// Build a snapshot stamped with the current time.
    pub fn new(status: u16, final_url: impl Into<String>, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: None,
            headers,
            body,
            final_url: final_url.into(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type EntryRow = (u16, Option<String>, String, Vec<u8>, String, String);

impl Cache {
    /// Look up the stored response for a request.
    ///
    /// Returns None when this generation has no entry for it.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        let key = CacheKey::new(method, url);
        let hash = key.hash();
        let name = self.name.clone();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, headers_json, body, final_url, stored_at
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, status_text, headers_json, body, final_url, stored_at)) = row else {
            return Ok(None);
        };

        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(Some(StoredResponse { status, status_text, headers, body, final_url, stored_at }))
    }

    /// Insert or overwrite the entry for a request.
    ///
    /// Fails if the generation has been deleted since this handle was opened.
    pub async fn put(&self, method: &str, url: &str, response: &StoredResponse) -> Result<(), Error> {
        self.put_all(vec![(CacheKey::new(method, url), response.clone())]).await
    }

    /// Insert or overwrite several entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_all(&self, entries: Vec<(CacheKey, StoredResponse)>) -> Result<(), Error> {
        let mut rows = Vec::with_capacity(entries.len());
        for (key, response) in entries {
            let headers_json = serde_json::to_string(&response.headers)?;
            rows.push((key.hash(), key, response, headers_json));
        }

        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (hash, key, response, headers_json) in &rows {
                    tx.execute(
                        "INSERT INTO cache_entries (
                            cache_name, key_hash, method, url, final_url,
                            status, status_text, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            final_url = excluded.final_url,
                            status = excluded.status,
                            status_text = excluded.status_text,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            &name,
                            hash,
                            &key.method,
                            &key.url,
                            &response.final_url,
                            response.status,
                            &response.status_text,
                            headers_json,
                            &response.body,
                            &response.stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities stored in this generation, in insertion order.
    pub async fn keys(&self) -> Result<Vec<CacheKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM cache_entries WHERE cache_name = ?1 ORDER BY rowid ASC")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(CacheKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a request. Returns false if there was none.
    pub async fn delete(&self, method: &str, url: &str) -> Result<bool, Error> {
        let hash = CacheKey::new(method, url).hash();
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this generation.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
