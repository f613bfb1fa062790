//! Versioned store operations.
//!
//! A store is one named generation of a cache family. The gateway keeps
//! exactly one active generation per family; superseded generations are
//! deleted wholesale during activation rather than entry by entry.

use super::connection::CacheDb;
use super::entry::CachedResponse;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Which cache family a store generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFamily {
    /// Precached application shell assets, served cache-first.
    Shell,
    /// Captured API responses, served as network-first fallback.
    Api,
}

impl StoreFamily {
    /// Stable identifier used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreFamily::Shell => "shell",
            StoreFamily::Api => "api",
        }
    }

    fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "shell" => Ok(StoreFamily::Shell),
            "api" => Ok(StoreFamily::Api),
            other => Err(Error::InvalidInput(format!("unknown store family: {other}"))),
        }
    }
}

/// Metadata for one named store generation.
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub name: String,
    pub family: StoreFamily,
    pub created_at: String,
    pub entry_count: u64,
}

impl CacheDb {
    /// Ensure a store generation exists.
    ///
    /// Creating an already-open store is a no-op; entries are untouched.
    pub async fn open_store(&self, name: &str, family: StoreFamily) -> Result<(), Error> {
        let name = name.to_string();
        let family = family.as_str();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, family, created_at) VALUES (?1, ?2, ?3)",
                    params![name, family, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write one captured response under the given request key.
    ///
    /// A later write for the same key replaces the whole entry. The store
    /// must already exist.
    pub async fn put_entry(&self, store: &str, key: &str, response: &CachedResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key = key.to_string();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                insert_entry(conn, &store, &key, &response)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Replace a store's content with the given entry set, atomically.
    ///
    /// Existing entries are cleared and the new set inserted in a single
    /// transaction, so a failure partway leaves the previous content
    /// intact. This is the install-phase bulk populate.
    pub async fn put_all(&self, store: &str, entries: Vec<(String, CachedResponse)>) -> Result<(), Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE store_name = ?1", params![store])?;
                for (key, response) in &entries {
                    insert_entry(&tx, &store, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Exact-key lookup in one store.
    ///
    /// Returns None on a miss or if the store does not exist.
    pub async fn match_entry(&self, store: &str, key: &str) -> Result<Option<CachedResponse>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                     FROM entries WHERE store_name = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((method, url, status, headers_json, body, stored_at)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("corrupt header json: {e}")))?;
                        Ok(Some(CachedResponse { method, url, status, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List all store generations with their entry counts.
    pub async fn list_stores(&self) -> Result<Vec<StoreInfo>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(String, String, String, i64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.family, s.created_at, COUNT(e.request_key)
                     FROM stores s
                     LEFT JOIN entries e ON e.store_name = s.name
                     GROUP BY s.name
                     ORDER BY s.created_at",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(name, family, created_at, count)| {
                Ok(StoreInfo {
                    name,
                    family: StoreFamily::parse(&family)?,
                    created_at,
                    entry_count: count as u64,
                })
            })
            .collect()
    }

    /// Delete every store generation whose name is not in `keep`.
    ///
    /// Entries cascade with their store. Returns the number of stores
    /// removed.
    pub async fn delete_stale_stores(&self, keep: &[&str]) -> Result<u64, Error> {
        let keep: Vec<String> = keep.iter().map(|s| s.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let placeholders = keep.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
                let sql = format!("DELETE FROM stores WHERE name NOT IN ({placeholders})");
                let deleted = conn.execute(&sql, rusqlite::params_from_iter(keep.iter()))?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in one store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE store_name = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn insert_entry(conn: &rusqlite::Connection, store: &str, key: &str, response: &CachedResponse) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
    conn.execute(
        "INSERT OR REPLACE INTO entries
            (store_name, request_key, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            store,
            key,
            &response.method,
            &response.url,
            response.status,
            headers_json,
            &response.body,
            &response.stored_at,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::request_key;

    fn make_entry(url: &str, status: u16, body: &[u8]) -> CachedResponse {
        CachedResponse {
            method: "GET".to_string(),
            url: url.to_string(),
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        let url = "https://example.com/api/items";
        let key = request_key("GET", url);
        let entry = make_entry(url, 200, b"[1,2,3]");

        db.put_entry("api-v1", &key, &entry).await.unwrap();

        let found = db.match_entry("api-v1", &key).await.unwrap().unwrap();
        assert_eq!(found, entry);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();
        let found = db.match_entry("api-v1", "nonexistent").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        let url = "https://example.com/api/items";
        let key = request_key("GET", url);
        db.put_entry("api-v1", &key, &make_entry(url, 200, b"old")).await.unwrap();
        db.put_entry("api-v1", &key, &make_entry(url, 200, b"new")).await.unwrap();

        let found = db.match_entry("api-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.entry_count("api-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_isolated_by_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shell-v1", StoreFamily::Shell).await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        let url = "https://example.com/index.html";
        let key = request_key("GET", url);
        db.put_entry("shell-v1", &key, &make_entry(url, 200, b"<html>")).await.unwrap();

        assert!(db.match_entry("shell-v1", &key).await.unwrap().is_some());
        assert!(db.match_entry("api-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_all_replaces_content() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shell-v1", StoreFamily::Shell).await.unwrap();

        let stale_url = "https://example.com/old.css";
        let stale_key = request_key("GET", stale_url);
        db.put_entry("shell-v1", &stale_key, &make_entry(stale_url, 200, b"a{}")).await.unwrap();

        let entries: Vec<(String, CachedResponse)> = ["/", "/index.html"]
            .iter()
            .map(|path| {
                let url = format!("https://example.com{path}");
                (request_key("GET", &url), make_entry(&url, 200, b"<html>"))
            })
            .collect();
        db.put_all("shell-v1", entries).await.unwrap();

        assert_eq!(db.entry_count("shell-v1").await.unwrap(), 2);
        assert!(db.match_entry("shell-v1", &stale_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_stale_stores() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shell-v1", StoreFamily::Shell).await.unwrap();
        db.open_store("shell-v2", StoreFamily::Shell).await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        let url = "https://example.com/index.html";
        let key = request_key("GET", url);
        db.put_entry("shell-v1", &key, &make_entry(url, 200, b"<html>")).await.unwrap();

        let removed = db.delete_stale_stores(&["shell-v2", "api-v1"]).await.unwrap();
        assert_eq!(removed, 1);

        let names: Vec<String> = db.list_stores().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["shell-v2".to_string(), "api-v1".to_string()]);

        // entries cascade with their store
        assert!(db.match_entry("shell-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_stores_counts() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("shell-v2", StoreFamily::Shell).await.unwrap();

        let url = "https://example.com/manifest.json";
        db.put_entry("shell-v2", &request_key("GET", url), &make_entry(url, 200, b"{}"))
            .await
            .unwrap();

        let stores = db.list_stores().await.unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].family, StoreFamily::Shell);
        assert_eq!(stores[0].entry_count, 1);
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        let url = "https://example.com/api/items";
        let key = request_key("GET", url);
        db.put_entry("api-v1", &key, &make_entry(url, 200, b"[]")).await.unwrap();

        db.open_store("api-v1", StoreFamily::Api).await.unwrap();
        assert_eq!(db.entry_count("api-v1").await.unwrap(), 1);
    }
}
