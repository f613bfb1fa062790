//! Install/activate lifecycle for the cache generations.
//!
//! A configuration change that bumps a version string starts a new
//! generation: install precaches the shell manifest into the new shell
//! store, activate deletes every store left over from earlier
//! generations. Phases are an explicit state machine, not ambient flags.

use std::sync::Arc;

use futures::future::join_all;
use url::Url;

use presta_core::cache::key::request_key;
use presta_core::{AppConfig, CacheDb, CachedResponse, Error, StoreFamily};

use crate::fetch::{FetchRequest, Fetcher, resolve_path};

/// Lifecycle phases, in order. There is no rollback path: a failed
/// install returns to `Unregistered` and whatever generation was active
/// before keeps serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Drives one generation of the cache from registration to active.
pub struct Lifecycle {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    manifest: Vec<String>,
    shell_store: String,
    api_store: String,
    phase: Phase,
}

impl Lifecycle {
    /// Build a lifecycle for the configured generation.
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.page_origin)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.page_origin, e)))?;
        Ok(Self {
            db,
            fetcher,
            origin,
            manifest: config.shell_manifest.clone(),
            shell_store: config.shell_version.clone(),
            api_store: config.api_version.clone(),
            phase: Phase::Unregistered,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Precache the shell manifest into the configured shell store.
    ///
    /// Every manifest URL is fetched up front; the store is written once,
    /// in a single transaction, only after all of them have succeeded. A
    /// partially cached shell never exists.
    pub async fn install(&mut self) -> Result<(), Error> {
        self.phase = Phase::Installing;
        match self.populate_shell().await {
            Ok(count) => {
                tracing::info!(store = %self.shell_store, entries = count, "shell precache installed");
                self.phase = Phase::Installed;
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Unregistered;
                Err(err)
            }
        }
    }

    async fn populate_shell(&self) -> Result<usize, Error> {
        let mut requests = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let url = resolve_path(&self.origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            requests.push(FetchRequest::get(url));
        }

        let results = join_all(requests.iter().map(|request| self.fetcher.fetch(request))).await;

        let mut entries: Vec<(String, CachedResponse)> = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(results) {
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {}", request.url, e)))?;
            if !response.status.is_success() {
                return Err(Error::InstallFailed(format!(
                    "{}: status {}",
                    request.url,
                    response.status.as_u16()
                )));
            }
            entries.push((request_key(&request.method, request.url.as_str()), response.capture(request)));
        }

        let count = entries.len();
        self.db.open_store(&self.shell_store, StoreFamily::Shell).await?;
        self.db.put_all(&self.shell_store, entries).await?;
        Ok(count)
    }

    /// Promote this generation: delete every store whose name is neither
    /// the active shell store nor the active API store.
    ///
    /// At most one generation per family survives activation.
    pub async fn activate(&mut self) -> Result<u64, Error> {
        if self.phase != Phase::Installed {
            return Err(Error::Lifecycle(format!(
                "activate requires Installed, current phase is {:?}",
                self.phase
            )));
        }
        self.phase = Phase::Activating;
        let removed = self
            .db
            .delete_stale_stores(&[self.shell_store.as_str(), self.api_store.as_str()])
            .await?;
        if removed > 0 {
            tracing::info!(removed, "stale cache generations deleted");
        }
        self.phase = Phase::Active;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;

    fn manifest_urls() -> Vec<String> {
        AppConfig::default()
            .shell_manifest
            .iter()
            .map(|path| format!("http://localhost:5173{path}"))
            .collect()
    }

    async fn setup() -> (CacheDb, Arc<MockFetcher>, Lifecycle) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let lifecycle = Lifecycle::new(db.clone(), fetcher.clone(), &AppConfig::default()).unwrap();
        (db, fetcher, lifecycle)
    }

    fn script_full_manifest(fetcher: &MockFetcher) {
        for url in manifest_urls() {
            fetcher.push_ok(&url, 200, b"shell asset");
        }
    }

    #[tokio::test]
    async fn test_install_populates_shell_store() {
        let (db, fetcher, mut lifecycle) = setup().await;
        script_full_manifest(&fetcher);

        assert_eq!(lifecycle.phase(), Phase::Unregistered);
        lifecycle.install().await.unwrap();
        assert_eq!(lifecycle.phase(), Phase::Installed);

        assert_eq!(db.entry_count("shell-v2").await.unwrap(), 5);

        let key = request_key("GET", "http://localhost:5173/index.html");
        let entry = db.match_entry("shell-v2", &key).await.unwrap().unwrap();
        assert_eq!(entry.body, b"shell asset");
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing_on_network_failure() {
        let (db, fetcher, mut lifecycle) = setup().await;
        for url in manifest_urls() {
            if url.ends_with("/icon-512.png") {
                fetcher.push_err(&url);
            } else {
                fetcher.push_ok(&url, 200, b"shell asset");
            }
        }

        let result = lifecycle.install().await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(lifecycle.phase(), Phase::Unregistered);

        // nothing from the batch was written
        assert!(db.list_stores().await.unwrap().is_empty());
        assert_eq!(db.entry_count("shell-v2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing_on_http_error() {
        let (db, fetcher, mut lifecycle) = setup().await;
        for url in manifest_urls() {
            if url.ends_with("/manifest.json") {
                fetcher.push_ok(&url, 404, b"not found");
            } else {
                fetcher.push_ok(&url, 200, b"shell asset");
            }
        }

        let result = lifecycle.install().await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(db.entry_count("shell-v2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_failure_keeps_previous_generation() {
        let (db, fetcher, mut lifecycle) = setup().await;

        script_full_manifest(&fetcher);
        lifecycle.install().await.unwrap();

        // second install against an unreachable origin
        for url in manifest_urls() {
            fetcher.push_err(&url);
        }
        let result = lifecycle.install().await;
        assert!(result.is_err());

        // the earlier generation still serves
        assert_eq!(db.entry_count("shell-v2").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_install_idempotent() {
        let (db, fetcher, mut lifecycle) = setup().await;

        script_full_manifest(&fetcher);
        lifecycle.install().await.unwrap();
        script_full_manifest(&fetcher);
        lifecycle.install().await.unwrap();

        assert_eq!(db.entry_count("shell-v2").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (_db, _fetcher, mut lifecycle) = setup().await;
        let result = lifecycle.activate().await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let (db, fetcher, mut lifecycle) = setup().await;

        // leftovers from a previous deploy
        db.open_store("shell-v1", StoreFamily::Shell).await.unwrap();
        db.open_store("api-v0", StoreFamily::Api).await.unwrap();
        db.open_store("api-v1", StoreFamily::Api).await.unwrap();

        script_full_manifest(&fetcher);
        lifecycle.install().await.unwrap();
        let removed = lifecycle.activate().await.unwrap();
        assert_eq!(lifecycle.phase(), Phase::Active);
        assert_eq!(removed, 2);

        let names: Vec<String> = db.list_stores().await.unwrap().into_iter().map(|s| s.name).collect();
        assert!(names.contains(&"shell-v2".to_string()));
        assert!(names.contains(&"api-v1".to_string()));
        assert!(!names.contains(&"shell-v1".to_string()));
        assert!(!names.contains(&"api-v0".to_string()));
    }

    #[tokio::test]
    async fn test_activate_twice_is_rejected() {
        let (_db, fetcher, mut lifecycle) = setup().await;

        script_full_manifest(&fetcher);
        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        let result = lifecycle.activate().await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }
}
