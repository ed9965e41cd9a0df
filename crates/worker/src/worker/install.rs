//! Install handler: populate the current generation from the manifest.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use swcache_core::{Cache, CacheKey, Error, InstallPolicy, StoredResponse};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{CacheManager, WorkerState};
use crate::fetch::{Fetcher, Request};

/// Manifest asset that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub path: String,
    pub reason: String,
}

/// Result of a completed installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub policy: InstallPolicy,
    /// Manifest paths now stored, in manifest order
    pub cached: Vec<String>,
    /// Always empty under the all-or-nothing policy
    pub skipped: Vec<SkippedAsset>,
}

impl<F: Fetcher + 'static> CacheManager<F> {
    /// Handle the install event.
    ///
    /// Opens the current generation, stores every manifest asset according to
    /// the install policy, then requests an immediate takeover.
    ///
    /// # Errors
    ///
    /// Under `InstallPolicy::AllOrNothing`, returns `Error::InstallFailed` as
    /// soon as one asset cannot be fetched; nothing from the manifest is stored.
    /// Storage failures propagate under either policy when opening the generation.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let settings = self.settings();
        tracing::info!(cache = %settings.cache_name, policy = %settings.install_policy, "installing new version");
        self.lifecycle().transition(WorkerState::Installing).await;

        let result = match self.current_cache().await {
            Ok(cache) => match settings.install_policy {
                InstallPolicy::PerAsset => Ok(self.install_per_asset(&cache).await),
                InstallPolicy::AllOrNothing => self.install_all_or_nothing(&cache).await,
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                tracing::info!(
                    cache = %report.cache_name,
                    cached = report.cached.len(),
                    skipped = report.skipped.len(),
                    "install complete"
                );
                self.lifecycle().transition(WorkerState::Installed).await;
                self.lifecycle().skip_waiting().await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(cache = %settings.cache_name, error = %e, "install failed");
                self.lifecycle().transition(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Fetch a manifest path and store the response under its request URL.
    ///
    /// Rejects any non-2xx status, like the platform `Cache.add`.
    pub async fn add(&self, cache: &Cache, path: &str) -> Result<(), Error> {
        let (key, stored) = self.fetch_for_install(path).await?;
        cache.put(&key.method, &key.url, &stored).await
    }

    async fn fetch_for_install(&self, path: &str) -> Result<(CacheKey, StoredResponse), Error> {
        let request = Request::get(self.settings().asset_url(path)?);
        let response = self.fetcher().fetch(&request).await?;

        if !response.status.is_success() {
            return Err(Error::HttpError(format!("{path}: status {}", response.status.as_u16())));
        }

        Ok((CacheKey::new(Method::GET.as_str(), request.cache_key()), response.to_stored()))
    }

    async fn install_per_asset(&self, cache: &Cache) -> InstallReport {
        let results = self
            .for_each_asset(|manager, path| {
                let cache = cache.clone();
                async move { manager.add(&cache, &path).await }
            })
            .await;

        let mut cached = Vec::new();
        let mut skipped = Vec::new();
        for (path, result) in results {
            match result {
                Ok(()) => cached.push(path),
                Err(e) => {
                    tracing::warn!(asset = %path, error = %e, "skipped asset (missing or failed)");
                    skipped.push(SkippedAsset { path, reason: e.to_string() });
                }
            }
        }

        InstallReport { cache_name: cache.name().to_string(), policy: InstallPolicy::PerAsset, cached, skipped }
    }

    /// Fetch the whole manifest, then store it in one transaction.
    ///
    /// The reported failure is the first failing asset in manifest order.
    async fn install_all_or_nothing(&self, cache: &Cache) -> Result<InstallReport, Error> {
        let results = self
            .for_each_asset(|manager, path| async move { manager.fetch_for_install(&path).await })
            .await;

        let mut entries = Vec::with_capacity(results.len());
        for (path, result) in results {
            entries.push(result.map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?);
        }

        cache.put_all(entries).await?;

        Ok(InstallReport {
            cache_name: cache.name().to_string(),
            policy: InstallPolicy::AllOrNothing,
            cached: self.settings().static_assets.clone(),
            skipped: Vec::new(),
        })
    }

    /// Run one task per manifest asset, at most `install_concurrency` at once.
    ///
    /// Results are returned in manifest order.
    async fn for_each_asset<T, Fut>(&self, run: impl Fn(Self, String) -> Fut) -> Vec<(String, Result<T, Error>)>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let assets = &self.settings().static_assets;
        let semaphore = Arc::new(Semaphore::new(self.settings().install_concurrency));
        let mut join_set = JoinSet::new();

        for (index, path) in assets.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = run(self.clone(), path.clone());
            join_set.spawn(async move {
                // Held for the task duration to bound concurrent fetches
                let _permit = semaphore.acquire_owned().await;
                (index, task.await)
            });
        }

        let mut slots: Vec<Option<Result<T, Error>>> = assets.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::warn!(error = %e, "install task did not complete"),
            }
        }

        assets
            .iter()
            .zip(slots)
            .map(|(path, slot)| {
                let result = slot.unwrap_or_else(|| Err(Error::InstallFailed("install task aborted".into())));
                (path.clone(), result)
            })
            .collect()
    }
}
