//! Cache manager: the install, activate, fetch and message handlers.
//!
//! One `CacheManager` owns the current generation name, the cache storage
//! handle, the network fetcher and the lifecycle state. Handlers are plain
//! async methods; none of them holds a lock across an await point.

mod activate;
mod install;
mod intercept;
mod lifecycle;
mod message;
mod policy;

#[cfg(test)]
pub(crate) mod testing;

pub use activate::ActivationReport;
pub use install::{InstallReport, SkippedAsset};
pub use intercept::{FetchOutcome, Revalidation, RevalidationOutcome};
pub use lifecycle::{Lifecycle, LifecycleSnapshot, WorkerState};
pub use message::{ClientMessage, ControlCommand, MessageOutcome};
pub use policy::{Interception, PassthroughReason, classify};

use std::sync::Arc;

use swcache_core::{AppConfig, Cache, CacheDb, Error, InstallPolicy, Strategy};
use url::Url;

use crate::fetch::{Fetcher, resolve};

/// Settings the handlers run with, resolved from `AppConfig`.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Current generation; every other generation is deleted on activate.
    pub cache_name: String,
    pub origin: Url,
    pub static_assets: Vec<String>,
    pub offline_page: Option<String>,
    pub bypass_prefixes: Vec<String>,
    pub strategy: Strategy,
    pub install_policy: InstallPolicy,
    /// Upper bound on manifest fetches running at once
    pub install_concurrency: usize,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            cache_name: config.cache_name.clone(),
            origin,
            static_assets: config.static_assets.clone(),
            offline_page: config.offline_page.clone(),
            bypass_prefixes: config.bypass_prefixes.clone(),
            strategy: config.strategy,
            install_policy: config.install_policy,
            install_concurrency: config.install_concurrency.max(1),
        })
    }

    /// Absolute URL of a manifest path.
    pub fn asset_url(&self, path: &str) -> Result<Url, Error> {
        Ok(resolve(&self.origin, path)?)
    }

    /// Absolute URL of the offline fallback page, if one is configured.
    pub fn offline_url(&self) -> Result<Option<Url>, Error> {
        self.offline_page.as_deref().map(|p| self.asset_url(p)).transpose()
    }
}

/// Event-driven offline cache over a generation store and a fetcher.
pub struct CacheManager<F> {
    settings: Arc<WorkerSettings>,
    db: CacheDb,
    fetcher: Arc<F>,
    lifecycle: Arc<Lifecycle>,
}

impl<F> Clone for CacheManager<F> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            db: self.db.clone(),
            fetcher: Arc::clone(&self.fetcher),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl<F: Fetcher + 'static> CacheManager<F> {
    pub fn new(settings: WorkerSettings, db: CacheDb, fetcher: F) -> Self {
        Self {
            settings: Arc::new(settings),
            db,
            fetcher: Arc::new(fetcher),
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Cache storage shared by every handler.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Open (or create) the current generation.
    pub async fn current_cache(&self) -> Result<Cache, Error> {
        self.db.open_cache(&self.settings.cache_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = WorkerSettings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(settings.cache_name, "techlend-dynamic-cache-v4");
        assert_eq!(settings.origin.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(settings.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(settings.install_policy, InstallPolicy::PerAsset);
        assert_eq!(settings.install_concurrency, 8);
    }

    #[test]
    fn test_settings_rejects_bad_origin() {
        let config = AppConfig { origin: "nope".into(), ..Default::default() };
        let result = WorkerSettings::from_config(&config);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_asset_and_offline_urls() {
        let config = AppConfig { origin: "https://lend.example.com".into(), ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(settings.asset_url("/login").unwrap().as_str(), "https://lend.example.com/login");
        assert_eq!(
            settings.offline_url().unwrap().unwrap().as_str(),
            "https://lend.example.com/offline.html"
        );

        let settings = WorkerSettings { offline_page: None, ..settings };
        assert!(settings.offline_url().unwrap().is_none());
    }
}
