//! Fetch handler: interception policy plus the two answering strategies.
//!
//! Cache lookups only ever read the current generation and never create it. A
//! storage error during lookup is logged and treated as a miss, so the request
//! degrades to the network path instead of failing. A cacheable response on a
//! miss is written before it is returned, so the next request for the same URL
//! sees it.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use swcache_core::{CacheDb, Error, Strategy};
use tokio::task::JoinHandle;

use super::CacheManager;
use super::policy::{Interception, PassthroughReason, classify};
use crate::fetch::{Fetcher, Request, Response, ResponseSource};

/// What the fetch handler did with a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the caller performs a plain network request.
    Passthrough(PassthroughReason),
    /// Answered by the cache manager.
    Respond {
        response: Response,
        /// Background refresh started for a stale-while-revalidate cache hit
        revalidation: Option<Revalidation>,
    },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough(_))
    }
}

/// How a background revalidation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// Entry overwritten with a fresh 200 response
    Updated { status: u16 },
    /// Network answered with a non-200 status; entry left as it was
    NotStored { status: u16 },
    /// Network or storage failed; entry left as it was
    Failed(String),
}

/// Detached background refresh of a cache entry.
///
/// Dropping the handle does not cancel the refresh. There is no ordering
/// guarantee between its write and later requests for the same URL.
#[derive(Debug)]
pub struct Revalidation {
    handle: JoinHandle<RevalidationOutcome>,
}

impl Revalidation {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the refresh to end.
    pub async fn outcome(self) -> RevalidationOutcome {
        self.handle
            .await
            .unwrap_or_else(|e| RevalidationOutcome::Failed(format!("revalidation task: {e}")))
    }
}

impl<F: Fetcher + 'static> CacheManager<F> {
    /// Handle the fetch event for one request.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoResponse` when the network fails, nothing is cached
    /// for the request and no offline page is cached either.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Interception::Passthrough(reason) = classify(self.settings(), request) {
            tracing::debug!(method = %request.method, url = %request.url, ?reason, "request not intercepted");
            return Ok(FetchOutcome::Passthrough(reason));
        }

        match self.settings().strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.lookup(request.method.as_str(), &request.cache_key(), ResponseSource::Cache).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(FetchOutcome::Respond { response: cached, revalidation: None });
        }

        self.network_or_offline(request).await
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.lookup(request.method.as_str(), &request.cache_key(), ResponseSource::Cache).await {
            tracing::debug!(url = %request.url, "cache hit, revalidating in background");
            let revalidation = self.spawn_revalidation(request.clone());
            return Ok(FetchOutcome::Respond { response: cached, revalidation: Some(revalidation) });
        }

        self.network_or_offline(request).await
    }

    async fn network_or_offline(&self, request: &Request) -> Result<FetchOutcome, Error> {
        tracing::debug!(url = %request.url, "cache miss, fetching from network");

        match self.fetcher().fetch(request).await {
            Ok(response) => {
                if response.status == StatusCode::OK {
                    self.store(request, &response).await;
                }
                Ok(FetchOutcome::Respond { response, revalidation: None })
            }
            Err(e) => match self.offline_fallback().await {
                Some(page) => {
                    tracing::info!(url = %request.url, error = %e, "network failed, serving offline page");
                    Ok(FetchOutcome::Respond { response: page, revalidation: None })
                }
                None => {
                    tracing::debug!(url = %request.url, error = %e, "network failed and no offline page cached");
                    Err(Error::NoResponse(format!("{} {}: {e}", request.method, request.url)))
                }
            },
        }
    }

    async fn lookup(&self, method: &str, key: &str, source: ResponseSource) -> Option<Response> {
        self.try_lookup(method, key, source).await.unwrap_or_else(|e| {
            tracing::warn!(url = %key, error = %e, "cache lookup failed, treating as miss");
            None
        })
    }

    async fn try_lookup(&self, method: &str, key: &str, source: ResponseSource) -> Result<Option<Response>, Error> {
        let Some(cache) = self.db.existing_cache(&self.settings.cache_name).await? else {
            return Ok(None);
        };
        match cache.match_request(method, key).await? {
            Some(stored) => Response::from_stored(stored, source).map(Some),
            None => Ok(None),
        }
    }

    async fn store(&self, request: &Request, response: &Response) {
        if let Err(e) = store_in(&self.db, &self.settings.cache_name, request, response).await {
            tracing::warn!(url = %request.url, error = %e, "failed to store response");
        }
    }

    async fn offline_fallback(&self) -> Option<Response> {
        let url = match self.settings().offline_url() {
            Ok(Some(url)) => url,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "invalid offline page");
                return None;
            }
        };

        self.lookup(Method::GET.as_str(), &crate::fetch::cache_key(&url), ResponseSource::Offline)
            .await
    }

    fn spawn_revalidation(&self, request: Request) -> Revalidation {
        let fetcher = Arc::clone(&self.fetcher);
        let db = self.db.clone();
        let cache_name = self.settings.cache_name.clone();
        Revalidation { handle: tokio::spawn(revalidate(fetcher, db, cache_name, request)) }
    }
}

async fn revalidate<F: Fetcher>(
    fetcher: Arc<F>, db: CacheDb, cache_name: String, request: Request,
) -> RevalidationOutcome {
    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "background revalidation failed");
            return RevalidationOutcome::Failed(e.to_string());
        }
    };

    let status = response.status.as_u16();
    if response.status != StatusCode::OK {
        tracing::debug!(url = %request.url, status, "revalidation response not cacheable");
        return RevalidationOutcome::NotStored { status };
    }

    match store_in(&db, &cache_name, &request, &response).await {
        Ok(()) => {
            tracing::debug!(url = %request.url, cache = %cache_name, "refreshed cached entry");
            RevalidationOutcome::Updated { status }
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "failed to store revalidated response");
            RevalidationOutcome::Failed(e.to_string())
        }
    }
}

async fn store_in(db: &CacheDb, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error> {
    let cache = db.open_cache(cache_name).await?;
    cache.put(request.method.as_str(), &request.cache_key(), &response.to_stored()).await
}
