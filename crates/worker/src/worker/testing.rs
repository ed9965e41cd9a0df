//! Scripted fetcher and fixtures shared by the handler tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{StatusCode, header};
use swcache_core::{AppConfig, CacheDb, Error};

use super::{CacheManager, WorkerSettings};
use crate::fetch::{Fetcher, Request, Response, ResponseSource};

pub(crate) const ORIGIN: &str = "https://lend.example.com";

/// How the mock network answers one URL.
#[derive(Debug, Clone)]
pub(crate) enum Route {
    Respond(u16, &'static str),
    /// Respond after a delay, counted as in flight meanwhile.
    Slow(u16, &'static str, Duration),
    Fail,
    /// Never resolves.
    Hang,
}

/// Fetcher answering from a route table; unknown URLs fail.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(self, path: &str, route: Route) -> Self {
        self.set_route(path, route);
        self
    }

    pub(crate) fn set_route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(format!("{ORIGIN}{path}"), route);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Most `Slow` requests that were ever in flight together.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn respond(request: &Request, status: u16, body: &'static str) -> Response {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
    Response {
        url: request.url.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from_static(body.as_bytes()),
        source: ResponseSource::Network,
        fetch_ms: 1,
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.cache_key();
        self.calls.lock().unwrap().push(key.clone());
        let route = self.routes.lock().unwrap().get(&key).cloned().unwrap_or(Route::Fail);

        match route {
            Route::Respond(status, body) => Ok(respond(request, status, body)),
            Route::Slow(status, body, delay) => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(respond(request, status, body))
            }
            Route::Fail => Err(Error::Network(format!("connection refused: {key}"))),
            Route::Hang => std::future::pending().await,
        }
    }
}

pub(crate) fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

/// Manager over an existing store, for tests that run two releases side by side.
pub(crate) fn manager_on(db: CacheDb, config: AppConfig, fetcher: MockFetcher) -> CacheManager<MockFetcher> {
    let settings = WorkerSettings::from_config(&config).unwrap();
    CacheManager::new(settings, db, fetcher)
}

pub(crate) async fn manager_with(config: AppConfig, fetcher: MockFetcher) -> CacheManager<MockFetcher> {
    manager_on(CacheDb::open_in_memory().await.unwrap(), config, fetcher)
}

pub(crate) async fn manager(fetcher: MockFetcher) -> CacheManager<MockFetcher> {
    manager_with(config(), fetcher).await
}

pub(crate) fn page_url(path: &str) -> url::Url {
    url::Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}
