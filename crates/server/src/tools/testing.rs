//! Scripted site shared by the tool tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use rmcp::model::CallToolResult;
use swcache_core::{AppConfig, CacheDb, Error};
use swcache_worker::{CacheManager, Fetcher, Request, Response, ResponseSource, StatusCode, WorkerSettings, header};

pub(crate) const ORIGIN: &str = "https://lend.example.com";

/// Fetcher serving fixed pages; unknown URLs and `down` sites fail.
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticSite {
    pages: Arc<RwLock<HashMap<String, String>>>,
    down: Arc<RwLock<bool>>,
}

impl StaticSite {
    pub(crate) fn with_page(self, path: &str, body: &str) -> Self {
        self.pages.write().unwrap().insert(format!("{ORIGIN}{path}"), body.to_string());
        self
    }

    pub(crate) fn take_down(&self) {
        *self.down.write().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticSite {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if *self.down.read().unwrap() {
            return Err(Error::Network("site down".into()));
        }
        let body = self.pages.read().unwrap().get(&request.cache_key()).cloned();
        let body = body.ok_or_else(|| Error::Network(format!("no route to {}", request.url)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
        Ok(Response {
            url: request.url.clone(),
            status: StatusCode::OK,
            headers,
            body: Bytes::from(body),
            source: ResponseSource::Network,
            fetch_ms: 3,
        })
    }
}

pub(crate) async fn manager_with(config: AppConfig, site: StaticSite) -> CacheManager<StaticSite> {
    let settings = WorkerSettings::from_config(&config).unwrap();
    CacheManager::new(settings, CacheDb::open_in_memory().await.unwrap(), site)
}

pub(crate) async fn manager(site: StaticSite) -> CacheManager<StaticSite> {
    manager_with(AppConfig { origin: ORIGIN.into(), ..Default::default() }, site).await
}

/// Decode the JSON text of a successful tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
