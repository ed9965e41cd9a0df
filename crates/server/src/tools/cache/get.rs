//! cache_get tool implementation.
//!
//! Retrieves a stored entry from the current generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use swcache_worker::{CacheManager, Fetcher};

use crate::tools::{json_result, parse_method, request_url};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the served origin.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache_name: String,
    pub method: String,
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Size of the stored body in bytes.
    pub body_bytes: usize,
    /// RFC 3339 timestamp of the last write.
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<F: Fetcher + 'static>(
    manager: &CacheManager<F>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let method = parse_method(params.method.as_deref())?;
    let url = request_url(manager, &params.url)?;

    let cache_name = &manager.settings().cache_name;
    let cache = manager
        .db()
        .existing_cache(cache_name)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("no cache generation named {cache_name}")))?;
    let stored = cache
        .match_request(method.as_str(), url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{method} {url}")))?;

    let output = CacheGetOutput {
        cache_name: cache.name().to_string(),
        method: method.to_string(),
        url: url.to_string(),
        body_bytes: stored.body.len(),
        final_url: stored.final_url,
        status: stored.status,
        status_text: stored.status_text,
        headers: stored.headers,
        stored_at: stored.stored_at,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticSite, manager, output};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let manager = manager(StaticSite::default()).await;
        let params = CacheGetParams { url: "/nonexistent".to_string(), method: None };

        let err = get_impl(&manager, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_does_not_recreate_deleted_generation() {
        let manager = manager(StaticSite::default().with_page("/login", "login")).await;
        manager.install().await.unwrap();
        manager.db().delete_cache("techlend-dynamic-cache-v4").await.unwrap();

        let params = CacheGetParams { url: "/login".to_string(), method: None };
        let err = get_impl(&manager, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(manager.db().cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let manager = manager(StaticSite::default().with_page("/login", "<h1>login</h1>")).await;
        manager.install().await.unwrap();

        let params = CacheGetParams { url: "/login".to_string(), method: Some("get".to_string()) };
        let value = output(&get_impl(&manager, params).await.unwrap());
        assert_eq!(value["cache_name"], "techlend-dynamic-cache-v4");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["url"], "https://lend.example.com/login");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 14);
    }
}
