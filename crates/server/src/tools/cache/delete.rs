//! cache_delete tool implementation.
//!
//! Deletes one cache generation with all of its entries.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use swcache_worker::{CacheManager, Fetcher};

use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Generation name, e.g. "techlend-dynamic-cache-v3".
    pub name: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub name: String,
    /// False when no generation had that name.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl<F: Fetcher + 'static>(
    manager: &CacheManager<F>, params: CacheDeleteParams,
) -> Result<CallToolResult, McpError> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name cannot be empty".into()).into());
    }

    if name == manager.settings().cache_name {
        tracing::warn!(cache = %name, "deleting the current generation");
    }

    let deleted = manager.db().delete_cache(name).await?;
    json_result(&CacheDeleteOutput { name: name.to_string(), deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticSite, manager, output};

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let manager = manager(StaticSite::default()).await;
        manager.db().open_cache("techlend-cache").await.unwrap();

        let params = CacheDeleteParams { name: "techlend-cache".into() };
        let value = output(&delete_impl(&manager, params).await.unwrap());
        assert_eq!(value["deleted"], true);
        assert!(!manager.db().has_cache("techlend-cache").await.unwrap());

        let params = CacheDeleteParams { name: "techlend-cache".into() };
        let value = output(&delete_impl(&manager, params).await.unwrap());
        assert_eq!(value["deleted"], false);
    }

    #[tokio::test]
    async fn test_delete_empty_name() {
        let manager = manager(StaticSite::default()).await;

        let err = delete_impl(&manager, CacheDeleteParams { name: "  ".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
