//! cache_list tool implementation.
//!
//! Lists every stored generation with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::GenerationInfo;
use swcache_worker::{CacheManager, Fetcher};

use crate::tools::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Generation the manager serves from.
    pub current: String,
    /// Stored generations, oldest first.
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl<F: Fetcher + 'static>(manager: &CacheManager<F>) -> Result<CallToolResult, McpError> {
    let generations = manager.db().generations().await?;
    let output = CacheListOutput { current: manager.settings().cache_name.clone(), generations };
    json_result(&output)
}
