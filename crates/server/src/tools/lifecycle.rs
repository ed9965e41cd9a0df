//! sw_install, sw_activate and sw_message tool implementations.
//!
//! These drive the lifecycle events of the cache manager and report the
//! resulting lifecycle state alongside each event's own result.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_worker::{
    ActivationReport, CacheManager, Fetcher, InstallReport, LifecycleSnapshot, MessageOutcome,
};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwInstallOutput {
    pub report: InstallReport,
    pub lifecycle: LifecycleSnapshot,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwActivateOutput {
    pub report: ActivationReport,
    pub lifecycle: LifecycleSnapshot,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by a page, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwMessageOutput {
    pub outcome: MessageOutcome,
    pub lifecycle: LifecycleSnapshot,
}

/// Implementation of the sw_install tool.
pub async fn install_impl<F: Fetcher + 'static>(manager: &CacheManager<F>) -> Result<CallToolResult, McpError> {
    let report = manager.install().await?;
    let lifecycle = manager.lifecycle().snapshot().await;
    json_result(&SwInstallOutput { report, lifecycle })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl<F: Fetcher + 'static>(manager: &CacheManager<F>) -> Result<CallToolResult, McpError> {
    let report = manager.activate().await?;
    let lifecycle = manager.lifecycle().snapshot().await;
    json_result(&SwActivateOutput { report, lifecycle })
}

/// Implementation of the sw_message tool.
pub async fn message_impl<F: Fetcher + 'static>(
    manager: &CacheManager<F>, params: SwMessageParams,
) -> Result<CallToolResult, McpError> {
    let outcome = manager.handle_message(&params.message).await;
    let lifecycle = manager.lifecycle().snapshot().await;
    json_result(&SwMessageOutput { outcome, lifecycle })
}
