//! sw_fetch tool implementation.
//!
//! Runs one request through the fetch handler. Passthrough requests are
//! reported, not performed.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_worker::{CacheManager, FetchOutcome, Fetcher, PassthroughReason, Request, ResponseSource};

use super::{json_result, parse_method, request_url};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the served origin (e.g. "/dashboard").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SwFetchOutput {
    Passthrough {
        reason: PassthroughReason,
    },
    Response {
        url: String,
        status: u16,
        headers: Vec<(String, String)>,
        /// Body decoded as UTF-8 (lossy).
        body: String,
        source: ResponseSource,
        fetch_ms: u64,
        /// A background refresh of the cached entry was started.
        revalidating: bool,
    },
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<F: Fetcher + 'static>(
    manager: &CacheManager<F>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    let method = parse_method(params.method.as_deref())?;
    let url = request_url(manager, &params.url)?;

    let output = match manager.handle_fetch(&Request::new(method, url)).await? {
        FetchOutcome::Passthrough(reason) => SwFetchOutput::Passthrough { reason },
        FetchOutcome::Respond { response, revalidation } => SwFetchOutput::Response {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            headers: response
                .headers
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect(),
            body: response.text_lossy(),
            source: response.source,
            fetch_ms: response.fetch_ms,
            revalidating: revalidation.is_some(),
        },
    };

    json_result(&output)
}
