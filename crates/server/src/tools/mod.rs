//! MCP tool implementations.
//!
//! Each tool is an `*_impl` function generic over the network `Fetcher`, so
//! tests can drive it against a scripted site.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;

#[cfg(test)]
pub(crate) mod testing;

pub use sw_fetch::{SwFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;
use swcache_worker::{CacheManager, Fetcher, Method, fetch::resolve};
use url::Url;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parse an optional method name, defaulting to GET.
pub(crate) fn parse_method(method: Option<&str>) -> Result<Method, Error> {
    match method.map(str::trim) {
        None | Some("") => Ok(Method::GET),
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {m}"))),
    }
}

/// Resolve a tool URL argument: a path is taken relative to the served origin.
pub(crate) fn request_url<F: Fetcher + 'static>(manager: &CacheManager<F>, input: &str) -> Result<Url, Error> {
    Ok(resolve(&manager.settings().origin, input)?)
}
