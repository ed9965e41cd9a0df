//! Network side of the cache manager.
//!
//! ### Request model
//! - `Request` carries method, URL and headers; its cache identity is the
//!   method plus the URL without fragment.
//! - `Response` records where it came from (network, cache, offline page).
//!
//! ### Fetcher seam
//! - The `Fetcher` trait is the only way the cache manager reaches the
//!   network, so tests can script it.
//! - An HTTP error status is a response, not an error; only transport
//!   failures (refused, reset, timeout, oversized body) are errors.

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::str::FromStr;
use std::time::{Duration, Instant};
use swcache_core::{AppConfig, Error, StoredResponse};

pub use self::url::{UrlError, cache_key, canonicalize, is_same_origin, resolve};

/// A request as seen by the fetch handler.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: header::HeaderMap::new() }
    }

    /// Plain GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Identity the response is stored under.
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
}

/// Response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL the body was served from (after redirects for network responses)
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub body: Bytes,
    /// Network, cache or offline fallback
    pub source: ResponseSource,
    /// Time taken to fetch in milliseconds (0 for stored responses)
    pub fetch_ms: u64,
}

impl Response {
    /// Snapshot this response for cache storage.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let mut stored = StoredResponse::new(self.status.as_u16(), self.url.as_str(), headers, self.body.to_vec());
        stored.status_text = self.status.canonical_reason().map(String::from);
        stored
    }

    /// Rebuild a response from a stored snapshot.
    pub fn from_stored(stored: StoredResponse, source: ResponseSource) -> Result<Self, Error> {
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", stored.status)))?;
        let url = Url::parse(&stored.final_url).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &stored.headers {
            let name = header::HeaderName::from_str(name).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let value = header::HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: Bytes::from(stored.body), source, fetch_ms: 0 })
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Network fetch primitive used by the cache manager.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Resolves for any HTTP status; fails only when no
    /// response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sw-cache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "sw-cache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body = response.bytes().await.map_err(map_send_error)?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            body.len()
        );

        Ok(Response { url: final_url, status, headers, body, source: ResponseSource::Network, fetch_ms })
    }
}
