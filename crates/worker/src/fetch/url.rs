//! URL canonicalization and origin checks for request identity.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for swcache_core::Error {
    fn from(err: UrlError) -> Self {
        swcache_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http or https scheme (the parser already lowercases the host)
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(parsed)
}

/// Resolve a path or absolute URL against the served origin.
///
/// `/login` becomes `<origin>/login`; absolute URLs are canonicalized as-is
/// and may point at another origin.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(joined)
}

fn normalize(mut parsed: url::Url) -> Result<url::Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Cache identity of a URL: the serialized URL without its fragment.
pub fn cache_key(url: &url::Url) -> String {
    let mut keyed = url.clone();
    keyed.set_fragment(None);
    keyed.to_string()
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://lend.example.com").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_parser_lowercases_host() {
        let url = canonicalize("https://EXAMPLE.COM/Dashboard").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/Dashboard");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com/loans?page=2&sort=due").unwrap();
        assert_eq!(url.query(), Some("page=2&sort=due"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_relative_is_invalid() {
        let result = canonicalize("/dashboard");
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_path() {
        let url = resolve(&origin(), "/static/css/style.css").unwrap();
        assert_eq!(url.as_str(), "https://lend.example.com/static/css/style.css");
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve(&origin(), "/").unwrap();
        assert_eq!(url.as_str(), "https://lend.example.com/");
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve(&origin(), "https://CDN.example.net/lib.js#x").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.net/lib.js");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
    }

    #[test]
    fn test_cache_key() {
        let url = url::Url::parse("https://lend.example.com/dashboard?tab=1#top").unwrap();
        assert_eq!(cache_key(&url), "https://lend.example.com/dashboard?tab=1");
    }

    #[test]
    fn test_same_origin() {
        let page = url::Url::parse("https://lend.example.com/login").unwrap();
        let other_port = url::Url::parse("https://lend.example.com:8443/login").unwrap();
        let other_scheme = url::Url::parse("http://lend.example.com/login").unwrap();
        let cdn = url::Url::parse("https://cdn.example.com/login").unwrap();

        assert!(is_same_origin(&origin(), &page));
        assert!(!is_same_origin(&origin(), &other_port));
        assert!(!is_same_origin(&origin(), &other_scheme));
        assert!(!is_same_origin(&origin(), &cdn));
    }
}
