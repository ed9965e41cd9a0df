//! Which requests the fetch handler answers and which go straight to the network.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::WorkerSettings;
use crate::fetch::{Request, is_same_origin};

/// Why a request was left to default network handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassthroughReason {
    /// Only GET is ever cached
    NonGetMethod,
    CrossOrigin,
    /// Path under a reserved prefix such as `/api/`
    BypassPrefix,
}

/// Interception decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    Intercept,
    Passthrough(PassthroughReason),
}

/// Decide whether the fetch handler answers this request.
///
/// Checks run in order: method, origin, reserved path prefixes.
pub fn classify(settings: &WorkerSettings, request: &Request) -> Interception {
    if request.method != Method::GET {
        return Interception::Passthrough(PassthroughReason::NonGetMethod);
    }

    if !is_same_origin(&settings.origin, &request.url) {
        return Interception::Passthrough(PassthroughReason::CrossOrigin);
    }

    let path = request.url.path();
    if settings.bypass_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
        return Interception::Passthrough(PassthroughReason::BypassPrefix);
    }

    Interception::Intercept
}

#[cfg(test)]
mod tests {
    use super::super::testing::{config, page_url};
    use super::*;

    fn settings() -> WorkerSettings {
        WorkerSettings::from_config(&config()).unwrap()
    }

    #[test]
    fn test_same_origin_get_is_intercepted() {
        let request = Request::get(page_url("/dashboard"));
        assert_eq!(classify(&settings(), &request), Interception::Intercept);
    }

    #[test]
    fn test_non_get_passes_through() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let request = Request::new(method, page_url("/login"));
            assert_eq!(
                classify(&settings(), &request),
                Interception::Passthrough(PassthroughReason::NonGetMethod)
            );
        }
    }

    #[test]
    fn test_cross_origin_passes_through() {
        let request = Request::get(url::Url::parse("https://fonts.example.net/inter.woff2").unwrap());
        assert_eq!(classify(&settings(), &request), Interception::Passthrough(PassthroughReason::CrossOrigin));
    }

    #[test]
    fn test_reserved_prefixes_pass_through() {
        for path in ["/api/accounts", "/admin/users", "/api/"] {
            let request = Request::get(page_url(path));
            assert_eq!(
                classify(&settings(), &request),
                Interception::Passthrough(PassthroughReason::BypassPrefix),
                "{path}"
            );
        }
    }

    #[test]
    fn test_prefix_match_is_literal() {
        let request = Request::get(page_url("/apiary"));
        assert_eq!(classify(&settings(), &request), Interception::Intercept);
        let request = Request::get(page_url("/api"));
        assert_eq!(classify(&settings(), &request), Interception::Intercept);
    }

    #[test]
    fn test_empty_prefix_list_intercepts_everything() {
        let settings = WorkerSettings { bypass_prefixes: Vec::new(), ..settings() };
        let request = Request::get(page_url("/api/accounts"));
        assert_eq!(classify(&settings, &request), Interception::Intercept);
    }

    #[test]
    fn test_method_checked_before_origin() {
        let request = Request::new(Method::POST, url::Url::parse("https://cdn.example.net/x").unwrap());
        assert_eq!(classify(&settings(), &request), Interception::Passthrough(PassthroughReason::NonGetMethod));
    }
}
