//! Request-pattern synchronization barriers.
//!
//! UI state often only settles after a specific outgoing request completes
//! (open the cart, wait for the cart refresh call, then assert). A
//! [`RequestBarrier`] is an explicit subscription to a method + URL pattern,
//! registered with the automation capability *before* the triggering action
//! and awaited afterwards: a request/response synchronization point instead
//! of a fixed sleep.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::result::{TeclearError, TeclearResult};
use crate::wait::{wait_until, WaitOptions};

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// Any method
    Any,
}

impl HttpMethod {
    /// Parse from a method string
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            _ => Self::Any,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Any => "*",
        }
    }

    /// Check if this method matches another
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/bycat**")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Simple glob matching for URLs
    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.is_empty() {
            return url.is_empty();
        }

        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if let Some(found) = url[pos..].find(part) {
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            } else {
                return false;
            }
        }

        pattern.ends_with('*') || pos == url.len()
    }
}

/// A captured outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Response status code, once observed
    pub status: Option<u16>,
    /// Timestamp (milliseconds since observation start)
    pub timestamp_ms: u64,
}

impl CapturedRequest {
    /// Create a new captured request
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            url: url.into(),
            method,
            status: None,
            timestamp_ms,
        }
    }

    /// Attach the observed response status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// A subscription to a request pattern, awaited as a synchronization barrier.
///
/// Cloning shares the underlying log: the automation backend records into one
/// clone while the test flow awaits another.
#[derive(Debug, Clone)]
pub struct RequestBarrier {
    method: HttpMethod,
    pattern: UrlPattern,
    seen: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl RequestBarrier {
    /// Create a new barrier for a method + URL pattern
    #[must_use]
    pub fn new(method: HttpMethod, pattern: UrlPattern) -> Self {
        Self {
            method,
            pattern,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Check whether a request belongs to this subscription
    #[must_use]
    pub fn is_match(&self, request: &CapturedRequest) -> bool {
        self.method.matches(&request.method) && self.pattern.matches(&request.url)
    }

    /// Record a request if it matches the subscription. Returns whether it
    /// was recorded. Called by automation backends.
    pub fn record(&self, request: CapturedRequest) -> bool {
        if !self.is_match(&request) {
            return false;
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request);
        }
        true
    }

    /// All matching requests observed so far
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// First matching request, if any
    #[must_use]
    pub fn first(&self) -> Option<CapturedRequest> {
        self.seen.lock().ok().and_then(|s| s.first().cloned())
    }

    /// Number of matching requests observed so far
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Await the first matching request, bounded by `options`
    pub async fn wait(&self, options: &WaitOptions) -> TeclearResult<CapturedRequest> {
        wait_until(
            || self.count() > 0,
            &format!("request {} {:?}", self.method.as_str(), self.pattern),
            options,
        )
        .await?;
        self.first().ok_or_else(|| TeclearError::Timeout {
            ms: options.timeout_ms,
        })
    }

    /// Await the first matching request and assert its status is one of
    /// `accepted` (used for server-side effects such as cart cleanup)
    pub async fn wait_for_status(
        &self,
        accepted: &[u16],
        options: &WaitOptions,
    ) -> TeclearResult<CapturedRequest> {
        let request = self.wait(options).await?;
        match request.status {
            Some(status) if accepted.contains(&status) => Ok(request),
            other => Err(TeclearError::assertion(format!(
                "request {} completed with status {:?}, expected one of {:?}",
                request.url, other, accepted
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_exact_match() {
            let pattern = UrlPattern::Exact("https://api.example.com/bycat".into());
            assert!(pattern.matches("https://api.example.com/bycat"));
            assert!(!pattern.matches("https://api.example.com/bycat2"));
        }

        #[test]
        fn test_glob_match() {
            let pattern = UrlPattern::Glob("**/bycat**".into());
            assert!(pattern.matches("https://api.demoblaze.com/bycat"));
            assert!(pattern.matches("https://api.demoblaze.com/bycat?x=1"));
            assert!(!pattern.matches("https://api.demoblaze.com/viewcart"));
        }

        #[test]
        fn test_regex_match() {
            let pattern = UrlPattern::Regex(r"/(viewcart|deletecart)$".into());
            assert!(pattern.matches("https://api.demoblaze.com/viewcart"));
            assert!(pattern.matches("https://api.demoblaze.com/deletecart"));
            assert!(!pattern.matches("https://api.demoblaze.com/addtocart"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            let pattern = UrlPattern::Regex("(unclosed".into());
            assert!(!pattern.matches("anything"));
        }

        #[test]
        fn test_contains_and_prefix() {
            assert!(UrlPattern::Contains("cart".into()).matches("https://x/viewcart"));
            assert!(UrlPattern::Prefix("https://x".into()).matches("https://x/y"));
            assert!(UrlPattern::Any.matches(""));
        }
    }

    mod http_method_tests {
        use super::*;

        #[test]
        fn test_parse_and_match() {
            assert_eq!(HttpMethod::parse("post"), HttpMethod::Post);
            assert!(HttpMethod::Any.matches(&HttpMethod::Get));
            assert!(HttpMethod::Post.matches(&HttpMethod::Post));
            assert!(!HttpMethod::Post.matches(&HttpMethod::Get));
        }
    }

    mod barrier_tests {
        use super::*;

        fn cart_barrier() -> RequestBarrier {
            RequestBarrier::new(HttpMethod::Post, UrlPattern::Glob("**/viewcart**".into()))
        }

        #[test]
        fn test_record_filters_non_matching() {
            let barrier = cart_barrier();
            assert!(!barrier.record(CapturedRequest::new(HttpMethod::Get, "https://x/other", 0)));
            assert!(barrier.record(CapturedRequest::new(
                HttpMethod::Post,
                "https://api.demoblaze.com/viewcart",
                10
            )));
            assert_eq!(barrier.count(), 1);
        }

        #[tokio::test]
        async fn test_wait_resolves_once_recorded() {
            let barrier = cart_barrier();
            let recorder = barrier.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                recorder.record(
                    CapturedRequest::new(HttpMethod::Post, "https://x/viewcart", 20)
                        .with_status(200),
                );
            });

            let options = WaitOptions::new().with_timeout(500).with_poll_interval(10);
            let request = barrier.wait(&options).await.unwrap();
            assert_eq!(request.status, Some(200));
        }

        #[tokio::test]
        async fn test_wait_times_out_without_traffic() {
            let barrier = cart_barrier();
            let options = WaitOptions::new().with_timeout(60).with_poll_interval(10);
            assert!(matches!(
                barrier.wait(&options).await,
                Err(TeclearError::Timeout { .. })
            ));
        }

        #[tokio::test]
        async fn test_wait_for_status_rejects_errors() {
            let barrier = cart_barrier();
            barrier.record(
                CapturedRequest::new(HttpMethod::Post, "https://x/viewcart", 5).with_status(500),
            );

            let options = WaitOptions::new().with_timeout(100);
            let result = barrier.wait_for_status(&[200, 201], &options).await;
            assert!(matches!(result, Err(TeclearError::AssertionFailed { .. })));
        }
    }
}
