//! Suite configuration.

use serde::{Deserialize, Serialize};

use crate::sync::SyncOptions;
use crate::wait::WaitOptions;

/// Default target: the demo storefront the reference flows run against
pub const DEFAULT_BASE_URL: &str = "https://www.demoblaze.com";

/// Default command timeout (8 seconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 8000;

/// Configuration for a test suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Base URL of the application under test
    pub base_url: String,
    /// Default bound for discovery and UI waits, in milliseconds
    pub default_timeout_ms: u64,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Input synchronization options
    pub sync: SyncOptions,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sync: SyncOptions::default(),
        }
    }
}

impl SuiteConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default wait bound
    #[must_use]
    pub const fn with_default_timeout(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set synchronization options
    #[must_use]
    pub const fn with_sync(mut self, sync: SyncOptions) -> Self {
        self.sync = sync;
        self
    }

    /// Apply environment overrides (`TECLEAR_BASE_URL`, `TECLEAR_TIMEOUT_MS`,
    /// `CHROMIUM_PATH`)
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TECLEAR_BASE_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(ms) = std::env::var("TECLEAR_TIMEOUT_MS") {
            if let Ok(parsed) = ms.parse() {
                config.default_timeout_ms = parsed;
            }
        }
        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            if !path.is_empty() {
                config.chromium_path = Some(path);
            }
        }
        config
    }

    /// Wait options derived from the default timeout
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new().with_timeout(self.default_timeout_ms)
    }

    /// Resolve a path against the base URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_suite_settings() {
        let config = SuiteConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_timeout_ms, 8000);
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 800));
    }

    #[test]
    fn test_url_joining_normalizes_slashes() {
        let config = SuiteConfig::new().with_base_url("https://example.com/");
        assert_eq!(config.url("/cart.html"), "https://example.com/cart.html");
        assert_eq!(config.url("cart.html"), "https://example.com/cart.html");
    }

    #[test]
    fn test_builder_chaining() {
        let config = SuiteConfig::new()
            .with_default_timeout(2000)
            .with_viewport(800, 600);
        assert_eq!(config.wait_options().timeout_ms, 2000);
        assert_eq!(config.viewport_width, 800);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = SuiteConfig::new().with_base_url("https://staging.example.com");
        let json = serde_json::to_string(&config).unwrap();
        let back: SuiteConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url, "https://staging.example.com");
    }
}
