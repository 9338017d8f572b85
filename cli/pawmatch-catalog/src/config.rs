//! Configuration types for gateway client construction.

use std::collections::BTreeMap;
use std::time::Duration;

/// The hosted adoption service.
pub const DEFAULT_BASE_URL: &str = "https://frontend-take-home-service.fetch.com";

/// Configuration for gateway client construction.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL for the catalog service, without a trailing slash.
    pub base_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Custom user agent, reqwest's default otherwise.
    pub user_agent: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    /// Configuration for a service at `base_url` with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Join an endpoint path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}
