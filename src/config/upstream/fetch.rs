use serde::{Deserialize, Serialize};
use url::Url;

use super::UpstreamDefaults;

/// Manifest fetch configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// TOML: `upstream.fetch.proxy`. Falls back to `upstream.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// User agent sent when fetching manifests.
    /// TOML: `upstream.fetch.user_agent`.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Overall request timeout in seconds.
    /// TOML: `upstream.fetch.timeout_secs`. Default: `15`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest accepted manifest body, in bytes.
    /// TOML: `upstream.fetch.max_body_bytes`. Default: `524288`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// TOML: `upstream.fetch.enable_multiplexing`.
    /// Falls back to `upstream.defaults.enable_multiplexing`.
    #[serde(default)]
    pub enable_multiplexing: Option<bool>,

    /// TOML: `upstream.fetch.retry_max_times`.
    /// Falls back to `upstream.defaults.retry_max_times`.
    #[serde(default)]
    pub retry_max_times: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FetchResolvedConfig {
    pub proxy: Option<Url>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
    pub enable_multiplexing: bool,
    pub retry_max_times: usize,
}

impl FetchConfig {
    pub fn resolve(&self, defaults: &UpstreamDefaults) -> FetchResolvedConfig {
        FetchResolvedConfig {
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            user_agent: self.user_agent.clone(),
            timeout_secs: self.timeout_secs.max(1),
            max_body_bytes: self.max_body_bytes.max(1),
            enable_multiplexing: self
                .enable_multiplexing
                .unwrap_or(defaults.enable_multiplexing),
            retry_max_times: self.retry_max_times.unwrap_or(defaults.retry_max_times),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            enable_multiplexing: None,
            retry_max_times: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("pwadir/{} (+manifest-fetcher)", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_body_bytes() -> usize {
    512 * 1024
}
