mod fetch;
mod identity;
mod lighthouse;
mod notifications;

pub use fetch::{FetchConfig, FetchResolvedConfig};
pub use identity::{IdentityConfig, IdentityResolvedConfig};
pub use lighthouse::{LighthouseConfig, LighthouseResolvedConfig};
pub use notifications::{NotificationsConfig, NotificationsResolvedConfig};

use serde::{Deserialize, Serialize};
use url::Url;

/// Global upstream defaults (used when a service-level value is unset).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamDefaults {
    /// Optional outbound HTTP proxy. If set, used for reqwest clients.
    /// TOML: `upstream.defaults.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `upstream.defaults.enable_multiplexing`. Default: `false`.
    #[serde(default = "default_enable_multiplexing")]
    pub enable_multiplexing: bool,

    /// Max retry attempts for upstream calls.
    /// TOML: `upstream.defaults.retry_max_times`. Default: `2`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,
}

impl Default for UpstreamDefaults {
    fn default() -> Self {
        Self {
            proxy: None,
            enable_multiplexing: default_enable_multiplexing(),
            retry_max_times: default_retry_max_times(),
        }
    }
}

/// All outbound service configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UpstreamConfig {
    /// Global defaults for upstreams (overridden per service if set).
    #[serde(default)]
    pub defaults: UpstreamDefaults,

    /// Manifest fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Lighthouse runner.
    #[serde(default)]
    pub lighthouse: LighthouseConfig,

    /// Push notification provider (FCM).
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Google ID token verification.
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_enable_multiplexing() -> bool {
    false
}

fn default_retry_max_times() -> usize {
    2
}
