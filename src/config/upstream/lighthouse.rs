use serde::{Deserialize, Serialize};
use url::Url;

use super::UpstreamDefaults;

/// Lighthouse runner configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LighthouseConfig {
    /// Run audits at all. Disabled audits leave PWA scores empty.
    /// TOML: `upstream.lighthouse.enabled`. Default: `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Runner endpoint; PageSpeed Insights v5 compatible.
    /// TOML: `upstream.lighthouse.api_url`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Optional API key appended as `key=`.
    /// TOML: `upstream.lighthouse.api_key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Audits are slow; this is the overall request timeout in seconds.
    /// TOML: `upstream.lighthouse.timeout_secs`. Default: `120`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TOML: `upstream.lighthouse.proxy`. Falls back to `upstream.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `upstream.lighthouse.enable_multiplexing`.
    #[serde(default)]
    pub enable_multiplexing: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct LighthouseResolvedConfig {
    pub enabled: bool,
    pub api_url: Url,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub proxy: Option<Url>,
    pub enable_multiplexing: bool,
}

impl LighthouseConfig {
    pub fn resolve(&self, defaults: &UpstreamDefaults) -> LighthouseResolvedConfig {
        LighthouseResolvedConfig {
            enabled: self.enabled,
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout_secs: self.timeout_secs.max(1),
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            enable_multiplexing: self
                .enable_multiplexing
                .unwrap_or(defaults.enable_multiplexing),
        }
    }
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            proxy: None,
            enable_multiplexing: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_api_url() -> Url {
    Url::parse("https://www.googleapis.com/pagespeedonline/v5/runPagespeed")
        .expect("valid PageSpeed Insights URL")
}

fn default_timeout_secs() -> u64 {
    120
}
