use serde::{Deserialize, Serialize};
use url::Url;

use super::UpstreamDefaults;

/// Google sign-in (ID token) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// OAuth client id the ID tokens must be issued for (`aud`). Unset skips the audience check.
    /// TOML: `upstream.identity.client_id`.
    #[serde(default)]
    pub client_id: Option<String>,

    /// TOML: `upstream.identity.tokeninfo_url`. Default: `https://oauth2.googleapis.com/tokeninfo`.
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: Url,

    /// Upper bound for caching a verified token, in seconds.
    /// TOML: `upstream.identity.cache_ttl_secs`. Default: `600`.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// TOML: `upstream.identity.proxy`. Falls back to `upstream.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct IdentityResolvedConfig {
    pub client_id: Option<String>,
    pub tokeninfo_url: Url,
    pub cache_ttl_secs: u64,
    pub proxy: Option<Url>,
}

impl IdentityConfig {
    pub fn resolve(&self, defaults: &UpstreamDefaults) -> IdentityResolvedConfig {
        IdentityResolvedConfig {
            client_id: self.client_id.clone().filter(|c| !c.trim().is_empty()),
            tokeninfo_url: self.tokeninfo_url.clone(),
            cache_ttl_secs: self.cache_ttl_secs.max(1),
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tokeninfo_url: default_tokeninfo_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            proxy: None,
        }
    }
}

fn default_tokeninfo_url() -> Url {
    Url::parse("https://oauth2.googleapis.com/tokeninfo").expect("valid tokeninfo URL")
}

fn default_cache_ttl_secs() -> u64 {
    600
}
