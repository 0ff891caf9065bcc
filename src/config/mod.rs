mod basic;
mod runtime;
mod upstream;

pub use basic::BasicConfig;
pub use runtime::{CacheConfig, ListingConfig, TasksConfig};
pub use upstream::{
    FetchConfig, FetchResolvedConfig, IdentityConfig, IdentityResolvedConfig, LighthouseConfig,
    LighthouseResolvedConfig, NotificationsConfig, NotificationsResolvedConfig, UpstreamConfig,
    UpstreamDefaults,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Outbound services (see `upstream` table in config.toml).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "PWADIR_";

impl Config {
    /// Builds a Figment that merges defaults, a config TOML file and `PWADIR_*` env overrides.
    ///
    /// Nested keys use `__`, e.g. `PWADIR_BASIC__ADMIN_KEY`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration (defaults, TOML, env) and validates required fields.
    pub fn from_toml() -> Self {
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if cfg.basic.admin_key.trim().is_empty() {
            panic!("basic.admin_key must be set and non-empty");
        }
        cfg
    }

    pub fn fetch(&self) -> FetchResolvedConfig {
        self.upstream.fetch.resolve(&self.upstream.defaults)
    }

    pub fn lighthouse(&self) -> LighthouseResolvedConfig {
        self.upstream.lighthouse.resolve(&self.upstream.defaults)
    }

    pub fn notifications(&self) -> NotificationsResolvedConfig {
        self.upstream.notifications.resolve(&self.upstream.defaults)
    }

    pub fn identity(&self) -> IdentityResolvedConfig {
        self.upstream.identity.resolve(&self.upstream.defaults)
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_toml);
