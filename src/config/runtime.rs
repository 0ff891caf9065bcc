use serde::{Deserialize, Serialize};

/// Page cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TOML: `cache.ttl_secs`. Default: `300`.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached pages.
    /// TOML: `cache.max_capacity`. Default: `10000`.
    #[serde(default = "default_cache_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_capacity: default_cache_max_capacity(),
        }
    }
}

/// Pagination settings for listings, the API and the feed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    /// TOML: `listing.page_size`. Default: `32`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound for a client-provided `limit`.
    /// TOML: `listing.max_page_size`. Default: `100`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Number of items in the RSS feed.
    /// TOML: `listing.feed_size`. Default: `20`.
    #[serde(default = "default_feed_size")]
    pub feed_size: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            feed_size: default_feed_size(),
        }
    }
}

/// Background re-validation queue settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// TOML: `tasks.enabled`. Default: `true`.
    #[serde(default = "default_tasks_enabled")]
    pub enabled: bool,

    /// Seconds between two queue polls.
    /// TOML: `tasks.poll_interval_secs`. Default: `10`.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Tasks popped per poll.
    /// TOML: `tasks.batch_size`. Default: `4`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Executions allowed per minute (each runs a manifest fetch and an audit).
    /// TOML: `tasks.per_minute`. Default: `12`.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// A failing task is dropped after this many attempts.
    /// TOML: `tasks.max_attempts`. Default: `3`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            enabled: default_tasks_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            per_minute: default_per_minute(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_capacity() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    32
}

fn default_max_page_size() -> u32 {
    100
}

fn default_feed_size() -> u32 {
    20
}

fn default_tasks_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_batch_size() -> usize {
    4
}

fn default_per_minute() -> u32 {
    12
}

fn default_max_attempts() -> i64 {
    3
}
