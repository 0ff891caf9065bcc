use serde::{Deserialize, Serialize};
use url::Url;

use super::UpstreamDefaults;

/// Push notification (FCM) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    /// FCM legacy server key. Notifications are disabled while unset.
    /// TOML: `upstream.notifications.server_key`.
    #[serde(default)]
    pub server_key: Option<String>,

    /// Instance ID API base, used for topic (un)subscription.
    /// TOML: `upstream.notifications.iid_url`. Default: `https://iid.googleapis.com`.
    #[serde(default = "default_iid_url")]
    pub iid_url: Url,

    /// FCM send endpoint.
    /// TOML: `upstream.notifications.fcm_url`. Default: `https://fcm.googleapis.com/fcm/send`.
    #[serde(default = "default_fcm_url")]
    pub fcm_url: Url,

    /// Topic announced to whenever a new PWA is listed.
    /// TOML: `upstream.notifications.new_app_topic`. Default: `new-apps`.
    #[serde(default = "default_new_app_topic")]
    pub new_app_topic: String,

    /// TOML: `upstream.notifications.proxy`. Falls back to `upstream.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `upstream.notifications.retry_max_times`.
    #[serde(default)]
    pub retry_max_times: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct NotificationsResolvedConfig {
    pub server_key: Option<String>,
    pub iid_url: Url,
    pub fcm_url: Url,
    pub new_app_topic: String,
    pub proxy: Option<Url>,
    pub retry_max_times: usize,
}

impl NotificationsConfig {
    pub fn resolve(&self, defaults: &UpstreamDefaults) -> NotificationsResolvedConfig {
        NotificationsResolvedConfig {
            server_key: self.server_key.clone().filter(|k| !k.trim().is_empty()),
            iid_url: self.iid_url.clone(),
            fcm_url: self.fcm_url.clone(),
            new_app_topic: self.new_app_topic.clone(),
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            retry_max_times: self.retry_max_times.unwrap_or(defaults.retry_max_times),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            server_key: None,
            iid_url: default_iid_url(),
            fcm_url: default_fcm_url(),
            new_app_topic: default_new_app_topic(),
            proxy: None,
            retry_max_times: None,
        }
    }
}

fn default_iid_url() -> Url {
    Url::parse("https://iid.googleapis.com").expect("valid Instance ID URL")
}

fn default_fcm_url() -> Url {
    Url::parse("https://fcm.googleapis.com/fcm/send").expect("valid FCM send URL")
}

fn default_new_app_topic() -> String {
    "new-apps".to_string()
}
