use super::{Notification, PushProvider, validate_token, validate_topic};
use crate::config::NotificationsResolvedConfig;
use crate::error::{DirectoryError, IsRetryable};
use crate::utils::http::build_client;
use crate::utils::logging::{body_preview, with_pretty_json_debug};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Firebase Cloud Messaging via the legacy server-key API.
pub struct FcmPushProvider {
    client: reqwest::Client,
    /// `None` while no server key is configured.
    auth: Option<HeaderValue>,
    iid_url: Url,
    fcm_url: Url,
    retry_policy: ExponentialBuilder,
}

impl FcmPushProvider {
    pub fn new(cfg: &NotificationsResolvedConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(
            concat!("pwadir/", env!("CARGO_PKG_VERSION")),
            cfg.proxy.as_ref(),
            false,
            Duration::from_secs(15),
        )?;

        let auth = cfg.server_key.as_deref().and_then(|key| {
            let value = HeaderValue::from_str(&format!("key={key}"));
            if value.is_err() {
                warn!("notifications.server_key is not a valid header value, notifications disabled");
            }
            value.ok().map(|mut v| {
                v.set_sensitive(true);
                v
            })
        });

        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500))
            .with_max_times(cfg.retry_max_times)
            .with_jitter();

        Ok(Self {
            client,
            auth,
            iid_url: cfg.iid_url.clone(),
            fcm_url: cfg.fcm_url.clone(),
            retry_policy,
        })
    }

    fn headers(&self) -> Result<HeaderMap, DirectoryError> {
        let auth = self
            .auth
            .clone()
            .ok_or(DirectoryError::NotificationsDisabled)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    fn iid_endpoint(&self, path: &str) -> Result<Url, DirectoryError> {
        let base = self.iid_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    async fn post_once<T: Serialize + Sync>(
        &self,
        action: &'static str,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&T>,
    ) -> Result<(), DirectoryError> {
        let mut request = self.client.post(url.clone()).headers(headers.clone());
        request = match body {
            Some(body) => request.json(body),
            // IID relation endpoints take an empty body but still want a length.
            None => request.header(reqwest::header::CONTENT_LENGTH, "0"),
        };

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let preview = resp.bytes().await.map(|b| body_preview(&b)).unwrap_or_default();
        debug!(action, %status, body = %preview, "FCM request failed");
        Err(DirectoryError::UpstreamStatus(status))
    }

    async fn post<T: Serialize + Sync>(
        &self,
        action: &'static str,
        url: Url,
        body: Option<&T>,
    ) -> Result<(), DirectoryError> {
        let headers = self.headers()?;
        (|| self.post_once(action, &url, &headers, body))
            .retry(self.retry_policy)
            .when(|e: &DirectoryError| e.is_retryable())
            .await
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    async fn subscribe(&self, token: &str, topic: &str) -> Result<(), DirectoryError> {
        validate_topic(topic)?;
        validate_token(token)?;
        let url = self.iid_endpoint(&format!("/iid/v1/{token}/rel/topics/{topic}"))?;
        self.post::<()>("subscribe", url, None).await?;
        info!(topic, "Token subscribed to topic");
        Ok(())
    }

    async fn unsubscribe(&self, token: &str, topic: &str) -> Result<(), DirectoryError> {
        validate_topic(topic)?;
        validate_token(token)?;
        let url = self.iid_endpoint("/iid/v1:batchRemove")?;
        let body = json!({
            "to": format!("/topics/{topic}"),
            "registration_tokens": [token],
        });
        self.post("unsubscribe", url, Some(&body)).await?;
        info!(topic, "Token unsubscribed from topic");
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        notification: &Notification,
    ) -> Result<(), DirectoryError> {
        validate_topic(topic)?;
        let body = json!({
            "to": format!("/topics/{topic}"),
            "notification": notification,
        });
        with_pretty_json_debug(&body, |pretty| {
            debug!(topic, "FCM publish payload:\n{pretty}");
        });
        self.post("publish", self.fcm_url.clone(), Some(&body)).await?;
        info!(topic, title = %notification.title, "Notification published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn provider(server_key: Option<&str>) -> FcmPushProvider {
        let mut cfg = Config::default();
        cfg.upstream.notifications.server_key = server_key.map(str::to_string);
        FcmPushProvider::new(&cfg.notifications()).unwrap()
    }

    #[tokio::test]
    async fn missing_server_key_disables_every_call() {
        let p = provider(None);
        let n = Notification {
            title: "t".into(),
            body: "b".into(),
            icon: None,
            click_action: None,
        };
        assert!(matches!(
            p.subscribe("tok", "new-apps").await,
            Err(DirectoryError::NotificationsDisabled)
        ));
        assert!(matches!(
            p.publish("new-apps", &n).await,
            Err(DirectoryError::NotificationsDisabled)
        ));
    }

    #[tokio::test]
    async fn invalid_topic_is_rejected_before_any_request() {
        let p = provider(Some("secret"));
        assert!(matches!(
            p.unsubscribe("tok", "bad topic").await,
            Err(DirectoryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn iid_paths_join_onto_the_base() {
        let p = provider(Some("secret"));
        let url = p.iid_endpoint("/iid/v1/tok/rel/topics/new-apps").unwrap();
        assert_eq!(
            url.as_str(),
            "https://iid.googleapis.com/iid/v1/tok/rel/topics/new-apps"
        );
    }
}
