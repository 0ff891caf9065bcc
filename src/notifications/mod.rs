//! Topic based push notifications.

mod fcm;

pub use fcm::FcmPushProvider;

use crate::error::DirectoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const MAX_TOPIC_LEN: usize = 900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn subscribe(&self, token: &str, topic: &str) -> Result<(), DirectoryError>;

    async fn unsubscribe(&self, token: &str, topic: &str) -> Result<(), DirectoryError>;

    async fn publish(&self, topic: &str, notification: &Notification)
    -> Result<(), DirectoryError>;
}

/// Topic names follow the FCM rule `[a-zA-Z0-9-_.~%]{1,900}`.
pub fn validate_topic(topic: &str) -> Result<(), DirectoryError> {
    let valid = !topic.is_empty()
        && topic.len() <= MAX_TOPIC_LEN
        && topic
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~' | b'%'));

    if valid {
        Ok(())
    } else {
        Err(DirectoryError::InvalidRequest(format!(
            "invalid topic name: {topic:?}"
        )))
    }
}

pub(crate) fn validate_token(token: &str) -> Result<(), DirectoryError> {
    // Tokens end up in a URL path segment.
    if token.is_empty() || token.contains(['/', '?', '#']) || token.chars().any(char::is_whitespace)
    {
        return Err(DirectoryError::InvalidRequest(
            "invalid registration token".to_string(),
        ));
    }
    Ok(())
}
