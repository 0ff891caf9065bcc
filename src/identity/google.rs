use super::{IdentityVerifier, User};
use crate::config::IdentityResolvedConfig;
use crate::error::DirectoryError;
use crate::utils::http::build_client;
use async_trait::async_trait;
use chrono::Utc;
use moka::sync::Cache;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const MAX_CACHED_TOKENS: u64 = 10_000;

#[derive(Debug, Clone)]
struct VerifiedToken {
    user: User,
    /// Unix seconds.
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    /// Google returns this as a decimal string.
    exp: Value,
}

/// Verifies Google ID tokens against the `tokeninfo` endpoint.
pub struct GoogleIdentityVerifier {
    client: reqwest::Client,
    tokeninfo_url: Url,
    client_id: Option<String>,
    /// Keyed by the raw token so a hit always means the same token was verified.
    cache: Cache<Arc<str>, VerifiedToken>,
}

impl GoogleIdentityVerifier {
    pub fn new(cfg: &IdentityResolvedConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(
            concat!("pwadir/", env!("CARGO_PKG_VERSION")),
            cfg.proxy.as_ref(),
            false,
            Duration::from_secs(10),
        )?;
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_TOKENS)
            .time_to_live(Duration::from_secs(cfg.cache_ttl_secs))
            .build();

        Ok(Self {
            client,
            tokeninfo_url: cfg.tokeninfo_url.clone(),
            client_id: cfg.client_id.clone(),
            cache,
        })
    }

    fn check_claims(&self, info: TokenInfo) -> Result<VerifiedToken, DirectoryError> {
        if self.client_id.as_ref().is_some_and(|expected| *expected != info.aud) {
            warn!(aud = %info.aud, "ID token issued for another client");
            return Err(DirectoryError::Unauthorized(
                "ID token audience mismatch".to_string(),
            ));
        }

        let exp = parse_exp(&info.exp).ok_or_else(|| {
            DirectoryError::Unauthorized("ID token carries no expiry".to_string())
        })?;
        if exp <= Utc::now().timestamp() {
            return Err(DirectoryError::Unauthorized("ID token expired".to_string()));
        }

        Ok(VerifiedToken {
            user: User {
                id: info.sub,
                email: info.email,
                name: info.name,
            },
            exp,
        })
    }
}

fn parse_exp(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<User, DirectoryError> {
        if let Some(hit) = self.cache.get(id_token) {
            if hit.exp > Utc::now().timestamp() {
                return Ok(hit.user);
            }
            self.cache.invalidate(id_token);
        }

        let resp = self
            .client
            .get(self.tokeninfo_url.clone())
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        let status = resp.status();
        if status.is_client_error() {
            debug!(%status, "tokeninfo rejected ID token");
            return Err(DirectoryError::Unauthorized("invalid ID token".to_string()));
        }
        if !status.is_success() {
            return Err(DirectoryError::UpstreamStatus(status));
        }

        let info: TokenInfo = resp.json().await?;
        let verified = self.check_claims(info)?;
        let user = verified.user.clone();
        self.cache.insert(Arc::from(id_token), verified);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn verifier(client_id: Option<&str>) -> GoogleIdentityVerifier {
        let mut cfg = Config::default();
        cfg.upstream.identity.client_id = client_id.map(str::to_string);
        GoogleIdentityVerifier::new(&cfg.identity()).unwrap()
    }

    fn info(aud: &str, exp: Value) -> TokenInfo {
        TokenInfo {
            aud: aud.to_string(),
            sub: "1234".to_string(),
            email: Some("a@example.com".to_string()),
            name: None,
            exp,
        }
    }

    #[test]
    fn audience_must_match_configured_client() {
        let v = verifier(Some("client-a"));
        let future = json!((Utc::now().timestamp() + 600).to_string());

        assert!(v.check_claims(info("client-a", future.clone())).is_ok());
        assert!(matches!(
            v.check_claims(info("client-b", future)),
            Err(DirectoryError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let v = verifier(None);
        let past = json!(Utc::now().timestamp() - 1);
        assert!(matches!(
            v.check_claims(info("anyone", past)),
            Err(DirectoryError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn cached_tokens_only_answer_for_themselves() {
        let v = verifier(None);
        let claims = v
            .check_claims(info("anyone", json!(Utc::now().timestamp() + 600)))
            .unwrap();
        v.cache.insert(Arc::from("token-a"), claims);

        assert_eq!(v.verify("token-a").await.unwrap().id, "1234");
        assert!(v.cache.get("token-b").is_none());
    }

    #[test]
    fn exp_accepts_string_or_number() {
        assert_eq!(parse_exp(&json!("1700000000")), Some(1_700_000_000));
        assert_eq!(parse_exp(&json!(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(parse_exp(&json!(null)), None);
    }
}
