use crate::server::router::DirectoryState;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use subtle::ConstantTimeEq;

const X_ADMIN_KEY: &str = "x-admin-key";

fn extract_admin_token(headers: &HeaderMap) -> Option<String> {
    if let Some(k) = headers.get(X_ADMIN_KEY).and_then(|v| v.to_str().ok()) {
        return Some(k.to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Guards `/admin` routes with `basic.admin_key`.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdminKey;

impl FromRequestParts<DirectoryState> for RequireAdminKey {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DirectoryState,
    ) -> Result<Self, Self::Rejection> {
        match extract_admin_token(&parts.headers) {
            Some(key) => {
                let expected = state.admin_key.as_ref();
                if key.as_bytes().ct_eq(expected.as_bytes()).into() {
                    Ok(RequireAdminKey)
                } else {
                    Err(AuthError::InvalidKey)
                }
            }
            None => Err(AuthError::MissingKey),
        }
    }
}

pub enum AuthError {
    MissingKey,
    InvalidKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            AuthError::MissingKey => (StatusCode::UNAUTHORIZED, "Missing admin key"),
            AuthError::InvalidKey => (StatusCode::UNAUTHORIZED, "Invalid admin key"),
        };
        (
            status,
            Json(json!({ "error": { "code": "UNAUTHORIZED", "message": reason } })),
        )
            .into_response()
    }
}
