use crate::error::DirectoryError;
use crate::identity::User;
use crate::server::router::DirectoryState;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

/// A signed-in user, resolved from `Authorization: Bearer <id_token>`.
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

impl FromRequestParts<DirectoryState> for RequireUser {
    type Rejection = DirectoryError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DirectoryState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| DirectoryError::Unauthorized("sign-in required".to_string()))?;

        let user = state.services.identity.verify(auth.token()).await?;
        Ok(RequireUser(user))
    }
}
