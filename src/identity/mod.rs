//! Signed-in users.

mod google;

pub use google::GoogleIdentityVerifier;

use crate::error::DirectoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable subject id from the identity provider.
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolves an ID token to a user, or `Unauthorized`.
    async fn verify(&self, id_token: &str) -> Result<User, DirectoryError>;
}
