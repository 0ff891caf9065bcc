use crate::db::{DbActorHandle, DbPwa};
use crate::error::DirectoryError;
use crate::identity::User;
use tracing::debug;

/// Per-user bookmarks of listed PWAs.
#[derive(Clone)]
pub struct FavoritesService {
    db: DbActorHandle,
}

impl FavoritesService {
    pub fn new(db: DbActorHandle) -> Self {
        Self { db }
    }

    /// Idempotent; unknown or hidden PWAs are a 404.
    pub async fn add(&self, user: &User, pwa_id: i64) -> Result<(), DirectoryError> {
        match self.db.get_pwa(pwa_id).await? {
            Some(pwa) if pwa.visible => {}
            _ => return Err(DirectoryError::not_found(format!("PWA {pwa_id}"))),
        }
        self.db.add_favorite(&user.id, pwa_id).await?;
        debug!(user_id = %user.id, pwa_id, "Favorite added");
        Ok(())
    }

    /// Returns whether a favorite was actually removed.
    pub async fn remove(&self, user: &User, pwa_id: i64) -> Result<bool, DirectoryError> {
        let removed = self.db.remove_favorite(&user.id, pwa_id).await?;
        debug!(user_id = %user.id, pwa_id, removed, "Favorite removed");
        Ok(removed)
    }

    /// Most recently favorited first; hidden PWAs are left out.
    pub async fn list(&self, user: &User) -> Result<Vec<DbPwa>, DirectoryError> {
        let mut pwas = self.db.list_favorites(&user.id).await?;
        pwas.retain(|p| p.visible);
        Ok(pwas)
    }
}
