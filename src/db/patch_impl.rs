//! PwaPatchEnvelope -> DbPatchable implementation.
//!
//! This sits in the `db` module because it contains SQL/table knowledge.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::patch::{DbPatchable, PwaPatch, PwaPatchEnvelope};
use crate::error::DirectoryError;

#[async_trait]
impl DbPatchable for PwaPatchEnvelope {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), DirectoryError> {
        let id = self.id;
        let PwaPatch { visible } = self.patch.clone();

        let visible_set = visible.is_some();
        let updated_at = Utc::now();

        let res = sqlx::query(
            r#"
            UPDATE pwa
            SET
                visible = COALESCE(?, visible),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(visible)
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;

        let affected = res.rows_affected();
        debug!(
            table = "pwa",
            id,
            affected,
            updated_at = %updated_at,
            visible_set,
            "db patch applied"
        );

        if affected == 0 {
            return Err(DirectoryError::not_found(format!("PWA {id}")));
        }

        Ok(())
    }
}
