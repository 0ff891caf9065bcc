use crate::db::{DbActorHandle, DbTask};
use crate::error::DirectoryError;
use tracing::debug;

/// Durable FIFO of PWAs waiting for re-validation, at most one entry per PWA.
#[derive(Clone)]
pub struct TaskQueue {
    db: DbActorHandle,
}

impl TaskQueue {
    pub fn new(db: DbActorHandle) -> Self {
        Self { db }
    }

    /// Queues `pwa_id`, or moves its pending task to the back with a fresh attempt count.
    pub async fn push(&self, pwa_id: i64) -> Result<(), DirectoryError> {
        if !self.db.push_task(pwa_id).await? {
            return Err(DirectoryError::not_found(format!("PWA {pwa_id}")));
        }
        debug!(pwa_id, "Task queued");
        Ok(())
    }

    /// Oldest pending task, removed from the queue.
    pub async fn pop(&self) -> Result<Option<DbTask>, DirectoryError> {
        Ok(self.db.pop_tasks(1).await?.into_iter().next())
    }

    pub async fn pop_batch(&self, limit: usize) -> Result<Vec<DbTask>, DirectoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.pop_tasks(limit).await
    }

    /// Puts a failed task back with its attempt count bumped.
    pub async fn requeue(&self, task: DbTask) -> Result<(), DirectoryError> {
        self.db.requeue_task(task).await
    }

    pub async fn len(&self) -> Result<i64, DirectoryError> {
        self.db.count_tasks().await
    }

    pub async fn is_empty(&self) -> Result<bool, DirectoryError> {
        Ok(self.len().await? == 0)
    }

    /// Queues every PWA without a pending task; returns how many were added.
    pub async fn enqueue_all(&self) -> Result<u64, DirectoryError> {
        let queued = self.db.enqueue_all().await?;
        debug!(queued, "All PWAs queued for re-validation");
        Ok(queued)
    }
}
