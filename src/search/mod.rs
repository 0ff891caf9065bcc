//! In-process full text search over visible PWAs.
//!
//! The index is rebuilt from scratch whenever the data it was built from has
//! moved on: either a write marked it stale, or the `(max(updated_at), count)`
//! stamp reported by the database no longer matches.

mod index;
mod tokenize;

pub use index::{SearchHit, SearchIndex};
pub use tokenize::tokenize;

use crate::db::{DbActorHandle, IndexStamp};
use crate::error::DirectoryError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::info;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Default)]
struct IndexState {
    index: SearchIndex,
    /// `None` until the first build.
    stamp: Option<IndexStamp>,
}

pub struct SearchService {
    db: DbActorHandle,
    state: RwLock<IndexState>,
    stale: AtomicBool,
}

impl SearchService {
    pub fn new(db: DbActorHandle) -> Self {
        Self {
            db,
            state: RwLock::new(IndexState::default()),
            stale: AtomicBool::new(true),
        }
    }

    /// Forces a rebuild before the next query.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DirectoryError> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let current = self.db.index_stamp().await?;

        {
            let state = self.state.read().await;
            if !self.needs_rebuild(&state, &current) {
                return Ok(state.index.query(query, limit));
            }
        }

        let mut state = self.state.write().await;
        // Another query may have rebuilt while we waited for the lock.
        if self.needs_rebuild(&state, &current) {
            self.rebuild(&mut state, current).await?;
        }
        Ok(state.index.query(query, limit))
    }

    /// Rebuilds immediately; returns the number of indexed PWAs.
    pub async fn reindex(&self) -> Result<usize, DirectoryError> {
        let current = self.db.index_stamp().await?;
        let mut state = self.state.write().await;
        self.rebuild(&mut state, current).await?;
        Ok(state.index.len())
    }

    fn needs_rebuild(&self, state: &IndexState, current: &IndexStamp) -> bool {
        self.stale.load(Ordering::Acquire) || state.stamp.as_ref() != Some(current)
    }

    async fn rebuild(&self, state: &mut IndexState, stamp: IndexStamp) -> Result<(), DirectoryError> {
        let start = Instant::now();
        // Cleared before reading so writes racing with the rebuild mark it again.
        self.stale.store(false, Ordering::Release);

        let rows = match self.db.list_visible_pwas().await {
            Ok(rows) => rows,
            Err(e) => {
                self.stale.store(true, Ordering::Release);
                return Err(e);
            }
        };

        state.index = SearchIndex::build(rows);
        state.stamp = Some(stamp);
        info!(
            docs = state.index.len(),
            took_ms = start.elapsed().as_millis() as u64,
            "Search index rebuilt"
        );
        Ok(())
    }
}
