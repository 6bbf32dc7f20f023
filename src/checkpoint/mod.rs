//! Crash-safe checkpointing of frontier state
//!
//! A checkpoint is a serializable snapshot of the frontier's traversal
//! state. The coordinator persists it through the [`CrawlStore`] as an
//! opaque blob, overwriting the previous checkpoint for the crawl, and can
//! rehydrate a frontier after a crash so an interrupted crawl resumes
//! without re-visiting completed URLs.

use crate::frontier::{Frontier, TrapTable};
use crate::storage::{CrawlStatus, CrawlStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A durable snapshot of frontier traversal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub visited: Vec<String>,
    pub discovered: Vec<String>,
    pub pending: Vec<(String, u32)>,
    pub traps: TrapTable,
    pub discovered_count: u64,
    pub visited_count: u64,
}

/// Saves and restores checkpoints for one crawl
pub struct CheckpointCoordinator {
    store: Arc<dyn CrawlStore>,
    crawl_id: i64,
}

impl CheckpointCoordinator {
    pub fn new(store: Arc<dyn CrawlStore>, crawl_id: i64) -> Self {
        CheckpointCoordinator { store, crawl_id }
    }

    /// Snapshots the frontier and writes the checkpoint blob
    ///
    /// The snapshot is taken under the frontier's lock; serialization and
    /// the store write happen outside it, so an in-flight save never blocks
    /// workers for the duration of I/O. A persistence failure is returned to
    /// the caller and logged, since it threatens resumability, but the crawl
    /// can continue without durability.
    pub fn save(&self, frontier: &Frontier) -> Result<()> {
        let checkpoint = frontier.snapshot();
        let blob = serde_json::to_string(&checkpoint)?;
        match self.store.save_checkpoint(self.crawl_id, &blob) {
            Ok(()) => {
                info!(
                    crawl_id = self.crawl_id,
                    visited = checkpoint.visited_count,
                    pending = checkpoint.pending.len(),
                    "checkpoint saved"
                );
                Ok(())
            }
            Err(e) => {
                warn!(crawl_id = self.crawl_id, error = %e, "checkpoint save failed");
                Err(e.into())
            }
        }
    }

    /// Loads the last saved checkpoint for this crawl, if any
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        match self.store.load_checkpoint(self.crawl_id)? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    /// Restores the last checkpoint into a frontier
    ///
    /// Returns `true` when a checkpoint existed and was applied. The crawl
    /// must be in a resumable status (`running`, `paused`, or `failed`).
    pub fn resume_into(&self, frontier: &Frontier) -> Result<bool> {
        let crawl = self.store.get_crawl(self.crawl_id)?;
        if let Some(crawl) = &crawl {
            if !crawl.status.is_resumable() {
                warn!(
                    crawl_id = self.crawl_id,
                    status = crawl.status.to_db_string(),
                    "crawl is not resumable"
                );
                return Ok(false);
            }
        }
        match self.load()? {
            Some(checkpoint) => {
                info!(
                    crawl_id = self.crawl_id,
                    visited = checkpoint.visited_count,
                    pending = checkpoint.pending.len(),
                    "resuming from checkpoint"
                );
                frontier.restore(&checkpoint);
                self.store.set_status(self.crawl_id, CrawlStatus::Running)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use tempfile::NamedTempFile;

    fn open_store() -> (Arc<dyn CrawlStore>, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteStore::open(file.path()).unwrap();
        (Arc::new(store), file)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (store, _file) = open_store();
        let crawl_id = store
            .create_crawl("https://example.com/", "example.com", "hash")
            .unwrap();
        let coordinator = CheckpointCoordinator::new(Arc::clone(&store), crawl_id);

        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&[
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ]);
        frontier.mark_visited("https://example.com/done");

        coordinator.save(&frontier).unwrap();
        let checkpoint = coordinator.load().unwrap().unwrap();
        assert_eq!(checkpoint.visited, vec!["https://example.com/done"]);
        assert_eq!(checkpoint.pending.len(), 2);
    }

    #[test]
    fn test_load_without_save_is_none() {
        let (store, _file) = open_store();
        let crawl_id = store
            .create_crawl("https://example.com/", "example.com", "hash")
            .unwrap();
        let coordinator = CheckpointCoordinator::new(store, crawl_id);
        assert!(coordinator.load().unwrap().is_none());
    }

    #[test]
    fn test_resume_rehydrates_frontier() {
        let (store, _file) = open_store();
        let crawl_id = store
            .create_crawl("https://example.com/", "example.com", "hash")
            .unwrap();
        let coordinator = CheckpointCoordinator::new(Arc::clone(&store), crawl_id);

        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/next".to_string()]);
        frontier.mark_visited("https://example.com/done");
        coordinator.save(&frontier).unwrap();

        let resumed = Frontier::new("example.com", 25);
        assert!(coordinator.resume_into(&resumed).unwrap());
        assert_eq!(resumed.stats(), frontier.stats());
        assert_eq!(
            resumed.next_url(),
            Some(("https://example.com/next".to_string(), 0))
        );
    }

    #[test]
    fn test_completed_crawl_is_not_resumed() {
        let (store, _file) = open_store();
        let crawl_id = store
            .create_crawl("https://example.com/", "example.com", "hash")
            .unwrap();
        let coordinator = CheckpointCoordinator::new(Arc::clone(&store), crawl_id);

        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/a".to_string()]);
        coordinator.save(&frontier).unwrap();
        store.set_status(crawl_id, CrawlStatus::Completed).unwrap();

        let resumed = Frontier::new("example.com", 25);
        assert!(!coordinator.resume_into(&resumed).unwrap());
        assert_eq!(resumed.next_url(), None);
    }

    #[test]
    fn test_save_overwrites_previous_checkpoint() {
        let (store, _file) = open_store();
        let crawl_id = store
            .create_crawl("https://example.com/", "example.com", "hash")
            .unwrap();
        let coordinator = CheckpointCoordinator::new(Arc::clone(&store), crawl_id);

        let frontier = Frontier::new("example.com", 25);
        frontier.seed(&["https://example.com/a".to_string()]);
        coordinator.save(&frontier).unwrap();

        frontier.next_url();
        frontier.mark_visited("https://example.com/a");
        coordinator.save(&frontier).unwrap();

        let checkpoint = coordinator.load().unwrap().unwrap();
        assert!(checkpoint.pending.is_empty());
        assert_eq!(checkpoint.visited_count, 1);
    }
}
