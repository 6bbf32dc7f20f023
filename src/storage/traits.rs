//! Storage trait and error types

use crate::analyzer::Issue;
use crate::frontier::{FrontierStats, LinkEdge};
use crate::storage::{CrawlRow, CrawlStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl not found: {0}")]
    CrawlNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence contract for a crawl
///
/// The checkpoint blob is opaque to the store; it only supports "write blob
/// for crawl ID" and "read last blob for crawl ID". Implementations must be
/// safe to share across worker tasks.
pub trait CrawlStore: Send + Sync {
    /// Creates a new crawl in `running` status and returns its ID
    fn create_crawl(
        &self,
        base_url: &str,
        base_domain: &str,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Gets a crawl by ID
    fn get_crawl(&self, crawl_id: i64) -> StorageResult<Option<CrawlRow>>;

    /// Updates the status of a crawl, stamping `completed_at` on terminal
    /// statuses
    fn set_status(&self, crawl_id: i64, status: CrawlStatus) -> StorageResult<()>;

    /// Updates the crawl's progress counters
    fn update_stats(&self, crawl_id: i64, stats: &FrontierStats) -> StorageResult<()>;

    /// Overwrites the checkpoint blob for a crawl
    fn save_checkpoint(&self, crawl_id: i64, blob: &str) -> StorageResult<()>;

    /// Reads the last saved checkpoint blob, if any
    fn load_checkpoint(&self, crawl_id: i64) -> StorageResult<Option<String>>;

    /// Writes a batch of link edges; duplicate (source, target) pairs are
    /// ignored
    fn save_links_batch(&self, crawl_id: i64, links: &[LinkEdge]) -> StorageResult<usize>;

    /// Writes a batch of issues
    fn save_issues_batch(&self, crawl_id: i64, issues: &[Issue]) -> StorageResult<usize>;

    /// Loads all link edges recorded for a crawl
    fn load_links(&self, crawl_id: i64) -> StorageResult<Vec<LinkEdge>>;

    /// Loads all issues recorded for a crawl
    fn load_issues(&self, crawl_id: i64) -> StorageResult<Vec<Issue>>;

    /// Crawls still marked `running`, candidates for crash recovery
    fn find_crashed_crawls(&self) -> StorageResult<Vec<CrawlRow>>;
}
