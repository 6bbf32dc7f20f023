//! Persistence for crawl lifecycle, link edges, issues, and checkpoints

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CrawlStore, StorageError, StorageResult};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlStatus {
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
}

impl CrawlStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            CrawlStatus::Running => "running",
            CrawlStatus::Paused => "paused",
            CrawlStatus::Completed => "completed",
            CrawlStatus::Failed => "failed",
            CrawlStatus::Stopped => "stopped",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(CrawlStatus::Running),
            "paused" => Some(CrawlStatus::Paused),
            "completed" => Some(CrawlStatus::Completed),
            "failed" => Some(CrawlStatus::Failed),
            "stopped" => Some(CrawlStatus::Stopped),
            _ => None,
        }
    }

    /// Only running, paused, and failed crawls may be resumed
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            CrawlStatus::Running | CrawlStatus::Paused | CrawlStatus::Failed
        )
    }

    /// Terminal statuses get a completion timestamp
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CrawlStatus::Completed | CrawlStatus::Failed | CrawlStatus::Stopped
        )
    }
}

/// One row of the crawls table
#[derive(Debug, Clone)]
pub struct CrawlRow {
    pub id: i64,
    pub base_url: String,
    pub base_domain: String,
    pub config_hash: String,
    pub status: CrawlStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub discovered: u64,
    pub visited: u64,
    pub pending: u64,
}
