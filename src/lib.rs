//! Crawlplane: the control plane of an SEO-audit website crawler
//!
//! This crate decides which URLs to visit (with crawl-trap suppression),
//! tracks the audit link graph, classifies fetched pages for technical and
//! content issues, detects near-duplicate content across a crawl, and
//! checkpoints frontier state so an interrupted crawl can resume. Fetching
//! and HTML extraction are external collaborators that deliver typed
//! [`record::PageRecord`]s.

pub mod analyzer;
pub mod checkpoint;
pub mod config;
pub mod frontier;
pub mod record;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawlplane operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Page record error for {url}: {message}")]
    PageRecord { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclusion pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for crawlplane operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analyzer::{Analyzer, Issue, IssueCategory, Severity};
pub use checkpoint::{Checkpoint, CheckpointCoordinator};
pub use config::Config;
pub use frontier::{Frontier, FrontierStats, LinkEdge, LinkPlacement, TrapPattern};
pub use record::PageRecord;
pub use storage::CrawlStatus;
pub use url::{extract_domain, normalize_for_comparison, url_signature, LinkScope};
