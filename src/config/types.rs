//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Frontier and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// The site being audited
    pub base_url: String,

    /// Starting URLs; must be on the base domain
    pub seeds: Vec<String>,

    /// Maximum link depth from a seed
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Bound on parallel fetch workers
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Enqueued URLs allowed per URL signature before suppression
    #[serde(default = "default_trap_threshold")]
    pub trap_threshold: u32,

    /// Pages between periodic checkpoints
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval_pages: usize,
}

/// Analyzer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Weighted-similarity threshold for duplicate content
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Path patterns (with `*` globs) excluded from crawling and analysis
    #[serde(default)]
    pub exclusion_patterns: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            similarity_threshold: default_similarity_threshold(),
            exclusion_patterns: Vec::new(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database
    pub database_path: String,
}

fn default_max_depth() -> u32 {
    5
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_trap_threshold() -> u32 {
    25
}

fn default_checkpoint_interval() -> usize {
    50
}

fn default_similarity_threshold() -> f64 {
    0.85
}
