//! Crawl configuration: TOML loading, validation, and hashing

pub mod parser;
pub mod types;
pub mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{AnalysisConfig, Config, CrawlConfig, OutputConfig};
pub use validation::validate;
