//! Configuration validation

use crate::config::types::Config;
use crate::url::extract_domain;
use crate::ConfigError;

/// Validates a parsed configuration
///
/// # Arguments
///
/// * `config` - The configuration to validate
///
/// # Returns
///
/// * `Ok(())` - Configuration is valid
/// * `Err(ConfigError)` - A field is out of range or a URL is malformed
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let base_domain = extract_domain(&config.crawl.base_url)
        .map_err(|_| ConfigError::InvalidUrl(config.crawl.base_url.clone()))?;

    if config.crawl.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }
    for seed in &config.crawl.seeds {
        let seed_domain =
            extract_domain(seed).map_err(|_| ConfigError::InvalidUrl(seed.clone()))?;
        if seed_domain != base_domain {
            return Err(ConfigError::Validation(format!(
                "seed {} is not on the base domain {}",
                seed, base_domain
            )));
        }
    }

    if config.crawl.max_concurrent_fetches == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-fetches must be at least 1".to_string(),
        ));
    }
    if config.crawl.trap_threshold == 0 {
        return Err(ConfigError::Validation(
            "trap-threshold must be at least 1".to_string(),
        ));
    }
    if config.crawl.checkpoint_interval_pages == 0 {
        return Err(ConfigError::Validation(
            "checkpoint-interval-pages must be at least 1".to_string(),
        ));
    }

    let threshold = config.analysis.similarity_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "similarity-threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    for pattern in &config.analysis.exclusion_patterns {
        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidPattern(pattern.clone()));
        }
    }

    if config.output.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path must not be empty".to_string(),
        ));
    }

    Ok(())
}
