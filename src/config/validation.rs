use crate::config::types::{
    Config, CrawlerConfig, HttpConfig, StorageConfig, MAX_WAIT_INTERVAL_SECS,
};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue, REFERER};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    // Page URLs double as Referer values
    HeaderValue::from_str(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("base_url is not header-safe: {}", e)))?;

    if config.page_size == 0 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }
    HeaderValue::from_str(&config.user_agent)
        .map_err(|e| ConfigError::InvalidHeader(format!("user_agent: {}", e)))?;

    for (name, value) in &config.headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;

        // Referer is derived from the previous page on every request
        if header == REFERER {
            return Err(ConfigError::InvalidHeader(
                "Referer is computed per request and cannot be configured".to_string(),
            ));
        }

        HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("value of '{}': {}", name, e)))?;
    }

    Ok(())
}

/// Validates crawl range and pacing
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !(0.0..=MAX_WAIT_INTERVAL_SECS).contains(&config.wait_interval) {
        return Err(ConfigError::Validation(format!(
            "wait_interval must be between 0 and {} seconds, got {}",
            MAX_WAIT_INTERVAL_SECS, config.wait_interval
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_collection_name(&config.collection)
}

/// Validates a collection name
///
/// The name becomes an SQL table identifier, so only `[A-Za-z_][A-Za-z0-9_]*`
/// is accepted.
pub fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();

    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "collection must match [A-Za-z_][A-Za-z0-9_]*, got '{}'",
            name
        )));
    }

    Ok(())
}
