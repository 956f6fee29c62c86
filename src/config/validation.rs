use crate::config::types::Config;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates a parsed configuration
///
/// Checks performed:
/// - at least one site is configured
/// - every site URL is an absolute http(s) URL with a host
/// - site URLs are unique, site names are non-blank
/// - the worker pool size, timeouts and the high-frequency threshold are
///   within sensible bounds
///
/// # Arguments
///
/// * `config` - The configuration to validate
///
/// # Returns
///
/// * `Ok(())` - Configuration is valid
/// * `Err(ConfigError)` - Validation failed with a description
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[sites]] entry is required".to_string(),
        ));
    }

    let mut seen_urls = HashSet::new();
    for site in &config.sites {
        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::Validation(format!("invalid site url '{}': {}", site.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "site url '{}' must use http or https",
                site.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "site url '{}' has no host",
                site.url
            )));
        }

        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has a blank name",
                site.url
            )));
        }

        if !seen_urls.insert(site.url.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site url '{}'",
                site.url
            )));
        }
    }

    if let Some(parallelism) = config.indexing.parallelism {
        if parallelism == 0 {
            return Err(ConfigError::Validation(
                "indexing.parallelism must be at least 1".to_string(),
            ));
        }
    }

    if config.fetcher.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetcher.request-timeout-ms must be positive".to_string(),
        ));
    }

    let threshold = config.search.high_frequency_lemma_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "search.high-frequency-lemma-threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    Ok(())
}
