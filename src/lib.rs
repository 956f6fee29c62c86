//! Searchlight: a multi-site crawling search engine
//!
//! This crate implements a search engine core built as a three-stage pipeline:
//! a parallel crawler that discovers and fetches the pages of configured
//! sites, a lemma analysis stage that maintains an inverted index with
//! per-page occurrence weights, and a query engine that ranks candidate
//! pages by a TF/IDF-style relevance and returns excerpts over an HTTP API.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod http;
pub mod indexing;
pub mod search;
pub mod stats;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Searchlight operations
#[derive(Debug, Error)]
pub enum SearchlightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Indexing error: {0}")]
    Indexing(#[from] indexing::IndexingError),

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
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Searchlight operations
pub type Result<T> = std::result::Result<T, SearchlightError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use storage::{SharedStorage, SqliteStorage, Storage};
