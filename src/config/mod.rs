//! Configuration loading and validation
//!
//! The engine is driven by a single TOML file listing the site roots to
//! crawl plus tuning knobs for the worker pool, the HTTP fetcher, the
//! search ranking and the HTTP server.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{
    Config, FetcherConfig, IndexingConfig, SearchConfig, ServerConfig, SiteEntry,
};
pub use validation::validate;
