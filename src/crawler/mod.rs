//! Crawler module for page fetching and HTML processing
//!
//! This module contains:
//! - HTTP fetching with a global per-host politeness delay
//! - HTML parsing: title, visible text and same-origin link extraction
//! - The process-wide visited-URL store deduplicating crawl work

mod fetcher;
mod parser;
mod visited;

pub use fetcher::{FetchOutcome, PageFetcher, PolitenessGate};
pub use parser::{extract_internal_links, extract_text, extract_title};
pub use visited::VisitedStore;
