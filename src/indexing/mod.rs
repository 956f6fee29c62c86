//! Indexing orchestration
//!
//! This module contains:
//! - the entity constructors used by every write path
//! - the shared `IndexingContext` handed to all workers
//! - the recursive page task and the per-site root task
//! - the `IndexingService` driving full and single-page reindexing

pub mod entities;

mod context;
mod page_task;
mod service;
mod site_task;

pub use context::IndexingContext;
pub use service::{IndexingError, IndexingService, STOP_MESSAGE};
