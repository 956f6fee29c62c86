//! Lemma bookkeeping and the query engine
//!
//! The write side maintains per-site lemma frequencies and the inverted
//! index as pages are stored and replaced, and re-weights index ranks with
//! an IDF pass after a site finishes indexing. The read side translates a
//! free-text query into lemmas, assembles the candidate page set and ranks
//! it.

pub mod lemma_index;

mod builder;
mod engine;

pub use builder::SearchResult;
pub use engine::{search, SearchError};
