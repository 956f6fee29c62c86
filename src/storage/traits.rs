//! Storage trait and error types

use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Covers every query the indexing and search services need. Saving a
/// record with `id == 0` inserts it and assigns the key; a non-zero id
/// updates the existing row. Write paths that touch more than one row are
/// expected to run between `begin` and `commit`.
pub trait Storage {
    // ===== Transactions =====

    /// Opens a write transaction
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the open transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls the open transaction back
    fn rollback(&mut self) -> StorageResult<()>;

    // ===== Sites =====

    /// Inserts or updates a site
    fn save_site(&mut self, site: &mut SiteRecord) -> StorageResult<()>;

    /// Deletes a site, cascading its pages, lemmas and index rows
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Deletes a site by URL, with the same cascade
    fn delete_site_by_url(&mut self, url: &str) -> StorageResult<()>;

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    fn find_site_by_id(&self, id: i64) -> StorageResult<Option<SiteRecord>>;

    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Checks whether any site row exists
    fn has_sites(&self) -> StorageResult<bool>;

    // ===== Pages =====

    fn save_page(&mut self, page: &mut PageRecord) -> StorageResult<()>;

    /// Deletes a page, cascading its index rows
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    fn find_page_by_id(&self, id: i64) -> StorageResult<Option<PageRecord>>;

    /// Finds a page by its site-relative path
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    fn pages_by_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>>;

    fn count_pages(&self, site_id: i64) -> StorageResult<i64>;

    // ===== Lemmas =====

    fn save_lemma(&mut self, lemma: &mut LemmaRecord) -> StorageResult<()>;

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// Finds a lemma by its text within one site
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    fn lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>>;

    /// Finds lemma rows matching any of the given texts, across all sites
    fn find_lemmas_in(&self, names: &[String]) -> StorageResult<Vec<LemmaRecord>>;

    /// Finds lemma rows matching any of the given texts on one site
    fn find_lemmas_in_site(
        &self,
        names: &[String],
        site_url: &str,
    ) -> StorageResult<Vec<LemmaRecord>>;

    fn count_lemmas(&self, site_id: i64) -> StorageResult<i64>;

    /// Checks whether any lemma row exists
    fn has_lemmas(&self) -> StorageResult<bool>;

    // ===== Index rows =====

    fn save_index(&mut self, index: &mut IndexRecord) -> StorageResult<()>;

    fn save_indexes(&mut self, indexes: &mut [IndexRecord]) -> StorageResult<()>;

    fn delete_index(&mut self, index_id: i64) -> StorageResult<()>;

    fn find_index_by_id(&self, id: i64) -> StorageResult<Option<IndexRecord>>;

    /// All index rows of a lemma (lemmas are site-scoped, so these are the
    /// rows of one lemma on one site)
    fn indexes_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// Number of distinct pages a lemma occurs on
    fn count_pages_with_lemma(&self, lemma_id: i64) -> StorageResult<i64>;
}
