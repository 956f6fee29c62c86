//! Storage module for the search engine data model
//!
//! Four tables form the persistent model: sites, their fetched pages, the
//! per-site lemmas and the inverted index edges joining pages to lemmas.
//! The `Storage` trait abstracts the queries the services need; the SQLite
//! implementation lives in `sqlite.rs`.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, process-wide storage handle.
///
/// The mutex serializes all database access; the compound lemma write path
/// relies on holding this lock as its monitor (see the search module).
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Wraps a concrete storage backend into a shared handle.
pub fn shared(storage: impl Storage + Send + 'static) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared storage handle, recovering from a poisoned lock.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, dyn Storage + Send + 'static> {
    storage.lock().unwrap_or_else(move |poisoned| poisoned.into_inner())
}

/// Runs a multi-row write inside one transaction, rolling back on error.
pub fn in_transaction<F>(store: &mut (dyn Storage + Send), work: F) -> StorageResult<()>
where
    F: FnOnce(&mut (dyn Storage + Send)) -> StorageResult<()>,
{
    store.begin()?;
    match work(store) {
        Ok(()) => store.commit(),
        Err(e) => {
            if let Err(rollback_err) = store.rollback() {
                tracing::error!("rollback failed: {rollback_err}");
            }
            Err(e)
        }
    }
}

/// Indexing status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A configured site root under indexing
///
/// `id == 0` marks a record not yet persisted; `save_site` assigns the key.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// Wall-clock time of the last status transition, RFC 3339
    pub status_time: String,
    pub last_error: Option<String>,
}

/// A single fetched document
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    /// Site-relative path, unique within the site
    pub path: String,
    /// HTTP status code of the fetch
    pub code: u16,
    /// Raw HTML content
    pub content: String,
}

/// A normalized word form scoped to a site
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    /// Summed occurrence contributions from the site's pages
    pub frequency: i64,
}

/// One edge of the inverted index: lemma x page
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    /// Raw occurrence count until the IDF pass rescales it
    pub rank: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_status_roundtrip() {
        for status in &[SiteStatus::Indexing, SiteStatus::Indexed, SiteStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = SiteStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_site_status_invalid() {
        assert_eq!(SiteStatus::from_db_string("indexed"), None);
        assert_eq!(SiteStatus::from_db_string(""), None);
    }
}
