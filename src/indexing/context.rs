//! Shared indexing context
//!
//! One `IndexingContext` is built at startup and shared by every worker:
//! it bundles the storage handle, the HTTP fetcher, the visited-URL store,
//! the crawl parallelism bound and the cooperative stop flag.

use crate::config::Config;
use crate::crawler::{PageFetcher, VisitedStore};
use crate::storage::SharedStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

/// Composition root handed to all indexing tasks
pub struct IndexingContext {
    pub config: Config,
    pub storage: SharedStorage,
    pub fetcher: PageFetcher,
    pub visited: VisitedStore,
    /// Bounds the number of concurrent fetches across all sites
    pub fetch_permits: Semaphore,
    stop: AtomicBool,
}

impl IndexingContext {
    pub fn new(config: Config, storage: SharedStorage) -> crate::Result<Self> {
        let fetcher = PageFetcher::new(&config.fetcher)?;
        let parallelism = config.indexing.effective_parallelism();

        Ok(Self {
            config,
            storage,
            fetcher,
            visited: VisitedStore::new(),
            fetch_permits: Semaphore::new(parallelism),
            stop: AtomicBool::new(false),
        })
    }

    /// Checked by every task at entry and after each fetch
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }
}
