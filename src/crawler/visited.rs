//! Process-wide store of claimed URLs and active sites
//!
//! Crawl deduplication hinges on `visit_url` being an atomic test-and-add:
//! for any number of concurrent calls with the same URL exactly one
//! returns true, and only that caller spawns the page task.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Thread-safe store of visited URLs and sites currently being indexed
#[derive(Debug, Default)]
pub struct VisitedStore {
    visited: Mutex<HashSet<String>>,
    active_sites: Mutex<HashMap<String, i64>>,
}

impl VisitedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for crawling.
    ///
    /// # Returns
    ///
    /// * `true` - the URL was not seen before and now belongs to the caller
    /// * `false` - some other worker already claimed it
    pub fn visit_url(&self, url: &str) -> bool {
        self.lock_visited().insert(url.to_string())
    }

    /// Number of claimed URLs
    pub fn len(&self) -> usize {
        self.lock_visited().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_visited().is_empty()
    }

    /// Marks a site as actively indexing
    pub fn activate_site(&self, url: &str, site_id: i64) {
        self.lock_active().insert(url.to_string(), site_id);
    }

    /// Removes a site from the active set
    pub fn finish_site(&self, url: &str) {
        self.lock_active().remove(url);
    }

    /// Ids of the sites currently being indexed
    pub fn active_site_ids(&self) -> Vec<i64> {
        self.lock_active().values().copied().collect()
    }

    /// Clears both the visited set and the active-site map.
    ///
    /// Called at the start of every full reindex.
    pub fn reset(&self) {
        self.lock_visited().clear();
        self.lock_active().clear();
    }

    fn lock_visited(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashMap<String, i64>> {
        self.active_sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
