//! Indexing service
//!
//! Drives the full reindex (wipe + one site task per configured site),
//! single-page reindexing and cooperative stop. `is_indexing` stays true
//! from `start_indexing` until the last site task has terminated.

use crate::crawler::FetchOutcome;
use crate::indexing::entities;
use crate::indexing::site_task;
use crate::indexing::IndexingContext;
use crate::search::lemma_index;
use crate::storage::{self, SiteStatus, StorageError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

/// Error stored on sites interrupted by a stop request
pub const STOP_MESSAGE: &str = "Индексация остановлена пользователем";

/// Errors surfaced by the indexing service and its tasks
#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("indexing is already running")]
    AlreadyRunning,

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("task panicked: {0}")]
    TaskPanic(String),

    #[error("root page fetch failed: {0}")]
    RootFetch(String),
}

/// Orchestrates full and single-page reindexing
pub struct IndexingService {
    ctx: Arc<IndexingContext>,
    indexing: Arc<AtomicBool>,
}

impl IndexingService {
    pub fn new(ctx: Arc<IndexingContext>) -> Self {
        Self {
            ctx,
            indexing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn context(&self) -> &Arc<IndexingContext> {
        &self.ctx
    }

    /// Whether a full reindex is currently running
    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::SeqCst)
    }

    /// Starts a full reindex in the background.
    ///
    /// Clears the stop flag and the visited store, wipes the configured
    /// sites and launches one site task per configured site. The indexing
    /// flag is held until the last site task terminates.
    pub fn start_indexing(&self) -> Result<(), IndexingError> {
        if self.indexing.swap(true, Ordering::SeqCst) {
            return Err(IndexingError::AlreadyRunning);
        }

        self.ctx.clear_stop();
        self.ctx.visited.reset();

        let ctx = self.ctx.clone();
        let flag = self.indexing.clone();
        tokio::spawn(async move {
            if let Err(e) = run_full_reindex(&ctx).await {
                tracing::error!("full reindex failed: {e}");
            }
            finalize_unfinished_sites(&ctx);
            flag.store(false, Ordering::SeqCst);
            tracing::info!("indexing finished");
        });

        Ok(())
    }

    /// Requests a cooperative stop.
    ///
    /// In-flight fetches complete; no new page tasks are forked. Sites
    /// still in `Indexing` transition to `Failed` with the stop message
    /// once their tasks have drained.
    pub fn stop_indexing(&self) {
        tracing::info!("stop requested");
        self.ctx.request_stop();
    }

    /// Reindexes a single page.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the page belongs to a configured site and was reindexed
    /// * `Ok(false)` - the URL is outside every configured site
    ///
    /// The IDF pass is deliberately not rerun for single-page updates.
    pub async fn index_page(&self, raw_url: &str) -> Result<bool, IndexingError> {
        let Ok(url) = Url::parse(raw_url.trim()) else {
            return Ok(false);
        };
        let Some(entry) = crate::url::owning_site(&self.ctx.config.sites, &url) else {
            return Ok(false);
        };

        tracing::info!(url = %url, site = %entry.url, "reindexing single page");

        let path = crate::url::page_path(&url);

        // Resolve (or create) the owning site row
        let (site_id, site_created) = {
            let mut store = storage::lock(&self.ctx.storage);
            match store.find_site_by_url(&entry.url)? {
                Some(site) => (site.id, false),
                None => {
                    let mut site = entities::new_site(&entry.name, &entry.url);
                    store.save_site(&mut site)?;
                    (site.id, true)
                }
            }
        };

        // Drop the page's previous contribution before refetching
        let existing = {
            let store = storage::lock(&self.ctx.storage);
            store.find_page(site_id, &path)?
        };
        if let Some(old_page) = existing {
            lemma_index::decrease_lemma_frequencies(&self.ctx.storage, &old_page)?;
            let mut store = storage::lock(&self.ctx.storage);
            store.delete_page(old_page.id)?;
        }

        let outcome = self.ctx.fetcher.fetch(&url).await;
        let (code, body) = match outcome {
            FetchOutcome::Success { code, body } => (code, body),
            FetchOutcome::NotHtml { content_type } => {
                tracing::warn!(url = %url, %content_type, "page is not HTML, nothing to index");
                return Ok(true);
            }
            other => (other.page_code(), String::new()),
        };

        let page = {
            let mut store = storage::lock(&self.ctx.storage);
            let mut page = entities::new_page(site_id, &path, code, &body);
            store.save_page(&mut page)?;
            page
        };

        if (200..300).contains(&code) && !body.is_empty() {
            lemma_index::save_page_lemmas_and_indexes(&self.ctx.storage, &page)?;
        }

        {
            let mut store = storage::lock(&self.ctx.storage);
            if let Some(mut site) = store.find_site_by_id(site_id)? {
                if site_created {
                    site.status = SiteStatus::Indexed;
                }
                site.status_time = entities::now_rfc3339();
                store.save_site(&mut site)?;
            }
        }

        Ok(true)
    }
}

/// Wipes the configured sites and runs one site task per entry.
async fn run_full_reindex(ctx: &Arc<IndexingContext>) -> Result<(), IndexingError> {
    {
        let mut store = storage::lock(&ctx.storage);
        for entry in &ctx.config.sites {
            store.delete_site_by_url(&entry.url)?;
        }
    }

    let mut tasks = JoinSet::new();
    for entry in ctx.config.sites.clone() {
        tasks.spawn(site_task::run(ctx.clone(), entry));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("site task panicked: {e}");
        }
    }

    Ok(())
}

/// Transitions any site still in `Indexing` to `Failed` with the stop
/// message. Runs after the site tasks have drained; a normally completed
/// run leaves nothing for it to do.
fn finalize_unfinished_sites(ctx: &IndexingContext) {
    let mut store = storage::lock(&ctx.storage);
    let sites = match store.all_sites() {
        Ok(sites) => sites,
        Err(e) => {
            tracing::error!("failed to load sites in finalizer: {e}");
            return;
        }
    };

    for mut site in sites {
        if site.status != SiteStatus::Indexing {
            continue;
        }
        site.status = SiteStatus::Failed;
        site.last_error = Some(STOP_MESSAGE.to_string());
        site.status_time = entities::now_rfc3339();
        if let Err(e) = store.save_site(&mut site) {
            tracing::error!(site = %site.url, "failed to finalize stopped site: {e}");
        }
    }
}
