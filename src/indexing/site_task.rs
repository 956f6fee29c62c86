//! Per-site root worker
//!
//! One site task owns the lifecycle of a Site row: it creates the row in
//! the `Indexing` state, drives the page tasks over the root's links,
//! and ends the site in exactly one of `Indexed` or `Failed` - unless a
//! stop was requested, in which case the row is left in `Indexing` for the
//! service finalizer to mark as stopped.

use crate::config::SiteEntry;
use crate::crawler::{extract_internal_links, FetchOutcome};
use crate::indexing::entities;
use crate::indexing::page_task;
use crate::indexing::service::IndexingError;
use crate::indexing::IndexingContext;
use crate::search::lemma_index;
use crate::storage::{self, SiteStatus};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Site-level failure message when page tasks ended abnormally
const PAGES_FAILED_MESSAGE: &str = "Одна или несколько страниц завершились с ошибкой";

enum SiteCrawl {
    /// All page tasks joined; `any_failed` marks abnormal terminations
    Completed { any_failed: bool },
    /// A stop request interrupted the crawl
    Stopped,
}

/// Indexes one configured site from scratch.
///
/// Never propagates errors: every failure ends as a `Failed` site row.
pub async fn run(ctx: Arc<IndexingContext>, entry: SiteEntry) {
    if ctx.should_stop() {
        return;
    }

    let site_url = match crate::url::parse_site_url(&entry.url) {
        Ok(url) => Arc::new(url),
        Err(e) => {
            tracing::error!(site = %entry.url, "invalid configured site url: {e}");
            return;
        }
    };

    let mut site = entities::new_site(&entry.name, &entry.url);
    {
        let mut store = storage::lock(&ctx.storage);
        if let Err(e) = store.save_site(&mut site) {
            tracing::error!(site = %entry.url, "failed to create site row: {e}");
            return;
        }
    }
    ctx.visited.activate_site(&entry.url, site.id);

    tracing::info!(site = %entry.url, "indexing site");

    match crawl_site(&ctx, site.id, &site_url).await {
        Ok(SiteCrawl::Completed { any_failed: false }) => {
            if let Err(e) = finish_site(&ctx, site.id) {
                tracing::error!(site = %entry.url, "failed to finish site: {e}");
                fail_site(&ctx, site.id, &e.to_string());
            }
        }
        Ok(SiteCrawl::Completed { any_failed: true }) => {
            fail_site(&ctx, site.id, PAGES_FAILED_MESSAGE);
        }
        Ok(SiteCrawl::Stopped) => {
            // Left in Indexing; the service finalizer applies the stop message
            tracing::info!(site = %entry.url, "site crawl stopped");
        }
        Err(e) => {
            tracing::error!(site = %entry.url, "site crawl failed: {e}");
            fail_site(&ctx, site.id, &e.to_string());
        }
    }

    ctx.visited.finish_site(&entry.url);
}

/// Fetches the root page and fans page tasks out over its links.
async fn crawl_site(
    ctx: &Arc<IndexingContext>,
    site_id: i64,
    site_url: &Arc<Url>,
) -> Result<SiteCrawl, IndexingError> {
    let outcome = {
        let _permit = match ctx.fetch_permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Ok(SiteCrawl::Stopped),
        };
        ctx.fetcher.fetch(site_url).await
    };

    let body = match outcome {
        FetchOutcome::Success { body, .. } => body,
        FetchOutcome::HttpError { code } => {
            return Err(IndexingError::RootFetch(format!("HTTP {code}")));
        }
        FetchOutcome::NotHtml { content_type } => {
            return Err(IndexingError::RootFetch(format!(
                "unexpected content type {content_type}"
            )));
        }
        FetchOutcome::NetworkError { error } => {
            return Err(IndexingError::RootFetch(error));
        }
    };

    if ctx.should_stop() {
        return Ok(SiteCrawl::Stopped);
    }

    let links = extract_internal_links(&body, site_url, site_url);
    tracing::info!(site = %site_url, links = links.len(), "root page fetched");

    let mut tasks: JoinSet<Result<(), IndexingError>> = JoinSet::new();
    for link in links {
        if !ctx.visited.visit_url(&link) {
            continue;
        }
        if let Ok(url) = Url::parse(&link) {
            tasks.spawn(page_task::run(ctx.clone(), site_id, site_url.clone(), url));
        }
    }

    let mut any_failed = false;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(site = %site_url, "page task failed: {e}");
                any_failed = true;
            }
            Err(e) => {
                tracing::error!(site = %site_url, "page task panicked: {e}");
                any_failed = true;
            }
        }
    }

    if ctx.should_stop() {
        return Ok(SiteCrawl::Stopped);
    }

    Ok(SiteCrawl::Completed { any_failed })
}

/// Marks the site indexed and runs the IDF re-weighting pass.
fn finish_site(ctx: &IndexingContext, site_id: i64) -> Result<(), IndexingError> {
    {
        let mut store = storage::lock(&ctx.storage);
        if let Some(mut site) = store.find_site_by_id(site_id)? {
            site.status = SiteStatus::Indexed;
            site.last_error = None;
            site.status_time = entities::now_rfc3339();
            store.save_site(&mut site)?;
        }
    }

    tracing::info!(site_id, "recalculating lemma ranks");
    lemma_index::recalculate_ranks(&ctx.storage, site_id)?;
    Ok(())
}

/// Marks the site failed with the given message.
fn fail_site(ctx: &IndexingContext, site_id: i64, message: &str) {
    let mut store = storage::lock(&ctx.storage);
    let site = match store.find_site_by_id(site_id) {
        Ok(Some(site)) => Some(site),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(site_id, "failed to load site for failure update: {e}");
            None
        }
    };

    if let Some(mut site) = site {
        site.status = SiteStatus::Failed;
        site.last_error = Some(message.to_string());
        site.status_time = entities::now_rfc3339();
        if let Err(e) = store.save_site(&mut site) {
            tracing::error!(site_id, "failed to persist site failure: {e}");
        }
    }
}
