//! Recursive per-URL crawl worker
//!
//! A page task fetches one URL, persists the page, feeds the lemma write
//! path, then forks child tasks for the unvisited links it discovered and
//! waits for them. The page row is committed before any child is forked,
//! so parent-child referential integrity holds even under partial failure.
//!
//! Fetch failures are data, not errors: they are recorded as page rows
//! with the error status code. Only storage failures and panics propagate
//! to the site task.

use crate::crawler::{extract_internal_links, FetchOutcome};
use crate::indexing::entities;
use crate::indexing::service::IndexingError;
use crate::indexing::IndexingContext;
use crate::search::lemma_index;
use crate::storage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), IndexingError>> + Send>>;

/// Crawls one URL and recurses over its unvisited internal links.
///
/// Boxed so the recursion has a sized future type; children are joined
/// through a `JoinSet`, which is the fork-join barrier of the crawl tree.
pub fn run(ctx: Arc<IndexingContext>, site_id: i64, site_url: Arc<Url>, url: Url) -> TaskFuture {
    Box::pin(async move {
        if ctx.should_stop() {
            return Ok(());
        }

        let outcome = {
            let _permit = match ctx.fetch_permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };
            ctx.fetcher.fetch(&url).await
        };

        let path = crate::url::page_path(&url);
        let (code, body) = match outcome {
            FetchOutcome::Success { code, body } => (code, body),
            FetchOutcome::NotHtml { content_type } => {
                tracing::debug!(url = %url, %content_type, "skipping non-HTML page");
                return Ok(());
            }
            other => {
                tracing::warn!(url = %url, code = other.page_code(), "fetch failed, recording error page");
                record_page(&ctx, site_id, &path, other.page_code(), "")?;
                return Ok(());
            }
        };

        let Some(page) = record_page(&ctx, site_id, &path, code, &body)? else {
            // Another URL spelling already produced this path
            return Ok(());
        };

        lemma_index::save_page_lemmas_and_indexes(&ctx.storage, &page)?;

        if ctx.should_stop() {
            return Ok(());
        }

        let links = extract_internal_links(&body, &url, &site_url);
        tracing::debug!(url = %url, links = links.len(), "page indexed");

        let mut children: JoinSet<Result<(), IndexingError>> = JoinSet::new();
        for link in links {
            if !ctx.visited.visit_url(&link) {
                continue;
            }
            if let Ok(child_url) = Url::parse(&link) {
                children.spawn(run(ctx.clone(), site_id, site_url.clone(), child_url));
            }
        }

        // Drain every child before reporting the first failure
        let mut failure = None;
        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failure = Some(e),
                Err(e) => failure = Some(IndexingError::TaskPanic(e.to_string())),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}

/// Persists a page row and refreshes the site's status time, in one
/// transaction.
///
/// Returns `None` when a row for `(site, path)` already exists.
fn record_page(
    ctx: &IndexingContext,
    site_id: i64,
    path: &str,
    code: u16,
    content: &str,
) -> Result<Option<crate::storage::PageRecord>, IndexingError> {
    let mut store = storage::lock(&ctx.storage);

    if store.find_page(site_id, path)?.is_some() {
        return Ok(None);
    }

    let mut page = entities::new_page(site_id, path, code, content);
    storage::in_transaction(&mut *store, |store| {
        store.save_page(&mut page)?;

        // Freshness heartbeat
        if let Some(mut site) = store.find_site_by_id(site_id)? {
            site.status_time = entities::now_rfc3339();
            store.save_site(&mut site)?;
        }
        Ok(())
    })?;

    Ok(Some(page))
}
