//! Retrieval and ranking
//!
//! Translates a free-text query into lemmas, loads the matching lemma rows,
//! drops high-frequency lemmas, assembles the candidate page set and ranks
//! it. With a site selected the candidate pages are the intersection over
//! all query lemmas; across all sites the index rows are unioned instead,
//! because lemmas are per-site entities and a cross-site intersection
//! would be too aggressive.

use crate::analysis;
use crate::search::builder::{self, SearchResult};
use crate::storage::{self, IndexRecord, LemmaRecord, SharedStorage, Storage, StorageError};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors surfaced by the search pipeline
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query contained no searchable lemmas
    #[error("query contains no searchable lemmas")]
    EmptyQuery,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Runs a search query.
///
/// # Arguments
///
/// * `threshold` - share of a site's pages above which a lemma is dropped
/// * `site_url` - restricts the search to one configured site when set
/// * `offset`, `limit` - result pagination
///
/// # Returns
///
/// Ranked results, or an empty list when nothing matched. The ordering is
/// total (ties broken by page id), so pagination is stable for a fixed
/// database snapshot.
pub fn search(
    storage: &SharedStorage,
    threshold: f64,
    query: &str,
    site_url: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    let query_lemmas = analysis::query_lemmas(query);
    if query_lemmas.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let site_url = site_url.map(str::trim).filter(|url| !url.is_empty());
    tracing::info!(
        query,
        site = site_url.unwrap_or("<all>"),
        lemmas = query_lemmas.len(),
        "running search"
    );

    let store = storage::lock(storage);

    let lemmas = match site_url {
        Some(url) => store.find_lemmas_in_site(&query_lemmas, url)?,
        None => store.find_lemmas_in(&query_lemmas)?,
    };
    if lemmas.is_empty() {
        return Ok(Vec::new());
    }

    let mut filtered = filter_high_frequency(&*store, lemmas, threshold)?;
    if filtered.is_empty() {
        tracing::info!("all query lemmas were filtered as high-frequency");
        return Ok(Vec::new());
    }

    // Rarest lemma first; id as tiebreaker keeps the order total
    filtered.sort_by(|a, b| a.frequency.cmp(&b.frequency).then(a.id.cmp(&b.id)));

    let candidates = candidate_indexes(&*store, &filtered, site_url.is_some())?;
    if candidates.is_empty() {
        tracing::info!("candidate intersection is empty");
        return Ok(Vec::new());
    }

    let ranked = rank_pages(&candidates, query_lemmas.len());
    let page_of_results: Vec<(i64, f64)> =
        ranked.into_iter().skip(offset).take(limit).collect();

    builder::build(&*store, &page_of_results, &query_lemmas).map_err(SearchError::from)
}

/// Drops lemmas occurring on more than `threshold` of their own site's
/// pages. The share is always computed against the lemma's own site, even
/// when searching across all sites.
fn filter_high_frequency(
    store: &(dyn Storage + Send),
    lemmas: Vec<LemmaRecord>,
    threshold: f64,
) -> Result<Vec<LemmaRecord>, StorageError> {
    let mut kept = Vec::with_capacity(lemmas.len());
    for lemma in lemmas {
        let total_pages = store.count_pages(lemma.site_id)?;
        if total_pages == 0 {
            continue;
        }
        let pages_with_lemma = store.count_pages_with_lemma(lemma.id)?;
        let share = pages_with_lemma as f64 / total_pages as f64;
        if share <= threshold {
            kept.push(lemma);
        } else {
            tracing::debug!(lemma = %lemma.lemma, share, "dropping high-frequency lemma");
        }
    }
    Ok(kept)
}

/// Assembles the candidate index rows.
///
/// Single site: starts from the rarest lemma's rows and keeps only those
/// whose page also contains every other lemma. All sites: unions the rows
/// of every lemma.
fn candidate_indexes(
    store: &(dyn Storage + Send),
    lemmas: &[LemmaRecord],
    single_site: bool,
) -> Result<Vec<IndexRecord>, StorageError> {
    if single_site {
        let mut base = store.indexes_for_lemma(lemmas[0].id)?;
        for lemma in &lemmas[1..] {
            let pages_with_lemma: HashSet<i64> = store
                .indexes_for_lemma(lemma.id)?
                .iter()
                .map(|index| index.page_id)
                .collect();
            base.retain(|index| pages_with_lemma.contains(&index.page_id));
            if base.is_empty() {
                break;
            }
        }
        Ok(base)
    } else {
        let mut all = Vec::new();
        for lemma in lemmas {
            all.extend(store.indexes_for_lemma(lemma.id)?);
        }
        Ok(all)
    }
}

/// Computes relative scores from the candidate rows.
///
/// Absolute rank is the per-page sum of index ranks. The relative score
/// normalizes by the maximum absolute rank and boosts pages matching more
/// of the query lemmas: `(abs / max) * (1 + matches / query_len)`.
fn rank_pages(candidates: &[IndexRecord], query_len: usize) -> Vec<(i64, f64)> {
    let mut absolute: HashMap<i64, f64> = HashMap::new();
    let mut matches: HashMap<i64, usize> = HashMap::new();
    for index in candidates {
        *absolute.entry(index.page_id).or_insert(0.0) += index.rank;
        *matches.entry(index.page_id).or_insert(0) += 1;
    }

    let max_rank = absolute
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let max_rank = if max_rank == 0.0 { 1.0 } else { max_rank };

    let mut scored: Vec<(i64, f64)> = absolute
        .into_iter()
        .map(|(page_id, abs)| {
            let base = abs / max_rank;
            let match_count = matches.get(&page_id).copied().unwrap_or(0);
            let weight = 1.0 + match_count as f64 / query_len as f64;
            (page_id, base * weight)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::entities;
    use crate::search::lemma_index;
    use crate::storage::{SiteRecord, SqliteStorage};

    const THRESHOLD: f64 = 1.0;

    /// Builds the two-page example site: /a = "foo bar baz",
    /// /b = "bar bar qux", IDF pass applied.
    fn example_site() -> (SharedStorage, SiteRecord) {
        let storage = storage::shared(SqliteStorage::new_in_memory().unwrap());
        let mut site = entities::new_site("Example", "http://example.test");
        storage::lock(&storage).save_site(&mut site).unwrap();

        for (path, text) in [("/a", "foo bar baz"), ("/b", "bar bar qux")] {
            let html = format!("<html><head><title>{path}</title></head><body>{text}</body></html>");
            let mut page = entities::new_page(site.id, path, 200, &html);
            storage::lock(&storage).save_page(&mut page).unwrap();
            lemma_index::save_page_lemmas_and_indexes(&storage, &page).unwrap();
        }
        lemma_index::recalculate_ranks(&storage, site.id).unwrap();

        (storage, site)
    }

    #[test]
    fn test_single_lemma_orders_by_weight() {
        let (storage, _site) = example_site();

        let results = search(
            &storage,
            THRESHOLD,
            "bar",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        // /b carries rank 2*ln(2/3), /a carries 1*ln(2/3); after
        // normalization /b scores higher
        assert_eq!(results[0].uri, "/b");
        assert_eq!(results[1].uri, "/a");
        assert!(results[0].relevance > results[1].relevance);
    }

    #[test]
    fn test_intersection_on_single_site() {
        let (storage, _site) = example_site();

        let results = search(
            &storage,
            THRESHOLD,
            "bar qux",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "/b");
    }

    #[test]
    fn test_no_match_returns_empty() {
        let (storage, _site) = example_site();

        let results = search(
            &storage,
            THRESHOLD,
            "nonexistent",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_query_is_an_error() {
        let (storage, _site) = example_site();

        let result = search(&storage, THRESHOLD, "   ", None, 0, 20);
        assert!(matches!(result, Err(SearchError::EmptyQuery)));

        // Stopword-only queries parse to zero lemmas too
        let result = search(&storage, THRESHOLD, "the and", None, 0, 20);
        assert!(matches!(result, Err(SearchError::EmptyQuery)));
    }

    #[test]
    fn test_high_frequency_filter_drops_ubiquitous_lemmas() {
        let (storage, _site) = example_site();

        // "bar" occurs on 2 of 2 pages; a 0.5 threshold filters it out
        let results = search(
            &storage,
            0.5,
            "bar",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();
        assert!(results.is_empty());

        // "foo" occurs on 1 of 2 pages and survives the same threshold
        let results = search(
            &storage,
            0.5,
            "foo",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "/a");
    }

    #[test]
    fn test_cross_site_union() {
        let (storage, _site) = example_site();

        let mut other = entities::new_site("Other", "http://other.test");
        storage::lock(&storage).save_site(&mut other).unwrap();
        let mut page = entities::new_page(
            other.id,
            "/c",
            200,
            "<html><body>qux corge</body></html>",
        );
        storage::lock(&storage).save_page(&mut page).unwrap();
        lemma_index::save_page_lemmas_and_indexes(&storage, &page).unwrap();
        lemma_index::recalculate_ranks(&storage, other.id).unwrap();

        // Across all sites "qux corge" unions: /b (qux) and /c (qux, corge)
        let results = search(&storage, THRESHOLD, "qux corge", None, 0, 20).unwrap();
        let mut uris: Vec<&str> = results.iter().map(|r| r.uri.as_str()).collect();
        uris.sort();
        assert_eq!(uris, vec!["/b", "/c"]);
    }

    #[test]
    fn test_pagination_is_stable() {
        let (storage, _site) = example_site();

        let all = search(
            &storage,
            THRESHOLD,
            "bar",
            Some("http://example.test"),
            0,
            20,
        )
        .unwrap();
        let first = search(
            &storage,
            THRESHOLD,
            "bar",
            Some("http://example.test"),
            0,
            1,
        )
        .unwrap();
        let second = search(
            &storage,
            THRESHOLD,
            "bar",
            Some("http://example.test"),
            1,
            1,
        )
        .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].uri, all[0].uri);
        assert_eq!(second[0].uri, all[1].uri);
    }
}
