//! Lemma and inverted-index write paths
//!
//! All three paths run under the storage lock for their whole compound
//! update. That lock is the process-wide monitor serializing lemma writes:
//! without it, two page tasks finding the same missing lemma would both
//! insert and break the per-site lemma uniqueness.

use crate::analysis;
use crate::crawler::extract_text;
use crate::indexing::entities;
use crate::storage::{self, PageRecord, SharedStorage, Storage, StorageResult};
use std::collections::HashMap;

/// Saves the lemma counts and index rows for a freshly stored page.
///
/// For every lemma of the page content the site-scoped frequency counter
/// is created or incremented, and one index row is inserted with the raw
/// occurrence count as its rank. The update is one transaction.
pub fn save_page_lemmas_and_indexes(
    storage: &SharedStorage,
    page: &PageRecord,
) -> StorageResult<()> {
    let text = extract_text(&page.content);
    if text.is_empty() {
        tracing::warn!(page_id = page.id, "empty content, skipping lemma save");
        return Ok(());
    }

    let lemmas = analysis::lemmatize(&text);
    if lemmas.is_empty() {
        return Ok(());
    }

    let mut store = storage::lock(storage);
    storage::in_transaction(&mut *store, |store| write_lemmas(store, page, &lemmas))
}

/// Decrements the frequencies of every lemma occurring on a page.
///
/// Used when a page is deleted or replaced. Counters are clamped at zero
/// and lemma rows whose frequency reaches zero are deleted; the page's
/// index rows are dropped by the page deletion cascade.
pub fn decrease_lemma_frequencies(storage: &SharedStorage, page: &PageRecord) -> StorageResult<()> {
    let text = extract_text(&page.content);
    if text.is_empty() {
        tracing::warn!(page_id = page.id, "empty content, nothing to decrement");
        return Ok(());
    }

    let lemmas = analysis::lemmatize(&text);
    if lemmas.is_empty() {
        return Ok(());
    }

    let mut store = storage::lock(storage);
    storage::in_transaction(&mut *store, |store| apply_decrements(store, page, &lemmas))
}

/// IDF pass: rescales every index rank of the site.
///
/// With `N` pages on the site and `df` distinct pages containing a lemma,
/// each of the lemma's index rows becomes `rank * ln(N / (df + 1))`. Runs
/// once per site at the end of indexing, one transaction per lemma.
pub fn recalculate_ranks(storage: &SharedStorage, site_id: i64) -> StorageResult<()> {
    let mut store = storage::lock(storage);

    let total_pages = store.count_pages(site_id)?;
    let lemmas = store.lemmas_by_site(site_id)?;

    for lemma in lemmas {
        let lemma_id = lemma.id;
        storage::in_transaction(&mut *store, |store| {
            let df = store.count_pages_with_lemma(lemma_id)?;
            let idf = (total_pages as f64 / (df + 1) as f64).ln();

            let mut indexes = store.indexes_for_lemma(lemma_id)?;
            for index in indexes.iter_mut() {
                index.rank *= idf;
            }
            store.save_indexes(&mut indexes)
        })?;
    }

    Ok(())
}

fn write_lemmas(
    store: &mut (dyn Storage + Send),
    page: &PageRecord,
    lemmas: &HashMap<String, u32>,
) -> StorageResult<()> {
    for (name, count) in lemmas {
        let lemma = match store.find_lemma(page.site_id, name)? {
            Some(mut existing) => {
                existing.frequency += *count as i64;
                store.save_lemma(&mut existing)?;
                existing
            }
            None => {
                let mut created = entities::new_lemma(page.site_id, name, *count as i64);
                store.save_lemma(&mut created)?;
                created
            }
        };

        let mut index = entities::new_index(page.id, lemma.id, *count as f64);
        store.save_index(&mut index)?;
    }
    Ok(())
}

fn apply_decrements(
    store: &mut (dyn Storage + Send),
    page: &PageRecord,
    lemmas: &HashMap<String, u32>,
) -> StorageResult<()> {
    for (name, count) in lemmas {
        match store.find_lemma(page.site_id, name)? {
            Some(mut lemma) => {
                lemma.frequency = (lemma.frequency - *count as i64).max(0);
                if lemma.frequency == 0 {
                    store.delete_lemma(lemma.id)?;
                } else {
                    store.save_lemma(&mut lemma)?;
                }
            }
            None => {
                tracing::debug!(lemma = %name, "lemma missing during decrement");
            }
        }
    }
    Ok(())
}
