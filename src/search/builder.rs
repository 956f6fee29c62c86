//! Search result assembly
//!
//! Turns ranked page ids into user-facing results: site attribution, the
//! page title and a snippet built from the single sentence matching the
//! query best.

use crate::crawler::{extract_text, extract_title};
use crate::storage::{Storage, StorageResult};
use serde::Serialize;

const SNIPPET_MAX_CHARS: usize = 240;

/// One ranked search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Root URL of the owning site
    pub site: String,

    #[serde(rename = "siteName")]
    pub site_name: String,

    /// Site-relative path of the page
    pub uri: String,

    pub title: String,

    pub snippet: String,

    pub relevance: f64,
}

/// Builds result objects for ranked pages, in the given order.
///
/// Pages or sites deleted since ranking are silently skipped.
pub fn build(
    store: &(dyn Storage + Send),
    ranked: &[(i64, f64)],
    query_lemmas: &[String],
) -> StorageResult<Vec<SearchResult>> {
    let mut results = Vec::with_capacity(ranked.len());

    for (page_id, relevance) in ranked {
        let Some(page) = store.find_page_by_id(*page_id)? else {
            continue;
        };
        let Some(site) = store.find_site_by_id(page.site_id)? else {
            continue;
        };

        let title = extract_title(&page.content).unwrap_or_else(|| page.path.clone());
        let text = extract_text(&page.content);
        let snippet = best_sentence(&text, query_lemmas);

        results.push(SearchResult {
            site: site.url,
            site_name: site.name,
            uri: page.path,
            title,
            snippet,
            relevance: *relevance,
        });
    }

    Ok(results)
}

/// Picks the sentence containing the most query lemmas.
///
/// Falls back to the head of the text when no sentence matches at all.
fn best_sentence(text: &str, query_lemmas: &[String]) -> String {
    let mut best = "";
    let mut best_hits = 0usize;

    for sentence in text.split_inclusive(['.', '!', '?']) {
        let lowered = sentence.to_lowercase();
        let hits = query_lemmas
            .iter()
            .filter(|lemma| lowered.contains(lemma.as_str()))
            .count();
        if hits > best_hits {
            best_hits = hits;
            best = sentence;
        }
    }

    if best.is_empty() {
        best = text;
    }

    truncate_chars(best.trim(), SNIPPET_MAX_CHARS)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_sentence_picks_densest_match() {
        let text = "Nothing here. Rust and tokio together. Only rust here.";
        let lemmas = vec!["rust".to_string(), "tokio".to_string()];
        assert_eq!(best_sentence(text, &lemmas), "Rust and tokio together.");
    }

    #[test]
    fn test_best_sentence_falls_back_to_head() {
        let text = "No matches in this text at all.";
        let lemmas = vec!["absent".to_string()];
        assert_eq!(best_sentence(text, &lemmas), text);
    }

    #[test]
    fn test_best_sentence_single_sentence_text() {
        let text = "rust without terminator";
        let lemmas = vec!["rust".to_string()];
        assert_eq!(best_sentence(text, &lemmas), text);
    }

    #[test]
    fn test_truncate_long_snippet() {
        let long = "word ".repeat(100);
        let lemmas = vec!["word".to_string()];
        let snippet = best_sentence(&long, &lemmas);
        assert!(snippet.chars().count() <= SNIPPET_MAX_CHARS + 3);
        assert!(snippet.ends_with("..."));
    }
}
