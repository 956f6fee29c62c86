//! Lemma analysis
//!
//! Turns free text into normalized lemmas: case-folded alphabetic tokens
//! with function words removed. Page content is analyzed into a lemma
//! frequency map; search queries are analyzed into an ordered,
//! duplicate-free lemma list.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Tokens shorter than this carry no search weight
const MIN_TOKEN_CHARS: usize = 3;

/// Function words dropped from both page content and queries.
///
/// English and Russian, matching the languages the engine is pointed at.
/// Tokens shorter than `MIN_TOKEN_CHARS` never reach this list.
const STOPWORDS: &[&str] = &[
    "all", "and", "any", "are", "been", "but", "can", "has", "have", "her",
    "him", "his", "its", "our", "she", "that", "the", "they", "this",
    "very", "was", "were", "what", "will", "with", "you", "your", "был",
    "была", "были", "вам", "вас", "для", "его", "если", "еще", "как",
    "когда", "которая", "которые", "который", "между", "него", "ней",
    "нет", "них", "она", "они", "оно", "при", "так", "также", "там",
    "тем", "того", "тоже", "только", "чем", "что", "чтобы", "это", "эти",
    "этот",
];

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Alphabetic}+").expect("word regex"))
}

fn normalize_token(token: &str) -> Option<&str> {
    if token.chars().count() < MIN_TOKEN_CHARS {
        return None;
    }
    if STOPWORDS.contains(&token) {
        return None;
    }
    Some(token)
}

/// Analyzes page text into a map of lemma to occurrence count.
///
/// # Arguments
///
/// * `text` - Plain text (HTML must be stripped by the caller)
///
/// # Returns
///
/// A map from normalized lemma to the number of occurrences in `text`
pub fn lemmatize(text: &str) -> HashMap<String, u32> {
    let lowered = text.to_lowercase();
    let mut counts = HashMap::new();

    for token in word_regex().find_iter(&lowered) {
        if let Some(lemma) = normalize_token(token.as_str()) {
            *counts.entry(lemma.to_string()).or_insert(0) += 1;
        }
    }

    counts
}

/// Analyzes a search query into an ordered lemma list.
///
/// Duplicates are removed while the first-occurrence order is kept, so a
/// query like "rust rust async" yields `["rust", "async"]`.
pub fn query_lemmas(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for token in word_regex().find_iter(&lowered) {
        if let Some(lemma) = normalize_token(token.as_str()) {
            if seen.insert(lemma.to_string()) {
                ordered.push(lemma.to_string());
            }
        }
    }

    ordered
}
