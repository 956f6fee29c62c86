//! Entity constructors
//!
//! Builds new records with correct defaults and timestamps before they are
//! handed to the storage layer. A fresh record carries `id == 0` until
//! saved.

use crate::storage::{IndexRecord, LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use chrono::Local;

/// Current local wall-clock time as RFC 3339
pub fn now_rfc3339() -> String {
    Local::now().to_rfc3339()
}

/// Creates a new site in the `Indexing` state
pub fn new_site(name: &str, url: &str) -> SiteRecord {
    SiteRecord {
        id: 0,
        url: url.to_string(),
        name: name.to_string(),
        status: SiteStatus::Indexing,
        status_time: now_rfc3339(),
        last_error: None,
    }
}

/// Creates a new page record
pub fn new_page(site_id: i64, path: &str, code: u16, content: &str) -> PageRecord {
    PageRecord {
        id: 0,
        site_id,
        path: path.to_string(),
        code,
        content: content.to_string(),
    }
}

/// Creates a new lemma record
pub fn new_lemma(site_id: i64, lemma: &str, frequency: i64) -> LemmaRecord {
    LemmaRecord {
        id: 0,
        site_id,
        lemma: lemma.to_string(),
        frequency,
    }
}

/// Creates a new inverted-index row with a raw occurrence rank
pub fn new_index(page_id: i64, lemma_id: i64, rank: f64) -> IndexRecord {
    IndexRecord {
        id: 0,
        page_id,
        lemma_id,
        rank,
    }
}
