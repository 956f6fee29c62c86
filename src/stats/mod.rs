//! Indexing statistics
//!
//! Aggregates site, page and lemma counts together with the current
//! indexing state, both as totals and per configured site.

use crate::storage::{self, SharedStorage, StorageResult};
use chrono::DateTime;
use serde::Serialize;
use std::time::Instant;

/// Aggregate counters across all sites
#[derive(Debug, Default, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: i64,
    pub lemmas: i64,
    pub indexing: bool,
}

/// Per-site statistics entry
#[derive(Debug, Clone, Serialize)]
pub struct DetailedStatisticsItem {
    pub url: String,
    pub name: String,
    pub status: String,

    /// Last status transition as epoch milliseconds
    #[serde(rename = "statusTime")]
    pub status_time: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub pages: i64,
    pub lemmas: i64,
}

/// Complete statistics payload
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsData {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatisticsItem>,
}

/// Collects current statistics from storage.
///
/// # Arguments
///
/// * `indexing` - whether a full reindex is currently running
pub fn collect(storage: &SharedStorage, indexing: bool) -> StorageResult<StatisticsData> {
    let started = Instant::now();
    let store = storage::lock(storage);

    let sites = store.all_sites()?;
    let mut total = TotalStatistics {
        sites: sites.len(),
        indexing,
        ..TotalStatistics::default()
    };

    let mut detailed = Vec::with_capacity(sites.len());
    for site in sites {
        let pages = store.count_pages(site.id)?;
        let lemmas = store.count_lemmas(site.id)?;
        total.pages += pages;
        total.lemmas += lemmas;

        detailed.push(DetailedStatisticsItem {
            url: site.url,
            name: site.name,
            status: site.status.to_db_string().to_string(),
            status_time: epoch_millis(&site.status_time),
            error: site.last_error,
            pages,
            lemmas,
        });
    }

    tracing::info!(
        sites = total.sites,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "statistics aggregated"
    );

    Ok(StatisticsData { total, detailed })
}

fn epoch_millis(rfc3339: &str) -> i64 {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|time| time.timestamp_millis())
        .unwrap_or(0)
}
