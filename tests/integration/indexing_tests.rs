//! Integration tests for the indexing pipeline
//!
//! These tests use wiremock to stand in for the crawled sites and drive
//! the full cycle: start indexing, await completion, then query the
//! resulting index.

use searchlight::config::{Config, SearchConfig, SiteEntry};
use searchlight::indexing::{IndexingContext, IndexingService, STOP_MESSAGE};
use searchlight::search;
use searchlight::stats;
use searchlight::storage::{self, SiteStatus, SqliteStorage};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!("<html><body>{body}</body></html>"), "text/html")
}

fn test_config(site_url: &str) -> Config {
    let mut config = Config {
        sites: vec![SiteEntry {
            url: site_url.to_string(),
            name: "Test Site".to_string(),
        }],
        search: SearchConfig {
            high_frequency_lemma_threshold: 1.0,
        },
        ..Config::default()
    };
    config.fetcher.politeness_delay_ms = 5;
    config.fetcher.request_timeout_ms = 2_000;
    config.indexing.parallelism = Some(4);
    config
}

fn test_service(config: Config) -> IndexingService {
    let storage = storage::shared(SqliteStorage::new_in_memory().unwrap());
    let ctx = Arc::new(IndexingContext::new(config, storage).unwrap());
    IndexingService::new(ctx)
}

async fn wait_until_idle(service: &IndexingService) {
    for _ in 0..400 {
        if !service.is_indexing() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("indexing did not finish in time");
}

#[tokio::test]
async fn test_full_index_of_small_site() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/bad">bad</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("foo bar baz"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("bar bar qux"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let site_url = server.uri();
    let service = test_service(test_config(&site_url));

    service.start_indexing().unwrap();
    assert!(service.is_indexing());
    wait_until_idle(&service).await;

    let ctx = service.context();

    // The site ends Indexed even though one page failed to fetch
    {
        let store = storage::lock(&ctx.storage);
        let site = store.find_site_by_url(&site_url).unwrap().unwrap();
        assert_eq!(site.status, SiteStatus::Indexed);
        assert!(site.last_error.is_none());

        let pages = store.pages_by_site(site.id).unwrap();
        assert_eq!(pages.len(), 3);

        let bad = store.find_page(site.id, "/bad").unwrap().unwrap();
        assert_eq!(bad.code, 500);
        assert!(bad.content.is_empty());

        // "bar" occurred once on /a and twice on /b
        let bar = store.find_lemma(site.id, "bar").unwrap().unwrap();
        assert_eq!(bar.frequency, 3);
        assert_eq!(store.count_pages_with_lemma(bar.id).unwrap(), 2);
    }

    // Search sees the committed index
    let results = search::search(&ctx.storage, 1.0, "bar", Some(&site_url), 0, 20).unwrap();
    let mut uris: Vec<&str> = results.iter().map(|r| r.uri.as_str()).collect();
    uris.sort();
    assert_eq!(uris, vec!["/a", "/b"]);

    let results = search::search(&ctx.storage, 1.0, "bar qux", Some(&site_url), 0, 20).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].uri, "/b");
    assert_eq!(results[0].site, site_url);
    assert_eq!(results[0].site_name, "Test Site");
    assert!(results[0].snippet.contains("qux"));

    // Statistics aggregate the same state
    let data = stats::collect(&ctx.storage, service.is_indexing()).unwrap();
    assert_eq!(data.total.sites, 1);
    assert_eq!(data.total.pages, 3);
    assert!(data.total.lemmas >= 4);
    assert!(!data.total.indexing);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("landing page").set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let service = test_service(test_config(&server.uri()));

    service.start_indexing().unwrap();
    assert!(service.start_indexing().is_err());

    wait_until_idle(&service).await;
    // After completion a new run is accepted again
    service.start_indexing().unwrap();
    wait_until_idle(&service).await;
}

#[tokio::test]
async fn test_stop_marks_sites_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(r#"<a href="/next">next</a>"#).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    let site_url = server.uri();
    let service = test_service(test_config(&site_url));

    service.start_indexing().unwrap();
    // Let the site task create its row and enter the root fetch
    tokio::time::sleep(Duration::from_millis(150)).await;
    service.stop_indexing();

    wait_until_idle(&service).await;

    let ctx = service.context();
    let store = storage::lock(&ctx.storage);
    let site = store.find_site_by_url(&site_url).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(STOP_MESSAGE));
}

#[tokio::test]
async fn test_index_single_page_and_reindex() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solo"))
        .respond_with(html("standalone document content"))
        .mount(&server)
        .await;

    let site_url = server.uri();
    let service = test_service(test_config(&site_url));
    let page_url = format!("{site_url}/solo");

    // First index creates the site row on demand
    assert!(service.index_page(&page_url).await.unwrap());

    let ctx = service.context();
    let (site_id, lemmas_before) = {
        let store = storage::lock(&ctx.storage);
        let site = store.find_site_by_url(&site_url).unwrap().unwrap();
        assert_eq!(site.status, SiteStatus::Indexed);

        let page = store.find_page(site.id, "/solo").unwrap().unwrap();
        assert_eq!(page.code, 200);
        assert!(page.content.contains("standalone"));

        (site.id, store.count_lemmas(site.id).unwrap())
    };
    assert!(lemmas_before > 0);

    // Reindexing the same page must not duplicate lemma rows
    assert!(service.index_page(&page_url).await.unwrap());
    {
        let store = storage::lock(&ctx.storage);
        assert_eq!(store.count_lemmas(site_id).unwrap(), lemmas_before);
        assert_eq!(store.count_pages(site_id).unwrap(), 1);
    }

    // URLs outside the configured sites are rejected
    assert!(!service.index_page("http://elsewhere.test/page").await.unwrap());
}
