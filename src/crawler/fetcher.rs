//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and referrer
//! - Enforcing the per-host politeness delay, globally across all workers
//! - Classifying responses into outcomes the indexing tasks act on

use crate::config::FetcherConfig;
use reqwest::{header, redirect::Policy, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// Result of a single page fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx HTML response with a body
    Success { code: u16, body: String },

    /// Non-2xx HTTP response
    HttpError { code: u16 },

    /// 2xx response whose Content-Type is not HTML
    NotHtml { content_type: String },

    /// Connection, TLS or timeout failure before a status was received
    NetworkError { error: String },
}

impl FetchOutcome {
    /// HTTP status code to record on the page row for this outcome.
    ///
    /// Transport failures have no status of their own and are recorded as
    /// 503 so that operators can see which URLs failed.
    pub fn page_code(&self) -> u16 {
        match self {
            Self::Success { code, .. } | Self::HttpError { code } => *code,
            Self::NotHtml { .. } => 200,
            Self::NetworkError { .. } => 503,
        }
    }
}

/// Enforces the minimum interval between requests to the same host.
///
/// The interval is global per host, not per worker: every crawl task shares
/// one gate.
pub struct PolitenessGate {
    delay: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl PolitenessGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until the host may be contacted again, then claims the slot.
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let mut last = self
                    .last_request
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                match last.get(host) {
                    Some(previous) if previous.elapsed() < self.delay => {
                        self.delay - previous.elapsed()
                    }
                    _ => {
                        last.insert(host.to_string(), Instant::now());
                        return;
                    }
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// HTTP fetcher shared by all crawl workers
pub struct PageFetcher {
    client: Client,
    gate: PolitenessGate,
}

impl PageFetcher {
    /// Builds a fetcher from the configured user agent, referrer, request
    /// timeout and politeness delay.
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let mut headers = header::HeaderMap::new();
        if let Ok(referrer) = header::HeaderValue::from_str(&config.referrer) {
            headers.insert(header::REFERER, referrer);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .redirect(Policy::limited(10))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            gate: PolitenessGate::new(Duration::from_millis(config.politeness_delay_ms)),
        })
    }

    /// Fetches one URL, honoring the politeness delay for its host.
    ///
    /// Never returns an error: every failure mode is folded into a
    /// `FetchOutcome` so callers can record it on the page row.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        if let Some(host) = url.host_str() {
            self.gate.acquire(&host.to_lowercase()).await;
        }

        tracing::debug!(url = %url, "fetching");

        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    return FetchOutcome::HttpError {
                        code: status.as_u16(),
                    };
                }

                let content_type = response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                if !content_type.is_empty() && !content_type.contains("text/html") {
                    return FetchOutcome::NotHtml { content_type };
                }

                match response.text().await {
                    Ok(body) => FetchOutcome::Success {
                        code: status.as_u16(),
                        body,
                    },
                    Err(e) => FetchOutcome::NetworkError {
                        error: e.to_string(),
                    },
                }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    "connection refused".to_string()
                } else {
                    e.to_string()
                };
                FetchOutcome::NetworkError { error }
            }
        }
    }
}
