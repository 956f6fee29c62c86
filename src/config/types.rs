use serde::Deserialize;

/// Main configuration structure for Searchlight
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Site roots to crawl and serve search results for
    #[serde(default)]
    pub sites: Vec<SiteEntry>,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// A configured site root
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Absolute root URL, e.g. "https://example.com"
    pub url: String,

    /// Human-readable site name shown in statistics and search results
    pub name: String,
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexingConfig {
    /// Number of concurrent crawl workers; defaults to the CPU count
    pub parallelism: Option<usize>,
}

impl IndexingConfig {
    /// Resolves the configured parallelism, falling back to the CPU count.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header sent with every request
    #[serde(default = "default_referrer")]
    pub referrer: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Minimum interval between requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referrer: default_referrer(),
            request_timeout_ms: default_request_timeout_ms(),
            politeness_delay_ms: default_politeness_delay_ms(),
        }
    }
}

/// Search ranking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Lemmas occurring on more than this share of a site's pages are
    /// dropped from queries
    #[serde(
        rename = "high-frequency-lemma-threshold",
        default = "default_high_frequency_threshold"
    )]
    pub high_frequency_lemma_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            high_frequency_lemma_threshold: default_high_frequency_threshold(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the API server binds to
    #[serde(rename = "bind-addr", default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
        }
    }
}

fn default_user_agent() -> String {
    "SearchlightBot/0.1".to_string()
}

fn default_referrer() -> String {
    "https://www.google.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_politeness_delay_ms() -> u64 {
    500
}

fn default_high_frequency_threshold() -> f64 {
    0.30
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database_path() -> String {
    "./searchlight.db".to_string()
}
