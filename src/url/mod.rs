//! URL handling for Searchlight
//!
//! This module canonicalizes hosts, derives site-relative page paths,
//! matches URLs against the configured site roots and builds the keys used
//! for crawl deduplication.

use crate::config::SiteEntry;
use crate::UrlError;
use url::Url;

/// Parses a configured site root URL
///
/// Requires an absolute http(s) URL with a host.
pub fn parse_site_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns the canonical host key of a URL: lowercase, without a leading
/// `www.` prefix.
pub fn host_key(url: &Url) -> Option<String> {
    url.host_str().map(|host| {
        let host = host.to_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    })
}

/// Checks whether `url` belongs to the site rooted at `site_url`.
///
/// Two URLs belong to the same site when their scheme, canonical host key
/// and explicit port all match. The scheme is part of the canonical site
/// identity, so the http and https variants of one host are distinct
/// sites.
pub fn same_site(url: &Url, site_url: &Url) -> bool {
    if url.scheme() != site_url.scheme() {
        return false;
    }
    if url.port() != site_url.port() {
        return false;
    }
    match (host_key(url), host_key(site_url)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Finds the configured site a URL belongs to, if any.
pub fn owning_site<'a>(sites: &'a [SiteEntry], url: &Url) -> Option<&'a SiteEntry> {
    sites.iter().find(|entry| {
        parse_site_url(&entry.url)
            .map(|site_url| same_site(url, &site_url))
            .unwrap_or(false)
    })
}

/// Returns the site-relative path of a page URL: the path plus the query
/// string, with `/` for the root.
pub fn page_path(url: &Url) -> String {
    let path = url.path();
    let path = if path.is_empty() { "/" } else { path };

    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

/// Builds the deduplication key for a URL: the absolute URL without its
/// fragment.
pub fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
