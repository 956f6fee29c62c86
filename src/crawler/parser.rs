//! HTML parsing: titles, visible text and internal links

use crate::url::{same_site, visit_key};
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts the page title from HTML content
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Extracts the visible text of an HTML document.
///
/// Text inside `head`, `script`, `style` and `noscript` elements is
/// skipped; the remaining text nodes are joined with single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut parts = Vec::new();
    for node in document.tree.nodes() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => {
                    matches!(element.name(), "head" | "script" | "style" | "noscript")
                }
                _ => false,
            });
            if !hidden {
                parts.push(&**text);
            }
        }
    }

    parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the same-origin links of a page.
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` targets resolved against `page_url` that
/// share the site's scheme and canonical host.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links (same-page anchors)
/// - `<a href="..." download>` targets
/// - anything off-site or non-http(s)
///
/// Fragments are stripped from the returned URLs and duplicates removed
/// while keeping document order.
pub fn extract_internal_links(html: &str, page_url: &Url, site_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_link(href, page_url) else {
            continue;
        };
        if !same_site(&resolved, site_url) {
            continue;
        }

        let key = visit_key(&resolved);
        if seen.insert(key.clone()) {
            links.push(key);
        }
    }

    links
}

/// Resolves an href to an absolute URL, filtering out non-navigable links
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}
