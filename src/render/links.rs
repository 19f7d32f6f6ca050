//! Link and sub-resource discovery in rendered HTML
//!
//! Links to follow come from `<a href>` tags and the canonical link. Static
//! sub-resources (images, stylesheets, scripts) are reported separately so the
//! request policy can decide whether the renderer would load them.

use crate::policy::ResourceType;
use scraper::{Html, Selector};
use url::Url;

/// A request the page triggers while it is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRequest {
    pub url: String,
    pub resource: ResourceType,
}

/// Extracts all followable links from the document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
///
/// Links come back absolute, without fragment, in document order.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(absolute) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(absolute);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(absolute);
            }
        }
    }

    links
}

/// Lists the static sub-resources a browser would request for this document
pub fn extract_sub_requests(document: &Html, base_url: &Url) -> Vec<SubRequest> {
    let sources = [
        ("img[src]", "src", ResourceType::Image),
        ("link[rel='stylesheet'][href]", "href", ResourceType::Stylesheet),
        ("script[src]", "src", ResourceType::Script),
    ];

    let mut requests = Vec::new();
    for (selector, attr, resource) in sources {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(url) = element.value().attr(attr).and_then(|s| resolve_link(s, base_url)) {
                requests.push(SubRequest { url, resource });
            }
        }
    }
    requests
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for special schemes, fragment-only links and anything that
/// does not resolve to http or https.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}
