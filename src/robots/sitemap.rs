//! XML sitemap discovery
//!
//! Reads `<loc>` entries from a sitemap so they can seed the crawl queue.
//! Sitemap indexes are followed one level deep.

use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;

static LOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("hardcoded regex pattern is valid")
});

/// Extracts `<loc>` URLs from sitemap XML, unescaping `&amp;`
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|url| !url.is_empty())
        .collect()
}

fn is_sitemap_index(xml: &str) -> bool {
    xml.contains("<sitemapindex")
}

async fn fetch_text(client: &Client, url: &str) -> Option<String> {
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        tracing::debug!("Sitemap {} returned {}", url, response.status());
        return None;
    }
    response.text().await.ok()
}

/// Fetches page URLs from the given sitemaps
///
/// Failures are logged and skipped; a missing sitemap yields no URLs.
pub async fn fetch_sitemap_urls(client: &Client, sitemaps: &[String]) -> Vec<String> {
    let mut urls = Vec::new();

    for sitemap in sitemaps {
        let Some(xml) = fetch_text(client, sitemap).await else {
            tracing::warn!("Could not read sitemap {}", sitemap);
            continue;
        };

        if !is_sitemap_index(&xml) {
            urls.extend(extract_locs(&xml));
            continue;
        }

        for nested in extract_locs(&xml) {
            match fetch_text(client, &nested).await {
                Some(nested_xml) => urls.extend(extract_locs(&nested_xml)),
                None => tracing::warn!("Could not read sitemap {}", nested),
            }
        }
    }

    tracing::info!("Found {} URLs in sitemap", urls.len());
    urls
}
