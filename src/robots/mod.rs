//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt files, and discovers XML
//! sitemaps for seeding the crawl.

mod cache;
mod parser;
pub mod sitemap;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use reqwest::Client;

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `origin` - Scheme, host and port, e.g. `https://example.com`
///
/// # Returns
///
/// The parsed robots.txt. Missing files, non-success statuses and network
/// errors all yield an allow-all policy.
pub async fn fetch_robots(client: &Client, origin: &str) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned {}", robots_url, response.status());
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!("Failed to read {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Sitemaps to read for an origin: the ones robots.txt lists, or `/sitemap.xml`
pub fn sitemap_locations(robots: &ParsedRobots, origin: &str) -> Vec<String> {
    let listed = robots.sitemaps();
    if listed.is_empty() {
        vec![format!("{}/sitemap.xml", origin.trim_end_matches('/'))]
    } else {
        listed
    }
}
