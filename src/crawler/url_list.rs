//! URL-list mode input: absolute URLs pulled out of a local or remote document

use crate::Result;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?:https?|ftp|file)://|www\.|ftp\.)(?:\([-A-Z0-9+&#/%=~_|$?!:,.]*\)|[-A-Z0-9+&#/%=~_|$?!:,.])*(?:\([-A-Z0-9+&#/%=~_|$?!:,.]*\)|[A-Z0-9+&#/%=~_|$])",
    )
    .expect("hardcoded regex pattern is valid")
});

static ASSET_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpg|js|css)$").expect("hardcoded regex pattern is valid")
});

/// Extracts the URLs to scan from arbitrary text
///
/// Static assets are skipped, `www.` hosts get an `http://` scheme and
/// duplicates are dropped (first occurrence wins).
///
/// # Examples
///
/// ```
/// use site_audit::crawler::parse_url_list;
///
/// let urls = parse_url_list("http://a.com/x\nhttp://a.com/x\nhttp://a.com/y.png");
/// assert_eq!(urls, vec!["http://a.com/x"]);
/// ```
pub fn parse_url_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_PATTERN
        .find_iter(content)
        .map(|m| m.as_str())
        .filter(|url| !ASSET_SUFFIX.is_match(url))
        .map(|url| {
            if url.to_ascii_lowercase().starts_with("www.") {
                format!("http://{}", url)
            } else {
                url.to_string()
            }
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Reads a URL list from a file path or, failing that, over HTTP
pub async fn load_url_list(client: &Client, source: &str) -> Result<Vec<String>> {
    let path = Path::new(source);
    let content = if path.is_file() {
        tokio::fs::read_to_string(path).await?
    } else {
        client
            .get(source)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?
    };

    let urls = parse_url_list(&content);
    tracing::info!("Loaded {} URLs from {}", urls.len(), source);
    Ok(urls)
}
