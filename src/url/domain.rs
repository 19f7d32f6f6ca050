use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host portion, or `None` for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the last two labels of a host name (`blog.example.com` -> `example.com`)
///
/// Used to classify links and images as inner or outer relative to the page.
pub fn second_level_domain(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').collect();
    let start = parts.len().saturating_sub(2);
    parts[start..].join(".")
}

/// Returns the URL protocol in the `scheme:` form (`https:`)
pub fn protocol_of(url: &Url) -> String {
    format!("{}:", url.scheme())
}
