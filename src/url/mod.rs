//! URL handling module for Site-Audit
//!
//! This module provides URL normalization, decoding, domain extraction and the
//! domain-restriction check used when following links.

mod domain;
mod normalize;

pub use domain::{extract_domain, protocol_of, second_level_domain};
pub use normalize::{decode_url, normalize_url};

use url::Url;

/// Checks whether a discovered URL stays within the crawl's start host
///
/// Domain restriction compares the full host, so `blog.example.com` is a
/// different domain from `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_audit::url::is_same_domain;
///
/// let url = Url::parse("https://example.com/about").unwrap();
/// assert!(is_same_domain(&url, "example.com"));
/// assert!(!is_same_domain(&url, "other.com"));
/// ```
pub fn is_same_domain(url: &Url, domain: &str) -> bool {
    extract_domain(url)
        .map(|host| host == domain.to_lowercase())
        .unwrap_or(false)
}
