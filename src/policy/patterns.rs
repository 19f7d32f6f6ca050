//! Fixed table of URL shapes that never carry audit value
//!
//! These are CMS and asset URLs that naive link-following would otherwise pull
//! into the crawl: resized image endpoints, accessibility-mode copies of every
//! page, gallery/lightbox views and catalog sort/filter permutations.

use regex::Regex;
use std::sync::LazyLock;

/// Image files reached through a link (never worth navigating to)
static IMAGE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif)").expect("hardcoded regex pattern is valid")
});

/// Resized-image endpoints (`?width=300&height=200`)
static IMAGE_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\?width=\d+&height=\d+").expect("hardcoded regex pattern is valid")
});

/// Substrings of known non-content endpoints
const NOISE_SUBSTRINGS: &[&str] = &[
    // version for the visually impaired
    "?vi=y",
    // Bitrix gallery 2.0
    "gallery/?page=detail",
    "/?lightbox=",
    // Bitrix ad rotation redirects
    "rk.php",
    "/?catalog_view=",
    "/?SORT=",
    "/filter/clear/apply/",
];

/// Returns true if the URL matches one of the known non-content shapes
pub fn is_noise(url: &str) -> bool {
    IMAGE_SIGNATURE.is_match(url) || NOISE_SUBSTRINGS.iter().any(|s| url.contains(s))
}

/// Returns true if navigating to this URL would open an image file
pub fn is_image_file(url: &str) -> bool {
    IMAGE_FILE.is_match(url)
}
