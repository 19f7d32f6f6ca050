use crate::UrlError;
use url::Url;

/// Normalizes a discovered URL into the form used for de-duplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http:// or https://
/// 3. Lowercase the host (the `url` crate already does this for special schemes)
/// 4. Remove the fragment (everything after #)
///
/// Paths, trailing slashes and query strings are kept as-is: two URLs that
/// differ only there can serve different pages and both belong in the report.
///
/// # Examples
///
/// ```
/// use site_audit::url::normalize_url;
///
/// let url = normalize_url("https://Example.com/page#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Percent-decodes a URL for display and reporting
///
/// Falls back to the raw string when the decoded bytes are not valid UTF-8.
pub fn decode_url(url: &str) -> String {
    urlencoding::decode(url)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| url.to_string())
}
