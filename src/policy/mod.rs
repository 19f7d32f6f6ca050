//! Request policy module
//!
//! Decides, for every network request issued while a page is visited, whether
//! it may proceed. The policy is a pure decision table: the same arguments
//! always produce the same decision and nothing is recorded here.

pub mod patterns;

use url::Url;

/// Kind of resource a request loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// A page navigation
    Document,
    Image,
    Stylesheet,
    Script,
    Other,
}

impl ResourceType {
    /// Images, stylesheets and scripts
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Image | Self::Stylesheet | Self::Script)
    }
}

/// Outcome of the request policy for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestDecision {
    Allow,
    Abort,
    /// Insecure sub-resource on a secure page; the URL is reported on the page
    AbortAsMixedContent,
}

impl RequestDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Which static resource types the renderer should not load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSkip {
    pub images: bool,
    pub stylesheets: bool,
    pub scripts: bool,
}

impl StaticSkip {
    pub fn all(skip: bool) -> Self {
        Self {
            images: skip,
            stylesheets: skip,
            scripts: skip,
        }
    }

    fn skips(&self, resource: ResourceType) -> bool {
        match resource {
            ResourceType::Image => self.images,
            ResourceType::Stylesheet => self.stylesheets,
            ResourceType::Script => self.scripts,
            ResourceType::Document | ResourceType::Other => false,
        }
    }
}

/// Request filtering policy, configured once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    docs_extensions: Vec<String>,
    skip: StaticSkip,
    initial_protocol: String,
}

impl RequestPolicy {
    /// Creates a policy
    ///
    /// # Arguments
    ///
    /// * `docs_extensions` - Extensions (without dot) treated as non-renderable documents
    /// * `skip` - Static resource types to abort
    /// * `initial_protocol` - Protocol of the start URL in `scheme:` form, e.g. `https:`
    pub fn new(docs_extensions: &[String], skip: StaticSkip, initial_protocol: &str) -> Self {
        Self {
            docs_extensions: docs_extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            skip,
            initial_protocol: initial_protocol.to_string(),
        }
    }

    pub fn initial_protocol(&self) -> &str {
        &self.initial_protocol
    }

    /// Decides what happens to one request made during a page visit
    ///
    /// # Rules, in priority order
    ///
    /// 1. http image/stylesheet/script on an https page -> `AbortAsMixedContent`
    /// 2. URL is a configured document type -> `Abort`
    /// 3. URL is a known non-content shape (and, for navigations, an image file) -> `Abort`
    /// 4. Static resource type whose skip flag is set -> `Abort`
    /// 5. Navigation to a protocol other than the session's initial one -> `Abort`
    /// 6. Otherwise -> `Allow`
    pub fn decide(&self, url: &str, resource: ResourceType, page_protocol: &str) -> RequestDecision {
        if page_protocol == "https:" && resource.is_static() && url.starts_with("http:") {
            return RequestDecision::AbortAsMixedContent;
        }

        if self.is_document(url) {
            return RequestDecision::Abort;
        }

        if patterns::is_noise(url)
            || (resource == ResourceType::Document && patterns::is_image_file(url))
        {
            return RequestDecision::Abort;
        }

        if self.skip.skips(resource) {
            return RequestDecision::Abort;
        }

        if resource == ResourceType::Document && !self.same_protocol(url) {
            return RequestDecision::Abort;
        }

        RequestDecision::Allow
    }

    /// Decides whether a discovered link may enter the crawl queue
    ///
    /// Same as [`decide`](Self::decide) for a navigation, except that document
    /// URLs are admitted: they are recorded by the visitor without rendering.
    pub fn admit_navigation(&self, url: &str) -> bool {
        !patterns::is_noise(url) && !patterns::is_image_file(url) && self.same_protocol(url)
    }

    /// Returns true if the URL path ends with a configured document extension
    pub fn is_document(&self, url: &str) -> bool {
        let path = Url::parse(url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| url.to_lowercase());
        self.docs_extensions
            .iter()
            .any(|ext| path.ends_with(&format!(".{}", ext)))
    }

    fn same_protocol(&self, url: &str) -> bool {
        url.split_once("//")
            .map(|(protocol, _)| protocol.eq_ignore_ascii_case(&self.initial_protocol))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<String> {
        ["doc", "docx", "pdf", "zip"].iter().map(|s| s.to_string()).collect()
    }

    fn policy(skip: bool) -> RequestPolicy {
        RequestPolicy::new(&docs(), StaticSkip::all(skip), "https:")
    }

    #[test]
    fn test_mixed_content_beats_every_other_rule() {
        let p = policy(false);
        for resource in [ResourceType::Image, ResourceType::Stylesheet, ResourceType::Script] {
            assert_eq!(
                p.decide("http://cdn.example.com/a.png", resource, "https:"),
                RequestDecision::AbortAsMixedContent
            );
        }
        assert_eq!(
            policy(true).decide("http://example.com/file.pdf", ResourceType::Image, "https:"),
            RequestDecision::AbortAsMixedContent
        );
    }

    #[test]
    fn test_http_page_has_no_mixed_content() {
        let p = RequestPolicy::new(&docs(), StaticSkip::all(false), "http:");
        assert_eq!(
            p.decide("http://example.com/a.css", ResourceType::Stylesheet, "http:"),
            RequestDecision::Allow
        );
    }

    #[test]
    fn test_document_extensions_abort() {
        let p = policy(false);
        assert_eq!(
            p.decide("https://example.com/price.PDF", ResourceType::Other, "https:"),
            RequestDecision::Abort
        );
        assert!(p.is_document("https://example.com/files/report.docx?v=2"));
        assert!(!p.is_document("https://example.com/docs/"));
    }

    #[test]
    fn test_noise_aborts() {
        let p = policy(false);
        assert_eq!(
            p.decide("https://example.com/?SORT=name", ResourceType::Document, "https:"),
            RequestDecision::Abort
        );
    }

    #[test]
    fn test_static_skip_flags() {
        let skip = policy(true);
        let keep = policy(false);
        let css = "https://example.com/site.css";
        assert_eq!(skip.decide(css, ResourceType::Stylesheet, "https:"), RequestDecision::Abort);
        assert_eq!(keep.decide(css, ResourceType::Stylesheet, "https:"), RequestDecision::Allow);

        let only_scripts = RequestPolicy::new(
            &docs(),
            StaticSkip {
                images: false,
                stylesheets: false,
                scripts: true,
            },
            "https:",
        );
        assert_eq!(
            only_scripts.decide("https://example.com/a.js", ResourceType::Script, "https:"),
            RequestDecision::Abort
        );
        assert_eq!(
            only_scripts.decide("https://example.com/a.png", ResourceType::Image, "https:"),
            RequestDecision::Allow
        );
    }

    #[test]
    fn test_protocol_downgrade_navigation_aborts() {
        let p = policy(false);
        assert_eq!(
            p.decide("http://example.com/page", ResourceType::Document, "https:"),
            RequestDecision::Abort
        );
        assert_eq!(
            p.decide("https://example.com/page", ResourceType::Document, "https:"),
            RequestDecision::Allow
        );
    }

    #[test]
    fn test_decide_is_pure() {
        let p = policy(true);
        let cases = [
            ("http://example.com/x.png", ResourceType::Image),
            ("https://example.com/x", ResourceType::Document),
            ("https://example.com/x.zip", ResourceType::Other),
        ];
        for (url, resource) in cases {
            assert_eq!(p.decide(url, resource, "https:"), p.decide(url, resource, "https:"));
        }
    }

    #[test]
    fn test_admit_navigation() {
        let p = policy(true);
        assert!(p.admit_navigation("https://example.com/about"));
        assert!(p.admit_navigation("https://example.com/price.pdf"));
        assert!(!p.admit_navigation("https://example.com/logo.png"));
        assert!(!p.admit_navigation("http://example.com/about"));
        assert!(!p.admit_navigation("https://example.com/?vi=y"));
    }
}
