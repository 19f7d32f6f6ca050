//! Built-in report presets
//!
//! A preset is a named, ordered list of field identifiers that defines the
//! columns of a report.

use crate::fields::FieldError;

/// Preset used when the requested one does not exist
pub const DEFAULT_PRESET: &str = "default";

/// Preset holding every audit field; appended when auditing is enabled
pub const AUDIT_FULL_PRESET: &str = "lighthouse-all";

const MINIMAL: &[&str] = &[
    "response.url",
    "depth",
    "response.status",
    "result.request_time",
    "result.title",
];

const SEO_MINIMAL: &[&str] = &[
    "response.url",
    "depth",
    "response.status",
    "result.request_time",
    "result.title",
    "result.h1",
    "result.description",
    "result.canonical",
    "result.is_canonical",
    "result.mixed_content_url",
];

const SEO: &[&str] = &[
    "response.url",
    "depth",
    "response.status",
    "result.request_time",
    "result.title",
    "result.h1",
    "result.description",
    "result.keywords",
    "result.og_title",
    "result.og_image",
    "result.schema_types",
    "result.h1_count",
    "result.h2_count",
    "result.h3_count",
    "result.h4_count",
    "result.canonical",
    "result.is_canonical",
    "result.canonical_count",
    "result.google_amp",
    "result.images",
    "result.images_without_alt",
    "result.images_alt_empty",
    "result.images_outer",
    "result.links",
    "result.links_inner",
    "result.links_outer",
    "result.text_ratio_percent",
    "result.dom_size",
    "result.html_size",
    "result.mixed_content_url",
    "previousUrl",
];

const HEADERS: &[&str] = &[
    "response.url",
    "depth",
    "response.status",
    "result.title",
    "result.h1",
    "result.h1_count",
    "result.h2_count",
    "result.h3_count",
    "result.h4_count",
];

const PARSE: &[&str] = &[
    "response.url",
    "depth",
    "result.title",
    "result.h1",
    "result.description",
    "result.keywords",
    "result.og_title",
    "result.og_image",
    "result.schema_types",
    "result.html_size",
];

const LIGHTHOUSE: &[&str] = &[
    "response.url",
    "depth",
    "lighthouse.scores.performance",
    "lighthouse.scores.accessibility",
    "lighthouse.scores.best-practices",
    "lighthouse.scores.seo",
    "lighthouse.scores.pwa",
    "lighthouse.first-contentful-paint",
    "lighthouse.speed-index",
    "lighthouse.largest-contentful-paint",
    "lighthouse.interactive",
    "lighthouse.total-blocking-time",
    "lighthouse.cumulative-layout-shift",
];

const LIGHTHOUSE_ALL: &[&str] = &[
    "response.url",
    "depth",
    "response.status",
    "lighthouse.scores.performance",
    "lighthouse.scores.accessibility",
    "lighthouse.scores.best-practices",
    "lighthouse.scores.seo",
    "lighthouse.scores.pwa",
    "lighthouse.first-contentful-paint",
    "lighthouse.speed-index",
    "lighthouse.largest-contentful-paint",
    "lighthouse.interactive",
    "lighthouse.total-blocking-time",
    "lighthouse.cumulative-layout-shift",
    "lighthouse.first-meaningful-paint",
    "lighthouse.max-potential-fid",
    "lighthouse.server-response-time",
    "lighthouse.dom-size",
    "lighthouse.bootup-time",
    "lighthouse.mainthread-work-breakdown",
    "lighthouse.uses-responsive-images",
    "lighthouse.uses-optimized-images",
    "lighthouse.uses-text-compression",
    "lighthouse.render-blocking-resources",
    "lighthouse.unused-css-rules",
    "lighthouse.unused-javascript",
    "lighthouse.total-byte-weight",
    "lighthouse.document-title",
    "lighthouse.meta-description",
    "lighthouse.http-status-code",
    "lighthouse.is-crawlable",
    "lighthouse.robots-txt",
    "lighthouse.image-alt",
    "lighthouse.hreflang",
    "lighthouse.canonical",
    "lighthouse.is-on-https",
    "lighthouse.viewport",
    "lighthouse.color-contrast",
    "lighthouse.link-name",
    "lighthouse.html-has-lang",
];

/// All preset names, in the order they are listed in help output
pub const PRESET_NAMES: &[&str] = &[
    DEFAULT_PRESET,
    "minimal",
    "seo-minimal",
    "seo",
    "headers",
    "parse",
    "lighthouse",
    AUDIT_FULL_PRESET,
];

/// Looks up a preset by name
///
/// # Returns
///
/// * `Ok(&[&str])` - The ordered field identifiers of the preset
/// * `Err(FieldError::InvalidPreset)` - No preset has this name
pub fn lookup(name: &str) -> Result<&'static [&'static str], FieldError> {
    match name {
        DEFAULT_PRESET | "seo" => Ok(SEO),
        "minimal" => Ok(MINIMAL),
        "seo-minimal" => Ok(SEO_MINIMAL),
        "headers" => Ok(HEADERS),
        "parse" => Ok(PARSE),
        "lighthouse" => Ok(LIGHTHOUSE),
        AUDIT_FULL_PRESET => Ok(LIGHTHOUSE_ALL),
        other => Err(FieldError::InvalidPreset(other.to_string())),
    }
}

/// Returns true if selecting this preset implies running the audit
pub fn requires_audit(name: &str) -> bool {
    name == "lighthouse" || name == AUDIT_FULL_PRESET
}
