use crate::audit::AuditReport;
use crate::crawler::scheduler::QueuedUrl;
use crate::fields::{FieldCatalog, FieldMap, FieldValue};
use crate::render::RenderedPage;
use crate::url::decode_url;

/// Built-in identifiers filled from crawl metadata rather than page content
pub const URL_FIELD: &str = "response.url";
pub const DEPTH_FIELD: &str = "depth";
pub const STATUS_FIELD: &str = "response.status";
pub const PREVIOUS_URL_FIELD: &str = "previousUrl";
pub const MIXED_CONTENT_FIELD: &str = "result.mixed_content_url";

/// Everything recorded about one visited page
///
/// Field values live in `fields`, keyed by field identifier; identifiers the
/// page has no value for are simply absent.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Decoded final URL
    pub url: String,
    pub requested_url: String,
    pub depth: u32,
    pub previous_url: Option<String>,
    pub status: Option<u16>,
    pub fields: FieldMap,
    pub audit: Option<AuditReport>,
    pub mixed_content_url: Option<String>,
    /// Set when extraction failed
    pub error: Option<String>,
    /// Matched a document extension and was not rendered
    pub is_document: bool,
    /// Absolute links found on the page
    pub links: Vec<String>,
}

impl PageResult {
    /// Row for a document URL: only the URL is populated
    pub fn document(queued: &QueuedUrl) -> Self {
        let url = decode_url(queued.url.as_str());
        let mut fields = FieldMap::new();
        fields.insert(URL_FIELD.to_string(), FieldValue::Text(url.clone()));

        Self {
            url,
            requested_url: queued.url.to_string(),
            depth: queued.depth,
            previous_url: queued.previous_url.clone(),
            status: None,
            fields,
            audit: None,
            mixed_content_url: None,
            error: None,
            is_document: true,
            links: Vec::new(),
        }
    }

    /// Result skeleton for a rendered page, before extraction
    pub fn rendered(queued: &QueuedUrl, page: &RenderedPage) -> Self {
        let mut result = Self {
            url: decode_url(page.final_url.as_str()),
            requested_url: queued.url.to_string(),
            depth: queued.depth,
            previous_url: queued.previous_url.clone(),
            status: Some(page.status),
            fields: FieldMap::new(),
            audit: None,
            mixed_content_url: None,
            error: None,
            is_document: false,
            links: page.links.clone(),
        };
        result.insert_metadata();
        result
    }

    /// Replaces the page fields, keeping the crawl metadata
    pub fn set_fields(&mut self, fields: FieldMap) {
        self.fields = fields;
        self.insert_metadata();
    }

    pub fn set_mixed_content(&mut self, url: String) {
        self.fields
            .insert(MIXED_CONTENT_FIELD.to_string(), FieldValue::Text(url.clone()));
        self.mixed_content_url = Some(url);
    }

    pub fn set_audit(&mut self, report: AuditReport) {
        self.fields.extend(report.to_fields());
        self.audit = Some(report);
    }

    fn insert_metadata(&mut self) {
        self.fields
            .insert(URL_FIELD.to_string(), FieldValue::Text(self.url.clone()));
        self.fields
            .insert(DEPTH_FIELD.to_string(), FieldValue::Integer(self.depth as i64));
        if let Some(status) = self.status {
            self.fields
                .insert(STATUS_FIELD.to_string(), FieldValue::Integer(status as i64));
        }
        if let Some(previous) = &self.previous_url {
            self.fields
                .insert(PREVIOUS_URL_FIELD.to_string(), FieldValue::Text(previous.clone()));
        }
        if let Some(mixed) = &self.mixed_content_url {
            self.fields
                .insert(MIXED_CONTENT_FIELD.to_string(), FieldValue::Text(mixed.clone()));
        }
    }

    pub fn value(&self, id: &str) -> Option<&FieldValue> {
        self.fields.get(id)
    }

    /// Values in catalog order, one per column
    pub fn row(&self, catalog: &FieldCatalog) -> Vec<Option<&FieldValue>> {
        catalog.fields().iter().map(|id| self.value(id)).collect()
    }
}
