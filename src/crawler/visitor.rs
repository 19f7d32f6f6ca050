//! One page visit: policy, render, extraction and audit

use crate::audit::Auditor;
use crate::crawler::result::PageResult;
use crate::crawler::scheduler::QueuedUrl;
use crate::fields::FieldCatalog;
use crate::policy::{RequestDecision, RequestPolicy, ResourceType};
use crate::render::{RenderError, Renderer, SubRequest};
use crate::url::protocol_of;
use std::sync::{Arc, Mutex};

/// Drives single page visits for a session
///
/// Shared by all workers; holds no per-visit state.
pub struct PageVisitor {
    renderer: Arc<dyn Renderer>,
    auditor: Option<Arc<dyn Auditor>>,
    policy: Arc<RequestPolicy>,
    catalog: Arc<FieldCatalog>,
    locale: String,
}

impl PageVisitor {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        policy: Arc<RequestPolicy>,
        catalog: Arc<FieldCatalog>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            auditor: None,
            policy,
            catalog,
            locale: locale.into(),
        }
    }

    pub fn with_auditor(mut self, auditor: Arc<dyn Auditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Visits one queued URL
    ///
    /// Documents are recorded without rendering. Extraction and audit failures
    /// are kept on the result; only navigation failures are returned as errors.
    pub async fn visit(&self, queued: &QueuedUrl) -> Result<PageResult, RenderError> {
        let requested = queued.url.as_str();

        if self.policy.is_document(requested) {
            tracing::debug!("Document {}, not rendering", requested);
            return Ok(PageResult::document(queued));
        }

        let page_protocol = protocol_of(&queued.url);
        let mixed_content: Mutex<Option<String>> = Mutex::new(None);
        let policy = self.policy.as_ref();

        let filter = |request: &SubRequest| -> RequestDecision {
            // The navigation itself was admitted when it was queued
            if request.resource == ResourceType::Document && request.url == requested {
                return RequestDecision::Allow;
            }
            let decision = policy.decide(&request.url, request.resource, &page_protocol);
            if decision == RequestDecision::AbortAsMixedContent {
                if let Ok(mut slot) = mixed_content.lock() {
                    slot.get_or_insert_with(|| request.url.clone());
                }
            }
            decision
        };

        let page = self.renderer.render(&queued.url, &filter).await?;
        let mut result = PageResult::rendered(queued, &page);

        match self.renderer.extract(&page, self.catalog.custom_fields()) {
            Ok(fields) => result.set_fields(fields),
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {}", result.url, e);
                result.error = Some(e.to_string());
            }
        }

        if let Some(url) = mixed_content.into_inner().ok().flatten() {
            tracing::debug!("Mixed content on {}: {}", result.url, url);
            result.set_mixed_content(url);
        }

        if let Some(auditor) = &self.auditor {
            if result.error.is_none() {
                match auditor.audit(page.final_url.as_str(), &self.locale).await {
                    Ok(report) => result.set_audit(report),
                    Err(e) => tracing::warn!("Audit failed for {}: {}", result.url, e),
                }
            }
        }

        Ok(result)
    }
}
