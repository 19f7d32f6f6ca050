//! Page audit module
//!
//! An audit is a performance/accessibility/SEO scoring pass over a page, run
//! in its own browser instance next to the renderer. Audits are expensive and
//! share one browser, so the crawler runs them through [`SerializedAuditor`].

mod lighthouse;
mod report;

pub use lighthouse::{LighthouseAuditor, LighthouseConfig};
pub use report::{parse_lighthouse_report, AuditReport, AUDIT_FIELD_PREFIX, CATEGORIES, HEADLINE_METRICS};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors raised by an auditor
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to start audit browser: {0}")]
    Launch(String),

    #[error("Auditor used before open")]
    NotOpen,

    #[error("Audit of {url} failed: {reason}")]
    Failed { url: String, reason: String },

    #[error("Failed to parse audit report: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audit engine used by the page visitor
#[async_trait]
pub trait Auditor: Send + Sync {
    /// Starts the audit browser
    async fn open(&self) -> Result<(), AuditError>;

    /// Audits one URL, producing scores and metrics in the given locale
    async fn audit(&self, url: &str, locale: &str) -> Result<AuditReport, AuditError>;

    /// Stops the audit browser
    async fn close(&self);
}

/// Wraps an auditor so at most one audit runs at a time
pub struct SerializedAuditor {
    inner: Box<dyn Auditor>,
    in_flight: Mutex<()>,
}

impl SerializedAuditor {
    pub fn new(inner: impl Auditor + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            in_flight: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Auditor for SerializedAuditor {
    async fn open(&self) -> Result<(), AuditError> {
        self.inner.open().await
    }

    async fn audit(&self, url: &str, locale: &str) -> Result<AuditReport, AuditError> {
        let _guard = self.in_flight.lock().await;
        self.inner.audit(url, locale).await
    }

    async fn close(&self) {
        let _guard = self.in_flight.lock().await;
        self.inner.close().await
    }
}
