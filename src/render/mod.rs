//! Page rendering module
//!
//! The crawler talks to the page-rendering engine through the [`Renderer`]
//! trait:
//! - `launch` starts the engine (failure here is fatal for the session)
//! - `render` navigates to a URL, passing every request through a filter
//! - `extract` evaluates the field extraction contract on a rendered page
//! - `close` releases the engine
//!
//! [`HttpRenderer`] is the implementation shipped with the crate.

pub mod extract;
mod http;
pub mod links;

pub use http::{build_http_client, HttpRenderer, HttpRendererConfig};
pub use links::SubRequest;

use crate::fields::{CustomField, FieldMap};
use crate::policy::RequestDecision;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors raised by a renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer failed to start: {0}")]
    Launch(String),

    #[error("Renderer used before launch")]
    NotLaunched,

    #[error("Navigation to {0} blocked by request policy")]
    Blocked(String),

    #[error("Timed out loading {0}")]
    Timeout(String),

    #[error("Failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },
}

/// Errors raised while extracting fields from a rendered page
///
/// These never abort a crawl: the page is recorded with an error marker.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not an HTML document ({0})")]
    NotHtml(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Callback deciding whether a request made during a render may proceed
pub type RequestFilter<'a> = &'a (dyn Fn(&SubRequest) -> RequestDecision + Send + Sync);

/// A page as delivered by the renderer
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub html: String,
    /// Time from sending the request to receiving the full response
    pub request_time_ms: u64,
    /// Absolute links discovered on the page
    pub links: Vec<String>,
    /// Sub-requests the filter did not allow
    pub blocked: Vec<SubRequest>,
}

/// Page-rendering engine used by the crawler
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Starts the engine
    async fn launch(&self) -> Result<(), RenderError>;

    /// Loads one page
    ///
    /// The navigation request itself and every sub-request go through
    /// `filter` before they are issued.
    async fn render(&self, url: &Url, filter: RequestFilter<'_>) -> Result<RenderedPage, RenderError>;

    /// Evaluates the base fields and the given custom fields on a rendered page
    fn extract(&self, page: &RenderedPage, custom: &[CustomField]) -> Result<FieldMap, ExtractError> {
        extract::evaluate_page(page, custom)
    }

    /// Releases the engine
    async fn close(&self);
}
