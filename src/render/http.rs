//! HTTP renderer
//!
//! Loads pages with `reqwest` and reads them with `scraper`. Scripts are not
//! executed; static sub-resources are only classified so the request policy
//! sees them the way it would inside a browser.

use crate::policy::ResourceType;
use crate::render::links::{extract_links, extract_sub_requests};
use crate::render::{RenderError, RenderedPage, Renderer, RequestFilter, SubRequest};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use scraper::Html;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use url::Url;

/// Settings for [`HttpRenderer`]
#[derive(Debug, Clone)]
pub struct HttpRendererConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpRendererConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("site-audit/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Builds the HTTP client used for page loads
///
/// # Arguments
///
/// * `config` - User agent and per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpRendererConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .connect_timeout(config.timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer backed by plain HTTP requests
pub struct HttpRenderer {
    config: HttpRendererConfig,
    client: OnceLock<Client>,
}

impl HttpRenderer {
    pub fn new(config: HttpRendererConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }
}

/// Parses the document and applies the filter to its sub-requests
fn inspect(html: &str, final_url: &Url, filter: RequestFilter<'_>) -> (Vec<String>, Vec<SubRequest>) {
    let document = Html::parse_document(html);
    let links = extract_links(&document, final_url);
    let blocked = extract_sub_requests(&document, final_url)
        .into_iter()
        .filter(|request| !filter(request).is_allowed())
        .collect();
    (links, blocked)
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn launch(&self) -> Result<(), RenderError> {
        let client = build_http_client(&self.config).map_err(|e| RenderError::Launch(e.to_string()))?;
        let _ = self.client.set(client);
        tracing::debug!("HTTP renderer ready (timeout {:?})", self.config.timeout);
        Ok(())
    }

    async fn render(&self, url: &Url, filter: RequestFilter<'_>) -> Result<RenderedPage, RenderError> {
        let client = self.client.get().ok_or(RenderError::NotLaunched)?;

        let navigation = SubRequest {
            url: url.to_string(),
            resource: ResourceType::Document,
        };
        if !filter(&navigation).is_allowed() {
            return Err(RenderError::Blocked(url.to_string()));
        }

        let started = Instant::now();
        let navigation_error = |e: reqwest::Error| {
            if e.is_timeout() {
                RenderError::Timeout(url.to_string())
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = client.get(url.clone()).send().await.map_err(navigation_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let html = response.text().await.map_err(navigation_error)?;
        let request_time_ms = started.elapsed().as_millis() as u64;

        let is_html = content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true);
        let (links, blocked) = if is_html {
            inspect(&html, &final_url, filter)
        } else {
            (Vec::new(), Vec::new())
        };

        for request in &blocked {
            tracing::debug!("Blocked {:?} request {}", request.resource, request.url);
        }

        Ok(RenderedPage {
            final_url,
            status,
            content_type,
            html,
            request_time_ms,
            links,
            blocked,
        })
    }

    async fn close(&self) {
        tracing::debug!("HTTP renderer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RequestDecision;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn allow_all(_: &SubRequest) -> RequestDecision {
        RequestDecision::Allow
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&HttpRendererConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_render_before_launch() {
        let renderer = HttpRenderer::new(HttpRendererConfig::default());
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let result = renderer.render(&url, &allow_all).await;
        assert!(matches!(result, Err(RenderError::NotLaunched)));
    }

    #[tokio::test]
    async fn test_render_collects_links_and_blocked_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><script src="/app.js"></script></head>
                <body><a href="/about">About</a><img src="/logo.png"></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(HttpRendererConfig::default());
        renderer.launch().await.unwrap();

        let skip_scripts = |request: &SubRequest| {
            if request.resource == ResourceType::Script {
                RequestDecision::Abort
            } else {
                RequestDecision::Allow
            }
        };
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let page = renderer.render(&url, &skip_scripts).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.links, vec![format!("{}/about", server.uri())]);
        assert_eq!(page.blocked.len(), 1);
        assert_eq!(page.blocked[0].resource, ResourceType::Script);
    }

    #[tokio::test]
    async fn test_blocked_navigation_is_not_requested() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(HttpRendererConfig::default());
        renderer.launch().await.unwrap();

        let block = |_: &SubRequest| RequestDecision::Abort;
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let result = renderer.render(&url, &block).await;
        assert!(matches!(result, Err(RenderError::Blocked(_))));
    }
}
